// Copyright 2020 The Repochain Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Account addresses, push-key identifiers and recipient parsing.
//!
//! Three recipient forms are recognized on the wire:
//!
//! - a native account address: 40 lowercase hex characters derived from the
//!   SHA-256 of the account public key;
//! - a prefixed repository address: `r/<repo-name>`;
//! - a namespace URI: `<namespace>/<domain>`, resolved through the namespace
//!   domain table.

use exonum_crypto::PublicKey;

use std::fmt;
use std::str::FromStr;

/// Number of public-key-hash bytes encoded into an address.
pub const ADDRESS_HASH_LENGTH: usize = 20;

/// Prefix marking a repository recipient.
pub const REPO_ADDR_PREFIX: &str = "r/";

/// Prefix of a push-key identifier.
pub const PUSH_KEY_ID_PREFIX: &str = "pk";

fn is_hex_lower(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Checks a repository name: alphanumerics, `-` and `_`, 1..=128 characters.
pub fn is_valid_repo_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Checks a namespace name: alphanumerics, `-` and `_`, 3..=128 characters.
pub fn is_valid_namespace_name(name: &str) -> bool {
    name.len() >= 3 && is_valid_repo_name(name)
}

/// A native account address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Derives the address of the account controlled by `pub_key`.
    pub fn from_public_key(pub_key: &PublicKey) -> Self {
        let digest = exonum_crypto::hash(pub_key.as_ref());
        Address(hex::encode(&digest.as_ref()[..ADDRESS_HASH_LENGTH]))
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == ADDRESS_HASH_LENGTH * 2 && is_hex_lower(s) {
            Ok(Address(s.to_owned()))
        } else {
            Err(format!("invalid address: {}", s))
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a registered push key: `pk` followed by 40 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PushKeyId(String);

impl PushKeyId {
    /// Derives the identifier of the push key `pub_key`.
    pub fn from_public_key(pub_key: &PublicKey) -> Self {
        let digest = exonum_crypto::hash(pub_key.as_ref());
        PushKeyId(format!(
            "{}{}",
            PUSH_KEY_ID_PREFIX,
            hex::encode(&digest.as_ref()[..ADDRESS_HASH_LENGTH])
        ))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PushKeyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hexpart = s
            .strip_prefix(PUSH_KEY_ID_PREFIX)
            .ok_or_else(|| format!("push key id is not valid: {}", s))?;
        if hexpart.len() == ADDRESS_HASH_LENGTH * 2 && is_hex_lower(hexpart) {
            Ok(PushKeyId(s.to_owned()))
        } else {
            Err(format!("push key id is not valid: {}", s))
        }
    }
}

impl fmt::Display for PushKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed transfer recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// A native account.
    Account(Address),
    /// A repository, credited on its balance.
    Repo(String),
    /// A namespace domain that resolves to an account or repository.
    Namespace {
        /// Namespace name.
        ns: String,
        /// Domain within the namespace.
        domain: String,
    },
}

impl Recipient {
    /// Parses one of the three recipient forms.
    pub fn parse(s: &str) -> Result<Recipient, String> {
        if let Some(repo) = s.strip_prefix(REPO_ADDR_PREFIX) {
            if is_valid_repo_name(repo) {
                return Ok(Recipient::Repo(repo.to_owned()));
            }
            return Err(format!("invalid repo recipient: {}", s));
        }
        if let Ok(addr) = s.parse::<Address>() {
            return Ok(Recipient::Account(addr));
        }
        let mut parts = s.splitn(2, '/');
        match (parts.next(), parts.next()) {
            (Some(ns), Some(domain))
                if is_valid_namespace_name(ns) && is_valid_repo_name(domain) =>
            {
                Ok(Recipient::Namespace {
                    ns: ns.to_owned(),
                    domain: domain.to_owned(),
                })
            }
            _ => Err(format!("recipient address is not valid: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exonum_crypto::gen_keypair;
    use pretty_assertions::assert_eq;

    #[test]
    fn address_round_trip() {
        let (pk, _) = gen_keypair();
        let addr = Address::from_public_key(&pk);
        assert_eq!(addr.as_str().len(), 40);
        assert_eq!(addr.as_str().parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn push_key_id_shape() {
        let (pk, _) = gen_keypair();
        let id = PushKeyId::from_public_key(&pk);
        assert!(id.as_str().starts_with(PUSH_KEY_ID_PREFIX));
        assert_eq!(id.as_str().parse::<PushKeyId>().unwrap(), id);
        assert!("pkzz".parse::<PushKeyId>().is_err());
    }

    #[test]
    fn recipient_forms() {
        assert_eq!(
            Recipient::parse("r/infra").unwrap(),
            Recipient::Repo("infra".into())
        );
        assert_eq!(
            Recipient::parse("tools/web").unwrap(),
            Recipient::Namespace {
                ns: "tools".into(),
                domain: "web".into(),
            }
        );
        let (pk, _) = gen_keypair();
        let addr = Address::from_public_key(&pk);
        assert_eq!(
            Recipient::parse(addr.as_str()).unwrap(),
            Recipient::Account(addr)
        );
        assert!(Recipient::parse("r/").is_err());
        assert!(Recipient::parse("x").is_err());
    }

    #[test]
    fn name_charsets() {
        assert!(is_valid_namespace_name("my-ns_01"));
        assert!(!is_valid_namespace_name("ab"));
        assert!(!is_valid_namespace_name("has space"));
        assert!(is_valid_repo_name("a"));
        assert!(!is_valid_repo_name(""));
    }
}
