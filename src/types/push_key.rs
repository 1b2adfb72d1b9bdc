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

//! Push keys: keys authorized to sign git pushes on behalf of an account.

use exonum_crypto::PublicKey;

use super::{Address, Amount};

/// A registered push key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushKey {
    /// The push public key itself.
    pub pub_key: PublicKey,
    /// Owning account address.
    pub address: Address,
    /// Repositories and namespaces the key is restricted to. Empty means
    /// unrestricted.
    pub scopes: Vec<String>,
    /// Maximum total fee the owner lets this key spend. Zero disables the
    /// cap.
    pub fee_cap: Amount,
    /// Fee spent through this key so far.
    pub fee_used: Amount,
}

impl PushKey {
    /// Returns `true` when spending `fee` would stay within the key's cap.
    pub fn within_fee_cap(&self, fee: Amount) -> bool {
        self.fee_cap.is_zero() || self.fee_used + fee <= self.fee_cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exonum_crypto::gen_keypair;

    #[test]
    fn fee_cap_accounting() {
        let (pub_key, _) = gen_keypair();
        let mut key = PushKey {
            pub_key,
            address: "a".repeat(40).parse().unwrap(),
            scopes: vec![],
            fee_cap: Amount::zero(),
            fee_used: Amount::zero(),
        };
        assert!(key.within_fee_cap(Amount::from(1_000)));

        key.fee_cap = Amount::from(10);
        key.fee_used = Amount::from(8);
        assert!(key.within_fee_cap(Amount::from(2)));
        assert!(!key.within_fee_cap(Amount::from(3)));
    }
}
