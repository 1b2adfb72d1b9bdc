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

//! Namespaces: human-readable name trees mapping domains to repositories or
//! accounts.

use std::collections::BTreeMap;

use super::repo::RepoContributor;
use super::{Address, PushKeyId};
use crate::helpers::Height;

/// A registered namespace.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    /// Owning account.
    pub owner: Option<Address>,
    /// Owning repository, when the acquirer transferred ownership to a repo.
    pub owner_repo: Option<String>,
    /// Height after which the name can be re-acquired by anyone.
    pub grace_end_at: Height,
    /// Contributors admitted to the namespace, keyed by push-key id.
    pub contributors: BTreeMap<PushKeyId, RepoContributor>,
    /// Domain table: domain name to target (`r/<repo>`, a native address, or
    /// another namespace URI).
    pub domains: BTreeMap<String, String>,
}

impl Namespace {
    /// Returns `true` if the name has never been acquired.
    pub fn is_nil(&self) -> bool {
        self.owner.is_none() && self.owner_repo.is_none() && self.grace_end_at == Height::zero()
    }

    /// Returns `true` while the namespace is held against re-acquisition at
    /// `height`.
    pub fn is_held(&self, height: Height) -> bool {
        !self.is_nil() && self.grace_end_at > height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_until_grace_end() {
        let mut ns = Namespace::default();
        assert!(ns.is_nil());
        assert!(!ns.is_held(Height(1)));

        ns.owner = Some("a".repeat(40).parse().unwrap());
        ns.grace_end_at = Height(10);
        assert!(ns.is_held(Height(9)));
        assert!(!ns.is_held(Height(10)));
    }
}
