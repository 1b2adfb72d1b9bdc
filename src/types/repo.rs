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

//! Repositories, their governance configuration and contributor records.

use rust_decimal::Decimal;

use std::collections::BTreeMap;

use super::proposal::{FeeRefundType, RepoProposal, TallyMethod, VoterType};
use super::{Address, Amount, PushKeyId};
use crate::helpers::Height;

/// An owner record within a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoOwner {
    /// Whether the owner created the repository.
    pub creator: bool,
    /// Height at which the owner joined.
    pub joined_at: Height,
    /// Whether the owner may cast owner-veto votes.
    pub veto: bool,
}

/// How fees of a contributor's pushes are settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeeMode {
    /// The pusher's own account pays.
    PusherPays,
    /// The repository balance pays.
    RepoPays,
    /// The repository balance pays up to the contributor's fee cap.
    RepoPaysCapped,
}

impl Default for FeeMode {
    fn default() -> Self {
        FeeMode::PusherPays
    }
}

/// A push policy attached to a contributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// The object the policy applies to, e.g. a reference glob.
    pub object: String,
    /// The permitted or denied action.
    pub action: String,
}

/// A contributor record: a push key admitted to a repository or namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoContributor {
    /// How this contributor's push fees are settled.
    pub fee_mode: FeeMode,
    /// Maximum total fee the repository pays for this contributor. Must be
    /// zero unless `fee_mode` is `RepoPaysCapped`.
    pub fee_cap: Amount,
    /// Fee already settled by the repository for this contributor.
    pub fee_used: Amount,
    /// Push policies.
    pub policies: Vec<Policy>,
}

/// Governance parameters of a repository. A snapshot of this struct is
/// embedded into every proposal at creation time, so later changes never
/// retroactively alter a running proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Number of blocks a proposal stays open for voting.
    pub prop_duration: u64,
    /// Length of the optional pre-voting fee-deposit window. Zero disables
    /// the deposit phase.
    pub prop_fee_deposit_dur: u64,
    /// Percentage of total voting power that must vote at all.
    pub prop_quorum: Decimal,
    /// Percentage of cast votes required to decide.
    pub prop_threshold: Decimal,
    /// Percentage of cast votes at which a veto vote rejects.
    pub prop_veto_quorum: Decimal,
    /// Percentage of owners at which an owners' veto rejects.
    pub prop_veto_owners_quorum: Decimal,
    /// Who may vote.
    pub voter: VoterType,
    /// How individual votes are weighted.
    pub tally_method: TallyMethod,
    /// Minimum proposal fee.
    pub prop_fee: Amount,
    /// Refund/distribution policy for proposal fees.
    pub prop_fee_refund_type: FeeRefundType,
    /// When set, only voters that joined before the proposal may vote on it.
    pub req_voter_join_height: bool,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        GovernanceConfig {
            prop_duration: 100,
            prop_fee_deposit_dur: 0,
            prop_quorum: Decimal::from(0),
            prop_threshold: Decimal::from(0),
            prop_veto_quorum: Decimal::from(0),
            prop_veto_owners_quorum: Decimal::from(0),
            voter: VoterType::Owner,
            tally_method: TallyMethod::Identity,
            prop_fee: Amount::zero(),
            prop_fee_refund_type: FeeRefundType::No,
            req_voter_join_height: false,
        }
    }
}

/// A partial governance configuration carried by update payloads. Absent
/// fields leave the corresponding live value untouched.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_fee_deposit_dur: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_quorum: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_threshold: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_veto_quorum: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_veto_owners_quorum: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voter: Option<VoterType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tally_method: Option<TallyMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_fee: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_fee_refund_type: Option<FeeRefundType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub req_voter_join_height: Option<bool>,
}

impl GovernanceConfig {
    /// Merges a partial update onto the live configuration. Unspecified
    /// fields keep their current value.
    pub fn merge(&mut self, upd: &GovernanceConfigUpdate) {
        if let Some(v) = upd.prop_duration {
            self.prop_duration = v;
        }
        if let Some(v) = upd.prop_fee_deposit_dur {
            self.prop_fee_deposit_dur = v;
        }
        if let Some(v) = upd.prop_quorum {
            self.prop_quorum = v;
        }
        if let Some(v) = upd.prop_threshold {
            self.prop_threshold = v;
        }
        if let Some(v) = upd.prop_veto_quorum {
            self.prop_veto_quorum = v;
        }
        if let Some(v) = upd.prop_veto_owners_quorum {
            self.prop_veto_owners_quorum = v;
        }
        if let Some(v) = upd.voter {
            self.voter = v;
        }
        if let Some(v) = upd.tally_method {
            self.tally_method = v;
        }
        if let Some(v) = upd.prop_fee {
            self.prop_fee = v;
        }
        if let Some(v) = upd.prop_fee_refund_type {
            self.prop_fee_refund_type = v;
        }
        if let Some(v) = upd.req_voter_join_height {
            self.req_voter_join_height = v;
        }
    }
}

/// Full repository configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Governance parameters.
    pub governance: GovernanceConfig,
}

/// A partial repository configuration, as carried by create/update payloads.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoConfigUpdate {
    /// Governance updates.
    #[serde(default)]
    pub governance: GovernanceConfigUpdate,
}

impl RepoConfig {
    /// Applies a partial update.
    pub fn merge(&mut self, upd: &RepoConfigUpdate) {
        self.governance.merge(&upd.governance);
    }
}

/// A repository: the unit of collaboration and governance.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// Owners, keyed by account address.
    pub owners: BTreeMap<Address, RepoOwner>,
    /// Contributors, keyed by push-key identifier.
    pub contributors: BTreeMap<PushKeyId, RepoContributor>,
    /// Governance and fee policy.
    pub config: RepoConfig,
    /// Governance proposals, keyed by proposal id.
    pub proposals: BTreeMap<String, RepoProposal>,
    /// Coin balance of the repository.
    pub balance: Amount,
    /// Free-form description.
    pub description: String,
}

impl Repository {
    /// Returns `true` if the repository has never been created.
    pub fn is_nil(&self) -> bool {
        self.owners.is_empty()
            && self.contributors.is_empty()
            && self.proposals.is_empty()
            && self.balance.is_zero()
            && self.description.is_empty()
    }

    /// Adds `addr` as an owner, or updates the veto right if already present.
    pub fn upsert_owner(&mut self, addr: Address, joined_at: Height, veto: bool) {
        match self.owners.get_mut(&addr) {
            Some(owner) => owner.veto = veto,
            None => {
                self.owners.insert(
                    addr,
                    RepoOwner {
                        creator: false,
                        joined_at,
                        veto,
                    },
                );
            }
        }
    }

    /// Number of owners that had joined at or before `max_join_height`.
    /// A zero `max_join_height` counts every owner.
    pub fn owners_joined_by(&self, max_join_height: Height) -> u64 {
        if max_join_height == Height::zero() {
            return self.owners.len() as u64;
        }
        self.owners
            .values()
            .filter(|o| o.joined_at <= max_join_height)
            .count() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn merge_keeps_unspecified_fields() {
        let mut config = GovernanceConfig::default();
        config.prop_fee = Amount::from(7);
        config.prop_quorum = Decimal::from(40);

        let upd = GovernanceConfigUpdate {
            prop_duration: Some(1000),
            ..GovernanceConfigUpdate::default()
        };
        config.merge(&upd);

        assert_eq!(config.prop_duration, 1000);
        assert_eq!(config.prop_fee, Amount::from(7));
        assert_eq!(config.prop_quorum, Decimal::from(40));
    }

    #[test]
    fn upsert_owner_updates_veto_only() {
        let mut repo = Repository::default();
        repo.upsert_owner("a".repeat(40).parse().unwrap(), Height(3), false);
        repo.upsert_owner("a".repeat(40).parse().unwrap(), Height(9), true);

        let owner = repo.owners.values().next().unwrap();
        assert_eq!(owner.joined_at, Height(3));
        assert!(owner.veto);
    }

    #[test]
    fn join_height_filter() {
        let mut repo = Repository::default();
        repo.upsert_owner("a".repeat(40).parse().unwrap(), Height(1), false);
        repo.upsert_owner("b".repeat(40).parse().unwrap(), Height(5), false);

        assert_eq!(repo.owners_joined_by(Height::zero()), 2);
        assert_eq!(repo.owners_joined_by(Height(4)), 1);
        assert_eq!(repo.owners_joined_by(Height(5)), 2);
    }
}
