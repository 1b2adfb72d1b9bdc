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

//! Governance proposals.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;

use std::collections::{BTreeMap, BTreeSet};

use super::repo::GovernanceConfig;
use super::tx::TxType;
use super::{Address, Amount};
use crate::errors::StateError;
use crate::helpers::Height;

/// Who may vote on a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoterType {
    /// Repository owners only.
    Owner,
    /// Network stakeholders (ticket holders).
    NetStakers,
    /// Network stakeholders, with repository owners holding a veto.
    NetStakersAndVetoOwner,
}

/// How an individual vote is weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TallyMethod {
    /// One voter, one vote.
    Identity,
    /// Votes weigh the voter's non-delegated ticket value.
    NetStake,
}

/// Refund/distribution policy for proposal fees, keyed by the set of
/// outcomes that trigger a refund. Anything else distributes the fees
/// between the target repository and the helm repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeeRefundType {
    /// Never refund.
    No,
    OnAccept,
    OnAcceptReject,
    OnAcceptAllReject,
    OnBelowThreshold,
    OnBelowThresholdAccept,
    OnBelowThresholdAcceptReject,
    OnBelowThresholdAcceptAllReject,
}

impl FeeRefundType {
    /// Returns `true` when fees are refunded for `outcome`.
    pub fn refunds_on(self, outcome: ProposalOutcome) -> bool {
        use self::ProposalOutcome::*;
        match self {
            FeeRefundType::No => false,
            FeeRefundType::OnAccept => outcome == Accepted,
            FeeRefundType::OnAcceptReject => outcome == Accepted || outcome == Rejected,
            FeeRefundType::OnAcceptAllReject => match outcome {
                Accepted | Rejected | RejectedWithVeto | RejectedWithVetoByOwners => true,
                _ => false,
            },
            FeeRefundType::OnBelowThreshold => outcome == BelowThreshold,
            FeeRefundType::OnBelowThresholdAccept => {
                outcome == BelowThreshold || outcome == Accepted
            }
            FeeRefundType::OnBelowThresholdAcceptReject => match outcome {
                BelowThreshold | Accepted | Rejected => true,
                _ => false,
            },
            FeeRefundType::OnBelowThresholdAcceptAllReject => match outcome {
                BelowThreshold | Accepted | Rejected | RejectedWithVeto
                | RejectedWithVetoByOwners => true,
                _ => false,
            },
        }
    }
}

/// Terminal outcome of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProposalOutcome {
    Accepted,
    Rejected,
    RejectedWithVeto,
    RejectedWithVetoByOwners,
    QuorumNotMet,
    BelowThreshold,
    InsufficientDeposit,
}

/// Well-known `ActionData` keys.
pub mod action_keys {
    pub const ADDRS: &str = "addrs";
    pub const VETO: &str = "veto";
    pub const CFG: &str = "cfg";
    pub const DESCRIPTION: &str = "description";
    pub const IDS: &str = "ids";
    pub const POLICIES: &str = "policies";
    pub const FEE_MODE: &str = "feeMode";
    pub const FEE_CAP: &str = "feeCap";
    pub const NAMESPACE: &str = "namespace";
    pub const NAMESPACE_ONLY: &str = "namespaceOnly";
}

/// Opaque per-action payload of a proposal.
///
/// The blob-map keeps `RepoProposal` stable while new proposal actions are
/// added; contracts read it back through the typed accessors. Values are
/// JSON-encoded.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionData(BTreeMap<String, Vec<u8>>);

impl ActionData {
    /// Encodes `value` under `key`.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) {
        let bytes =
            serde_json::to_vec(value).expect("action data values always serialize to JSON");
        self.0.insert(key.to_owned(), bytes);
    }

    /// Decodes the value under `key`. Absence yields `Ok(None)`: for
    /// update-style actions a missing key means "no change".
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StateError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(bytes).map(Some).map_err(|e| {
                StateError::InvariantViolation(format!(
                    "malformed action data under key {}: {}",
                    key, e
                ))
            }),
        }
    }

    /// Decodes the mandatory value under `key`; absence is an invariant
    /// violation since the creating contract must have written it.
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T, StateError> {
        self.get(key)?.ok_or_else(|| {
            StateError::InvariantViolation(format!("action data key {} is missing", key))
        })
    }
}

/// A governance proposal recorded inside a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoProposal {
    /// Proposal identifier, unique within the repository.
    pub id: String,
    /// Address of the creating account.
    pub creator: Address,
    /// The transaction type whose `Apply` realizes the proposal.
    pub action: TxType,
    /// Opaque per-action payload.
    pub action_data: ActionData,
    /// Snapshot of the repository governance taken at creation.
    pub config: GovernanceConfig,
    /// Height the proposal was created at.
    pub height: Height,
    /// Height at which voting closes and the proposal finalizes.
    pub end_at: Height,
    /// End of the optional fee-deposit window; zero when disabled.
    pub fee_deposit_end_at: Height,
    /// Owners that joined after this height may not vote; zero disables the
    /// restriction.
    pub proposer_max_join_height: Height,
    /// Fee contributions, keyed by depositor address.
    pub fees: BTreeMap<Address, Amount>,
    /// Accept tally.
    pub yes: Decimal,
    /// Reject tally.
    pub no: Decimal,
    /// Veto tally.
    pub no_with_veto: Decimal,
    /// Owner-veto tally.
    pub no_with_veto_by_owners: Decimal,
    /// Addresses that already voted.
    pub voters: BTreeSet<Address>,
    /// Terminal outcome; set exactly once.
    pub outcome: Option<ProposalOutcome>,
}

impl RepoProposal {
    /// Returns `true` once a terminal outcome has been recorded.
    pub fn is_finalized(&self) -> bool {
        self.outcome.is_some()
    }

    /// Records the terminal outcome.
    ///
    /// # Panics
    ///
    /// Panics if an outcome was already set; the engine never finalizes a
    /// proposal twice.
    pub fn set_outcome(&mut self, outcome: ProposalOutcome) {
        assert!(
            self.outcome.is_none(),
            "proposal {} finalized twice",
            self.id
        );
        self.outcome = Some(outcome);
    }

    /// Returns `true` if a pre-voting fee-deposit window is configured.
    pub fn is_fee_deposit_enabled(&self) -> bool {
        self.fee_deposit_end_at != Height::zero()
    }

    /// Returns `true` while deposits are still accepted at `height`.
    pub fn is_deposit_period(&self, height: Height) -> bool {
        height <= self.fee_deposit_end_at
    }

    /// Sum of all fee contributions.
    pub fn total_fees(&self) -> Amount {
        self.fees.values().copied().sum()
    }

    /// Registers a fee contribution from `depositor`.
    pub fn add_fee(&mut self, depositor: Address, value: Amount) {
        let entry = self.fees.entry(depositor).or_insert_with(Amount::zero);
        *entry += value;
    }

    pub fn incr_accept(&mut self, weight: Decimal) {
        self.yes += weight;
    }

    pub fn incr_reject(&mut self, weight: Decimal) {
        self.no += weight;
    }

    pub fn incr_veto(&mut self, weight: Decimal) {
        self.no_with_veto += weight;
    }

    pub fn incr_owner_veto(&mut self, weight: Decimal) {
        self.no_with_veto_by_owners += weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn proposal() -> RepoProposal {
        RepoProposal {
            id: "1".to_owned(),
            creator: "c".repeat(40).parse().unwrap(),
            action: TxType::ProposalUpdateRepo,
            action_data: ActionData::default(),
            config: GovernanceConfig::default(),
            height: Height(1),
            end_at: Height(102),
            fee_deposit_end_at: Height::zero(),
            proposer_max_join_height: Height::zero(),
            fees: BTreeMap::new(),
            yes: Decimal::from(0),
            no: Decimal::from(0),
            no_with_veto: Decimal::from(0),
            no_with_veto_by_owners: Decimal::from(0),
            voters: BTreeSet::new(),
            outcome: None,
        }
    }

    #[test]
    fn refund_matrix() {
        use self::ProposalOutcome::*;

        assert!(!FeeRefundType::No.refunds_on(Accepted));
        assert!(FeeRefundType::OnAccept.refunds_on(Accepted));
        assert!(!FeeRefundType::OnAccept.refunds_on(Rejected));
        assert!(FeeRefundType::OnAcceptAllReject.refunds_on(RejectedWithVetoByOwners));
        assert!(!FeeRefundType::OnAcceptAllReject.refunds_on(QuorumNotMet));
        assert!(FeeRefundType::OnBelowThresholdAcceptAllReject.refunds_on(BelowThreshold));
        assert!(!FeeRefundType::OnBelowThresholdAcceptAllReject.refunds_on(InsufficientDeposit));
    }

    #[test]
    fn fee_contributions_accumulate() {
        let mut prop = proposal();
        let depositor: Address = "d".repeat(40).parse().unwrap();
        prop.add_fee(depositor.clone(), Amount::from(2));
        prop.add_fee(depositor, Amount::from(3));
        assert_eq!(prop.total_fees(), Amount::from(5));
        assert_eq!(prop.fees.len(), 1);
    }

    #[test]
    #[should_panic(expected = "finalized twice")]
    fn outcome_is_set_once() {
        let mut prop = proposal();
        prop.set_outcome(ProposalOutcome::Accepted);
        prop.set_outcome(ProposalOutcome::Rejected);
    }

    #[test]
    fn action_data_round_trip() {
        let mut data = ActionData::default();
        data.set(action_keys::ADDRS, &vec!["ab".repeat(20)]);
        let addrs: Vec<String> = data.require(action_keys::ADDRS).unwrap();
        assert_eq!(addrs.len(), 1);

        let missing: Option<bool> = data.get(action_keys::VETO).unwrap();
        assert_eq!(missing, None);
        assert!(data.require::<bool>(action_keys::VETO).is_err());
    }
}
