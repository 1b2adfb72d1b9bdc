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

//! The repository governance engine.
//!
//! Proposal-creating contracts call [`make_proposal`](fn.make_proposal.html)
//! and [`maybe_apply_proposal`](fn.maybe_apply_proposal.html); the block
//! driver calls [`finalize_proposals_at`](fn.finalize_proposals_at.html)
//! from its end-of-block hook. Outcome arithmetic and fee settlement are
//! deterministic: tallies only move through the proposal's `incr_*`
//! operations and every map iterated here is ordered.

use rust_decimal::{Decimal, RoundingStrategy};

use std::collections::{BTreeMap, BTreeSet};

use crate::contracts::{ApplyContext, ContractRegistry};
use crate::errors::StateError;
use crate::helpers::Height;
use crate::keepers::{AccountKeeper, Keepers, RepoKeeper, TicketManager};
use crate::params::{Params, HELM_REPO};
use crate::types::{
    ActionData, Address, Amount, GovernanceConfig, ProposalOutcome, RepoProposal, Repository,
    TxType, VoterType,
};

/// Builds a new proposal against a repository.
///
/// The governance configuration is snapshotted into the proposal so later
/// parameter changes never retroactively alter it. When a fee-deposit window
/// is configured, voting starts only after the window closes.
pub fn make_proposal(
    creator: Address,
    gov: &GovernanceConfig,
    id: &str,
    action: TxType,
    fee: Amount,
    height: Height,
) -> RepoProposal {
    let mut end_at = Height(height.0 + 1 + gov.prop_duration);
    let mut fee_deposit_end_at = Height::zero();
    if gov.prop_fee_deposit_dur > 0 {
        fee_deposit_end_at = Height(height.0 + 1 + gov.prop_fee_deposit_dur);
        end_at = Height(fee_deposit_end_at.0 + gov.prop_duration);
    }

    let proposer_max_join_height = if gov.req_voter_join_height {
        height.next()
    } else {
        Height::zero()
    };

    let mut fees = BTreeMap::new();
    if !fee.is_zero() {
        fees.insert(creator.clone(), fee);
    }

    RepoProposal {
        id: id.to_owned(),
        creator,
        action,
        action_data: ActionData::default(),
        config: gov.clone(),
        height,
        end_at,
        fee_deposit_end_at,
        proposer_max_join_height,
        fees,
        yes: Decimal::from(0),
        no: Decimal::from(0),
        no_with_veto: Decimal::from(0),
        no_with_veto_by_owners: Decimal::from(0),
        voters: BTreeSet::new(),
        outcome: None,
    }
}

/// Finalizes and applies the proposal `prop_id` of `repo` if it is due.
///
/// Returns `Ok(true)` only when the proposal passed and its action was
/// applied. Calling this on an already finalized proposal is a no-op; a
/// proposal is never applied twice.
pub fn maybe_apply_proposal(
    keepers: &mut dyn Keepers,
    params: &Params,
    registry: &ContractRegistry,
    repo_name: &str,
    repo: &mut Repository,
    prop_id: &str,
    height: Height,
) -> Result<bool, StateError> {
    let mut prop = repo
        .proposals
        .remove(prop_id)
        .ok_or_else(|| StateError::NotFound(format!("proposal {}", prop_id)))?;

    let result = apply_inner(keepers, params, registry, repo_name, repo, &mut prop, height);
    repo.proposals.insert(prop_id.to_owned(), prop);
    result
}

fn apply_inner(
    keepers: &mut dyn Keepers,
    params: &Params,
    registry: &ContractRegistry,
    repo_name: &str,
    repo: &mut Repository,
    prop: &mut RepoProposal,
    height: Height,
) -> Result<bool, StateError> {
    if prop.is_finalized() {
        return Ok(false);
    }

    // A proposal whose deposit window closed without the fee reaching the
    // repository minimum dies here; every deposit goes straight back.
    if prop.is_fee_deposit_enabled()
        && !prop.is_deposit_period(height.next())
        && prop.total_fees() < prop.config.prop_fee
    {
        debug!(
            "proposal {}/{} closed with insufficient deposit",
            repo_name, prop.id
        );
        prop.set_outcome(ProposalOutcome::InsufficientDeposit);
        refund_fees(keepers, prop);
        return Ok(false);
    }

    let sole_owner_creator = prop.config.voter == VoterType::Owner
        && repo.owners.len() == 1
        && repo.owners.contains_key(&prop.creator);

    let outcome = if sole_owner_creator {
        prop.incr_accept(Decimal::from(1));
        prop.set_outcome(ProposalOutcome::Accepted);
        ProposalOutcome::Accepted
    } else {
        if prop.end_at > height.next() {
            return Ok(false);
        }
        let outcome = get_proposal_outcome(keepers, prop, repo);
        prop.set_outcome(outcome);
        if outcome != ProposalOutcome::Accepted {
            debug!(
                "proposal {}/{} finalized with outcome {:?}",
                repo_name, prop.id, outcome
            );
            maybe_process_proposal_fee(outcome, keepers, params, prop, repo_name, repo);
            return Ok(false);
        }
        outcome
    };

    let applier = registry.applier_for(prop.action).ok_or_else(|| {
        StateError::InvariantViolation(format!(
            "no applier registered for proposal action {}",
            prop.action.as_str()
        ))
    })?;
    applier.apply(&mut ApplyContext {
        keepers: &mut *keepers,
        params,
        proposal: &*prop,
        repo: &mut *repo,
        repo_name,
        height,
    })?;
    info!("proposal {}/{} accepted and applied", repo_name, prop.id);

    maybe_process_proposal_fee(outcome, keepers, params, prop, repo_name, repo);
    Ok(true)
}

/// Computes the outcome of a proposal from its tallies.
///
/// Total voting power depends on the voter type: owner count for owner
/// governance, total ticket value for staker governance. The decision rules
/// run in a fixed order; ties and the equal-threshold case deliberately land
/// on `BelowThreshold`.
pub fn get_proposal_outcome(
    keepers: &dyn Keepers,
    prop: &RepoProposal,
    repo: &Repository,
) -> ProposalOutcome {
    let total_power = match prop.config.voter {
        VoterType::Owner => Decimal::from(repo.owners_joined_by(prop.proposer_max_join_height)),
        VoterType::NetStakers | VoterType::NetStakersAndVetoOwner => {
            keepers.value_of_all_tickets(prop.proposer_max_join_height)
        }
    };

    let votes_received = prop.yes + prop.no + prop.no_with_veto;
    let quorum = percent_of(total_power, prop.config.prop_quorum);
    let threshold = percent_of(votes_received, prop.config.prop_threshold);
    let veto_quorum = percent_of(votes_received, prop.config.prop_veto_quorum);
    let owners_veto_quorum = percent_of(
        Decimal::from(repo.owners.len() as u64),
        prop.config.prop_veto_owners_quorum,
    );

    if votes_received < quorum {
        return ProposalOutcome::QuorumNotMet;
    }
    if prop.no_with_veto > Decimal::from(0) && prop.no_with_veto >= veto_quorum {
        return ProposalOutcome::RejectedWithVeto;
    }
    if prop.config.voter == VoterType::NetStakersAndVetoOwner
        && prop.no_with_veto_by_owners > Decimal::from(0)
        && prop.no_with_veto_by_owners >= owners_veto_quorum
    {
        return ProposalOutcome::RejectedWithVetoByOwners;
    }
    if prop.yes >= threshold && prop.no < threshold {
        return ProposalOutcome::Accepted;
    }
    if prop.no >= threshold && prop.yes < threshold {
        return ProposalOutcome::Rejected;
    }
    ProposalOutcome::BelowThreshold
}

/// Settles the fees of a finalized proposal: refund when the refund policy
/// covers `outcome`, otherwise distribute between the target repository and
/// the helm repository.
pub fn maybe_process_proposal_fee(
    outcome: ProposalOutcome,
    keepers: &mut dyn Keepers,
    params: &Params,
    prop: &RepoProposal,
    repo_name: &str,
    repo: &mut Repository,
) {
    if prop.config.prop_fee_refund_type.refunds_on(outcome) {
        refund_fees(keepers, prop);
        return;
    }

    let total = prop.total_fees();
    if total.is_zero() {
        return;
    }

    let helm_cut = params.helm_fee_cut(total);
    let repo_cut = params.target_repo_fee_cut(total);
    debug!(
        "distributing proposal fees of {}/{}: helm {}, repo {}",
        repo_name, prop.id, helm_cut, repo_cut
    );
    if repo_name == HELM_REPO {
        repo.balance += helm_cut + repo_cut;
        return;
    }
    repo.balance += repo_cut;
    let mut helm = keepers.get_repo(HELM_REPO, None);
    helm.balance += helm_cut;
    keepers.update_repo(HELM_REPO, helm);
}

/// End-of-block hook: finalizes every proposal indexed against the block
/// that follows `height`.
pub fn finalize_proposals_at(
    keepers: &mut dyn Keepers,
    params: &Params,
    registry: &ContractRegistry,
    height: Height,
) -> Result<(), StateError> {
    let ending = keepers.get_proposals_ending_at(height.next());
    for entry in ending {
        let mut repo = keepers.get_repo(&entry.repo, None);
        if !repo.proposals.contains_key(&entry.proposal_id) {
            return Err(StateError::InvariantViolation(format!(
                "indexed proposal {}/{} does not exist",
                entry.repo, entry.proposal_id
            )));
        }
        maybe_apply_proposal(
            keepers,
            params,
            registry,
            &entry.repo,
            &mut repo,
            &entry.proposal_id,
            height,
        )?;
        keepers.update_repo(&entry.repo, repo);
    }
    Ok(())
}

/// Credits every depositor in `prop.fees` with the exact amount they paid.
fn refund_fees(keepers: &mut dyn Keepers, prop: &RepoProposal) {
    for (depositor, value) in &prop.fees {
        let mut account = keepers.get_account(depositor, None);
        account.balance += *value;
        keepers.update_account(depositor, account);
    }
}

fn percent_of(total: Decimal, percent: Decimal) -> Decimal {
    (total * percent / Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keepers::memory::MemStore;
    use pretty_assertions::assert_eq;

    fn owner_addr(c: char) -> Address {
        c.to_string().repeat(40).parse().unwrap()
    }

    fn repo_with_owners(owners: &[Address]) -> Repository {
        let mut repo = Repository::default();
        for owner in owners {
            repo.upsert_owner(owner.clone(), Height(1), false);
        }
        repo
    }

    fn staker_proposal(gov: &GovernanceConfig) -> RepoProposal {
        make_proposal(
            owner_addr('a'),
            gov,
            "1",
            TxType::ProposalUpdateRepo,
            Amount::zero(),
            Height(10),
        )
    }

    #[test]
    fn end_height_arithmetic() {
        let mut gov = GovernanceConfig::default();
        gov.prop_duration = 1000;
        let prop = staker_proposal(&gov);
        assert_eq!(prop.end_at, Height(1011));
        assert_eq!(prop.fee_deposit_end_at, Height::zero());

        gov.prop_fee_deposit_dur = 100;
        let prop = make_proposal(
            owner_addr('a'),
            &gov,
            "1",
            TxType::ProposalUpdateRepo,
            Amount::zero(),
            Height(200),
        );
        assert_eq!(prop.fee_deposit_end_at, Height(301));
        assert_eq!(prop.end_at, Height(1301));
    }

    #[test]
    fn join_height_restriction_is_snapshotted() {
        let mut gov = GovernanceConfig::default();
        gov.req_voter_join_height = true;
        let prop = staker_proposal(&gov);
        assert_eq!(prop.proposer_max_join_height, Height(11));
    }

    #[test]
    fn quorum_not_met() {
        let store = MemStore::new();
        let mut gov = GovernanceConfig::default();
        gov.prop_quorum = Decimal::from(50);
        let repo = repo_with_owners(&[owner_addr('a'), owner_addr('b'), owner_addr('c')]);
        let mut prop = staker_proposal(&gov);
        prop.incr_accept(Decimal::from(1));

        // 1 of 3 owners voted; quorum is round(3 * 50%) = 2.
        assert_eq!(
            get_proposal_outcome(&store, &prop, &repo),
            ProposalOutcome::QuorumNotMet
        );
    }

    #[test]
    fn veto_rejects_before_threshold() {
        let store = MemStore::new();
        let mut gov = GovernanceConfig::default();
        gov.prop_veto_quorum = Decimal::from(33);
        gov.prop_threshold = Decimal::from(51);
        let repo = repo_with_owners(&[owner_addr('a'), owner_addr('b'), owner_addr('c')]);
        let mut prop = staker_proposal(&gov);
        prop.incr_accept(Decimal::from(2));
        prop.incr_veto(Decimal::from(1));

        // veto quorum is round(3 * 33%) = 1; one veto vote suffices.
        assert_eq!(
            get_proposal_outcome(&store, &prop, &repo),
            ProposalOutcome::RejectedWithVeto
        );
    }

    #[test]
    fn owners_veto_requires_staker_owner_voter_type() {
        let store = MemStore::new();
        let mut gov = GovernanceConfig::default();
        gov.voter = VoterType::NetStakersAndVetoOwner;
        gov.prop_veto_owners_quorum = Decimal::from(50);
        let repo = repo_with_owners(&[owner_addr('a'), owner_addr('b')]);

        let mut prop = staker_proposal(&gov);
        prop.incr_accept(Decimal::from(5));
        prop.incr_owner_veto(Decimal::from(1));

        assert_eq!(
            get_proposal_outcome(&store, &prop, &repo),
            ProposalOutcome::RejectedWithVetoByOwners
        );
    }

    #[test]
    fn tie_is_below_threshold() {
        let store = MemStore::new();
        let mut gov = GovernanceConfig::default();
        gov.prop_threshold = Decimal::from(50);
        let repo = repo_with_owners(&[owner_addr('a'), owner_addr('b')]);
        let mut prop = staker_proposal(&gov);
        prop.incr_accept(Decimal::from(1));
        prop.incr_reject(Decimal::from(1));

        // Yes and No both reach the threshold: neither side wins.
        assert_eq!(
            get_proposal_outcome(&store, &prop, &repo),
            ProposalOutcome::BelowThreshold
        );
    }

    #[test]
    fn accept_and_reject() {
        let store = MemStore::new();
        let mut gov = GovernanceConfig::default();
        gov.prop_threshold = Decimal::from(51);
        let repo = repo_with_owners(&[owner_addr('a'), owner_addr('b'), owner_addr('c')]);

        let mut prop = staker_proposal(&gov);
        prop.incr_accept(Decimal::from(2));
        prop.incr_reject(Decimal::from(1));
        assert_eq!(
            get_proposal_outcome(&store, &prop, &repo),
            ProposalOutcome::Accepted
        );

        let mut prop = staker_proposal(&gov);
        prop.incr_accept(Decimal::from(1));
        prop.incr_reject(Decimal::from(2));
        assert_eq!(
            get_proposal_outcome(&store, &prop, &repo),
            ProposalOutcome::Rejected
        );
    }

    #[test]
    fn refund_restores_exact_deposits() {
        let mut store = MemStore::new();
        let gov = GovernanceConfig::default();
        let mut prop = staker_proposal(&gov);
        prop.fees.insert(owner_addr('a'), "1.25".parse().unwrap());
        prop.fees.insert(owner_addr('b'), "0.75".parse().unwrap());

        refund_fees(&mut store, &prop);
        assert_eq!(
            store.get_account(&owner_addr('a'), None).balance,
            "1.25".parse().unwrap()
        );
        assert_eq!(
            store.get_account(&owner_addr('b'), None).balance,
            "0.75".parse().unwrap()
        );
    }

    #[test]
    fn distribution_is_exact_to_the_last_decimal() {
        let mut store = MemStore::new();
        let params = Params::default();
        let gov = GovernanceConfig::default();
        let mut prop = staker_proposal(&gov);
        prop.fees.insert(owner_addr('a'), "3.33".parse().unwrap());

        let mut repo = Repository::default();
        maybe_process_proposal_fee(
            ProposalOutcome::Rejected,
            &mut store,
            &params,
            &prop,
            "target",
            &mut repo,
        );

        let helm = store.get_repo(HELM_REPO, None);
        assert_eq!(repo.balance + helm.balance, "3.33".parse().unwrap());
        assert_eq!(helm.balance, "0.333".parse().unwrap());
    }
}
