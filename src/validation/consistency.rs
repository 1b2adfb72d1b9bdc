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

//! The consistency pass: transaction checks against the world-state.
//!
//! All reads happen at the last committed block height; governance checks
//! look one block ahead since the transaction lands in the next block.

use rust_decimal::Decimal;

use crate::errors::StateError;
use crate::keepers::{
    resolve_namespace_uri, AccountKeeper, Keepers, NamespaceKeeper, PushKeyKeeper, RepoKeeper,
    SysKeeper, TicketManager,
};
use crate::params::Params;
use crate::helpers::Height;
use crate::types::{
    Amount, FeeMode, PushKeyId, Recipient, RepoProposal, Repository, TicketType, Transaction,
    TxPayload, VoterType,
};

/// Runs every state-dependent check against `tx`.
pub fn check(
    tx: &Transaction,
    index: usize,
    keepers: &dyn Keepers,
    params: &Params,
) -> Result<(), StateError> {
    let height = keepers
        .get_last_block_info()
        .map(|info| info.height)
        .unwrap_or_else(Height::zero);

    can_exec_coin_transfer(tx, index, keepers, height)?;

    match &tx.payload {
        TxPayload::TransferCoin { to, .. } => {
            match Recipient::parse(to)
                .map_err(|msg| StateError::bad_field(index, "to", msg))?
            {
                Recipient::Repo(name) => {
                    require_repo(keepers, index, &name, height)?;
                }
                Recipient::Namespace { ns, domain } => {
                    let resolved = resolve_namespace_uri(keepers, &ns, &domain, Some(height))
                        .map_err(|e| {
                            StateError::bad_field(index, "to", e.to_string())
                        })?;
                    if let Recipient::Repo(name) = resolved {
                        require_repo(keepers, index, &name, height)?;
                    }
                }
                Recipient::Account(..) => {}
            }
        }
        TxPayload::TicketPurchase {
            ticket_type,
            value,
            delegate,
            ..
        } => {
            if let Some(delegate) = delegate {
                let active = keepers.get_non_delegated_tickets(delegate, *ticket_type);
                if active.is_empty() {
                    return Err(StateError::bad_field(
                        index,
                        "delegate",
                        "specified delegate is not active",
                    ));
                }
            }
            if *ticket_type == TicketType::Host && value.decimal() < params.min_host_stake {
                return Err(StateError::bad_field(
                    index,
                    "value",
                    format!("value is lower than the minimum host stake of {}", params.min_host_stake),
                ));
            }
        }
        TxPayload::TicketUnbond { ticket_hash } => {
            let ticket = keepers
                .get_by_hash(ticket_hash)
                .ok_or_else(|| StateError::bad_field(index, "ticket_hash", "ticket not found"))?;
            let sender = tx.sender();
            if ticket.owner != sender && ticket.delegator.as_ref() != Some(&sender) {
                return Err(StateError::bad_field(
                    index,
                    "ticket_hash",
                    "sender is not the ticket owner",
                ));
            }
            if ticket.is_decaying() {
                return Err(StateError::bad_field(
                    index,
                    "ticket_hash",
                    "ticket is already decaying",
                ));
            }
        }
        TxPayload::SetDelegatorCommission { .. } => {}
        TxPayload::RegisterPushKey { pub_key, .. } => {
            let id = PushKeyId::from_public_key(pub_key);
            if keepers.get_push_key(&id, Some(height)).is_some() {
                return Err(StateError::bad_field(
                    index,
                    "pub_key",
                    "push key already registered",
                ));
            }
        }
        TxPayload::UpdateDelPushKey { id, .. } => {
            let key = keepers
                .get_push_key(id, Some(height))
                .ok_or_else(|| StateError::bad_field(index, "id", "push key not found"))?;
            if key.address != tx.sender() {
                return Err(StateError::bad_field(
                    index,
                    "id",
                    "sender is not the owner of the key",
                ));
            }
        }
        TxPayload::RegisterNamespace { name, to_repo, .. } => {
            let ns = keepers.get_namespace(name, Some(height));
            if ns.is_held(height.next()) {
                return Err(StateError::bad_field(
                    index,
                    "name",
                    "chosen name is not currently available",
                ));
            }
            if let Some(repo) = to_repo {
                require_repo(keepers, index, repo, height)
                    .map_err(|_| StateError::bad_field(index, "to_repo", "repo not found"))?;
            }
        }
        TxPayload::UpdateNamespaceDomains { name, .. } => {
            let ns = keepers.get_namespace(name, Some(height));
            if ns.is_nil() {
                return Err(StateError::bad_field(index, "name", "namespace not found"));
            }
            if ns.owner.as_ref() != Some(&tx.sender()) {
                return Err(StateError::bad_field(
                    index,
                    "senderPubKey",
                    "sender not permitted to perform this operation",
                ));
            }
        }
        TxPayload::CreateRepo { name, .. } => {
            let repo = keepers.get_repo(name, Some(height));
            if !repo.is_nil() {
                return Err(StateError::bad_field(
                    index,
                    "name",
                    "name is not available. choose another",
                ));
            }
        }
        TxPayload::GitPush { note, endorsements } => {
            let repo = require_repo(keepers, index, &note.repo, height)?;
            let key = keepers
                .get_push_key(&note.pusher_key_id, Some(height))
                .ok_or_else(|| StateError::bad_field(index, "note", "pusher key not found"))?;
            if key.address != tx.sender() {
                return Err(StateError::bad_field(
                    index,
                    "note",
                    "push key does not belong to the sender",
                ));
            }
            if !key.scopes.is_empty() && !key.scopes.iter().any(|s| s == &note.repo) {
                return Err(StateError::bad_field(
                    index,
                    "note",
                    "push key is not scoped for the target repo",
                ));
            }

            let top_hosts = keepers.get_top_hosts(params.num_top_hosts_limit);
            for endorsement in endorsements {
                let is_top = top_hosts
                    .iter()
                    .any(|t| t.proposer == endorsement.endorser_pub_key);
                if !is_top {
                    return Err(StateError::bad_field(
                        index,
                        "endorsements",
                        "endorser is not a top host",
                    ));
                }
            }

            check_push_fee(tx, index, &repo, &key, height)?;
        }
        TxPayload::GasMint { .. } => {}
        TxPayload::GasToCoin { value } | TxPayload::BurnForSwap { value, .. } => {
            let account = keepers.get_account(&tx.sender(), Some(height));
            if account.gas_balance < *value {
                return Err(StateError::bad_field(
                    index,
                    "value",
                    "sender's gas balance is insufficient",
                ));
            }
        }
        TxPayload::ProposalUpsertOwner {
            repo,
            proposal_id,
            value,
            ..
        }
        | TxPayload::ProposalUpdateRepo {
            repo,
            proposal_id,
            value,
            ..
        } => {
            let repo_state = require_repo(keepers, index, repo, height)?;
            check_proposal_creation(tx, index, &repo_state, proposal_id, *value)?;
        }
        TxPayload::ProposalRegisterPushKeys {
            repo,
            proposal_id,
            value,
            namespace,
            namespace_only,
            ..
        } => {
            let repo_state = require_repo(keepers, index, repo, height)?;
            check_proposal_creation(tx, index, &repo_state, proposal_id, *value)?;
            for ns_name in namespace.iter().chain(namespace_only.iter()) {
                if keepers.get_namespace(ns_name, Some(height)).is_nil() {
                    return Err(StateError::bad_field(
                        index,
                        "namespace",
                        "namespace not found",
                    ));
                }
            }
        }
        TxPayload::ProposalVote {
            repo, proposal_id, ..
        } => {
            let repo_state = require_repo(keepers, index, repo, height)?;
            let prop = require_proposal(index, &repo_state, proposal_id)?;
            check_vote(tx, index, keepers, &repo_state, prop, height)?;
        }
        TxPayload::ProposalDepositFee {
            repo, proposal_id, ..
        } => {
            let repo_state = require_repo(keepers, index, repo, height)?;
            let prop = require_proposal(index, &repo_state, proposal_id)?;
            if prop.is_finalized() {
                return Err(StateError::bad_field(index, "id", "proposal has concluded"));
            }
            if !prop.is_fee_deposit_enabled() {
                return Err(StateError::bad_field(
                    index,
                    "id",
                    "fee deposit not enabled for the proposal",
                ));
            }
            if !prop.is_deposit_period(height.next()) {
                return Err(StateError::bad_field(
                    index,
                    "id",
                    "proposal fee deposit period has closed",
                ));
            }
        }
    }
    Ok(())
}

/// Dry run of the coin movement every transaction implies: the sender
/// account must exist, the nonce must be the immediate successor, and the
/// spendable balance must cover value plus fee.
fn can_exec_coin_transfer(
    tx: &Transaction,
    index: usize,
    keepers: &dyn Keepers,
    height: Height,
) -> Result<(), StateError> {
    let account = keepers.get_account(&tx.sender(), Some(height));
    if account.is_nil() {
        return Err(StateError::bad_field(
            index,
            "senderPubKey",
            "sender account not found",
        ));
    }

    let expected = account.nonce + 1;
    if tx.nonce != expected {
        return Err(StateError::bad_field(
            index,
            "nonce",
            format!("invalid nonce; has {}, wants {}", tx.nonce, expected),
        ));
    }

    let spend = coin_spend(tx, keepers, height);
    if account.available_balance(height) < spend {
        return Err(StateError::bad_field(
            index,
            "value",
            "sender's spendable account balance is insufficient",
        ));
    }
    Ok(())
}

/// The coin amount the sender account must cover.
fn coin_spend(tx: &Transaction, keepers: &dyn Keepers, height: Height) -> Amount {
    match &tx.payload {
        // Gas conversions spend the gas balance; only the fee is coin.
        TxPayload::GasToCoin { .. } | TxPayload::BurnForSwap { .. } => tx.fee,
        // Pushes settled by the repository cost the pusher nothing.
        TxPayload::GitPush { note, .. } => {
            let repo = keepers.get_repo(&note.repo, Some(height));
            match repo
                .contributors
                .get(&note.pusher_key_id)
                .map(|c| c.fee_mode)
                .unwrap_or_default()
            {
                FeeMode::PusherPays => tx.fee,
                FeeMode::RepoPays | FeeMode::RepoPaysCapped => Amount::zero(),
            }
        }
        _ => tx.value() + tx.fee,
    }
}

fn check_push_fee(
    tx: &Transaction,
    index: usize,
    repo: &Repository,
    key: &crate::types::PushKey,
    _height: Height,
) -> Result<(), StateError> {
    let fee = tx.fee;
    let note = match &tx.payload {
        TxPayload::GitPush { note, .. } => note,
        _ => unreachable!("caller matched the payload"),
    };

    match repo
        .contributors
        .get(&note.pusher_key_id)
        .map(|c| (c.fee_mode, c.fee_cap, c.fee_used))
    {
        None | Some((FeeMode::PusherPays, ..)) => {
            if !key.within_fee_cap(fee) {
                return Err(StateError::bad_field(
                    index,
                    "fee",
                    "push key fee cap exceeded",
                ));
            }
        }
        Some((FeeMode::RepoPays, ..)) => {
            if repo.balance < fee {
                return Err(StateError::bad_field(
                    index,
                    "fee",
                    "repo balance cannot cover the push fee",
                ));
            }
        }
        Some((FeeMode::RepoPaysCapped, cap, used)) => {
            if repo.balance < fee {
                return Err(StateError::bad_field(
                    index,
                    "fee",
                    "repo balance cannot cover the push fee",
                ));
            }
            if !cap.is_zero() && used + fee > cap {
                return Err(StateError::bad_field(
                    index,
                    "fee",
                    "contributor fee cap exceeded",
                ));
            }
        }
    }
    Ok(())
}

fn check_proposal_creation(
    tx: &Transaction,
    index: usize,
    repo: &Repository,
    proposal_id: &str,
    value: Amount,
) -> Result<(), StateError> {
    if repo.proposals.contains_key(proposal_id) {
        return Err(StateError::bad_field(
            index,
            "id",
            "proposal id has been used, choose another",
        ));
    }

    let gov = &repo.config.governance;
    if gov.prop_fee.is_zero() {
        if !value.is_zero() {
            return Err(StateError::bad_field(
                index,
                "value",
                "proposal fee is not required",
            ));
        }
    } else if gov.prop_fee_deposit_dur == 0 && value < gov.prop_fee {
        return Err(StateError::bad_field(
            index,
            "value",
            format!("proposal fee cannot be less than repo minimum ({})", gov.prop_fee),
        ));
    }

    if gov.voter == VoterType::Owner && !repo.owners.contains_key(&tx.sender()) {
        return Err(StateError::bad_field(
            index,
            "senderPubKey",
            "sender is not one of the repo owners",
        ));
    }
    Ok(())
}

fn check_vote(
    tx: &Transaction,
    index: usize,
    keepers: &dyn Keepers,
    repo: &Repository,
    prop: &RepoProposal,
    height: Height,
) -> Result<(), StateError> {
    if prop.is_finalized() {
        return Err(StateError::bad_field(index, "id", "proposal has concluded"));
    }
    if prop.is_fee_deposit_enabled() && prop.is_deposit_period(height.next()) {
        return Err(StateError::bad_field(
            index,
            "id",
            "proposal is currently in its fee deposit period",
        ));
    }
    if height.next() > prop.end_at {
        return Err(StateError::bad_field(
            index,
            "id",
            "proposal voting period has ended",
        ));
    }

    let sender = tx.sender();
    if prop.voters.contains(&sender) {
        return Err(StateError::bad_field(
            index,
            "id",
            "vote already cast on the target proposal",
        ));
    }

    match prop.config.voter {
        VoterType::Owner => {
            let owner = repo.owners.get(&sender).ok_or_else(|| {
                StateError::bad_field(index, "senderPubKey", "sender is not one of the repo owners")
            })?;
            if prop.proposer_max_join_height != Height::zero()
                && owner.joined_at > prop.proposer_max_join_height
            {
                return Err(StateError::bad_field(
                    index,
                    "senderPubKey",
                    "sender joined after the proposal was created",
                ));
            }
        }
        VoterType::NetStakers | VoterType::NetStakersAndVetoOwner => {
            let stake: Decimal = keepers
                .get_non_delegated_tickets(&tx.sender_pub_key, TicketType::Validator)
                .iter()
                .chain(
                    keepers
                        .get_non_delegated_tickets(&tx.sender_pub_key, TicketType::Host)
                        .iter(),
                )
                .map(|t| t.value.decimal())
                .sum();
            let is_owner = repo.owners.contains_key(&sender);
            let may_vote = stake > Decimal::from(0)
                || (prop.config.voter == VoterType::NetStakersAndVetoOwner && is_owner);
            if !may_vote {
                return Err(StateError::bad_field(
                    index,
                    "senderPubKey",
                    "sender has no voting power on the proposal",
                ));
            }
        }
    }
    Ok(())
}

fn require_repo(
    keepers: &dyn Keepers,
    index: usize,
    name: &str,
    height: Height,
) -> Result<Repository, StateError> {
    let repo = keepers.get_repo(name, Some(height));
    if repo.is_nil() {
        return Err(StateError::bad_field(index, "repo", "repo not found"));
    }
    Ok(repo)
}

fn require_proposal<'a>(
    index: usize,
    repo: &'a Repository,
    proposal_id: &str,
) -> Result<&'a RepoProposal, StateError> {
    repo.proposals
        .get(proposal_id)
        .ok_or_else(|| StateError::bad_field(index, "id", "proposal not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keepers::memory::MemStore;
    use crate::keepers::RepoKeeper;
    use crate::types::Address;
    use assert_matches::assert_matches;
    use exonum_crypto::gen_keypair;

    fn signed_with(
        payload: TxPayload,
        nonce: u64,
    ) -> (Transaction, exonum_crypto::PublicKey, exonum_crypto::SecretKey) {
        let (pub_key, secret_key) = gen_keypair();
        let tx = Transaction::new_signed(
            payload,
            nonce,
            Amount::from(1),
            1_500_000_000,
            pub_key,
            &secret_key,
        );
        (tx, pub_key, secret_key)
    }

    #[test]
    fn unknown_sender_is_rejected() {
        let store = MemStore::new();
        let (tx, ..) = signed_with(
            TxPayload::TransferCoin {
                to: "r/infra".into(),
                value: Amount::from(1),
            },
            1,
        );
        let err = check(&tx, 0, &store, &Params::default()).unwrap_err();
        assert_matches!(err, StateError::BadField { ref field, .. } if field == "senderPubKey");
    }

    #[test]
    fn nonce_must_be_successor() {
        let mut store = MemStore::new();
        let (tx, pub_key, _) = signed_with(
            TxPayload::TransferCoin {
                to: "r/infra".into(),
                value: Amount::from(1),
            },
            5,
        );
        store.credit_account(&Address::from_public_key(&pub_key), Amount::from(100));
        let err = check(&tx, 0, &store, &Params::default()).unwrap_err();
        assert_matches!(
            err,
            StateError::BadField { ref field, ref msg, .. }
                if field == "nonce" && msg.contains("wants 1")
        );
    }

    #[test]
    fn balance_must_cover_value_and_fee() {
        let mut store = MemStore::new();
        let (tx, pub_key, _) = signed_with(
            TxPayload::TransferCoin {
                to: "r/infra".into(),
                value: Amount::from(10),
            },
            1,
        );
        store.credit_account(&Address::from_public_key(&pub_key), Amount::from(10));
        let err = check(&tx, 0, &store, &Params::default()).unwrap_err();
        assert_matches!(
            err,
            StateError::BadField { ref msg, .. } if msg.contains("insufficient")
        );
    }

    #[test]
    fn repo_recipient_must_exist() {
        let mut store = MemStore::new();
        let (tx, pub_key, _) = signed_with(
            TxPayload::TransferCoin {
                to: "r/infra".into(),
                value: Amount::from(1),
            },
            1,
        );
        store.credit_account(&Address::from_public_key(&pub_key), Amount::from(100));
        let err = check(&tx, 0, &store, &Params::default()).unwrap_err();
        assert_matches!(err, StateError::BadField { ref field, .. } if field == "repo");

        let mut repo = Repository::default();
        repo.description = "infra repo".into();
        store.update_repo("infra", repo);
        assert_matches!(check(&tx, 0, &store, &Params::default()), Ok(()));
    }

    #[test]
    fn duplicate_proposal_id_is_rejected() {
        let mut store = MemStore::new();
        let (tx, pub_key, _) = signed_with(
            TxPayload::ProposalUpdateRepo {
                repo: "infra".into(),
                proposal_id: "1".into(),
                value: Amount::zero(),
                config: Default::default(),
                description: None,
            },
            1,
        );
        let sender = Address::from_public_key(&pub_key);
        store.credit_account(&sender, Amount::from(100));

        let mut repo = Repository::default();
        repo.upsert_owner(sender.clone(), Height(1), false);
        let gov = repo.config.governance.clone();
        repo.proposals.insert(
            "1".into(),
            crate::governance::make_proposal(
                sender,
                &gov,
                "1",
                crate::types::TxType::ProposalUpdateRepo,
                Amount::zero(),
                Height(1),
            ),
        );
        store.update_repo("infra", repo);

        let err = check(&tx, 0, &store, &Params::default()).unwrap_err();
        assert_matches!(err, StateError::BadField { ref field, .. } if field == "id");
    }

    #[test]
    fn owner_governance_restricts_creators() {
        let mut store = MemStore::new();
        let (tx, pub_key, _) = signed_with(
            TxPayload::ProposalUpdateRepo {
                repo: "infra".into(),
                proposal_id: "1".into(),
                value: Amount::zero(),
                config: Default::default(),
                description: None,
            },
            1,
        );
        store.credit_account(&Address::from_public_key(&pub_key), Amount::from(100));

        let mut repo = Repository::default();
        repo.upsert_owner("b".repeat(40).parse().unwrap(), Height(1), false);
        store.update_repo("infra", repo);

        let err = check(&tx, 0, &store, &Params::default()).unwrap_err();
        assert_matches!(
            err,
            StateError::BadField { ref msg, .. } if msg.contains("not one of the repo owners")
        );
    }

    #[test]
    fn zero_prop_fee_rejects_positive_value() {
        let mut store = MemStore::new();
        let (tx, pub_key, _) = signed_with(
            TxPayload::ProposalUpdateRepo {
                repo: "infra".into(),
                proposal_id: "1".into(),
                value: Amount::from(2),
                config: Default::default(),
                description: None,
            },
            1,
        );
        let sender = Address::from_public_key(&pub_key);
        store.credit_account(&sender, Amount::from(100));

        let mut repo = Repository::default();
        repo.upsert_owner(sender, Height(1), false);
        store.update_repo("infra", repo);

        let err = check(&tx, 0, &store, &Params::default()).unwrap_err();
        assert_matches!(
            err,
            StateError::BadField { ref msg, .. } if msg.contains("not required")
        );
    }

    #[test]
    fn double_vote_is_rejected() {
        let mut store = MemStore::new();
        let (tx, pub_key, _) = signed_with(
            TxPayload::ProposalVote {
                repo: "infra".into(),
                proposal_id: "1".into(),
                vote: crate::types::VoteChoice::Yes,
            },
            1,
        );
        let sender = Address::from_public_key(&pub_key);
        store.credit_account(&sender, Amount::from(100));

        let mut repo = Repository::default();
        repo.upsert_owner(sender.clone(), Height(1), false);
        repo.upsert_owner("b".repeat(40).parse().unwrap(), Height(1), false);
        let gov = repo.config.governance.clone();
        let mut prop = crate::governance::make_proposal(
            sender.clone(),
            &gov,
            "1",
            crate::types::TxType::ProposalUpdateRepo,
            Amount::zero(),
            Height(0),
        );
        prop.voters.insert(sender);
        repo.proposals.insert("1".into(), prop);
        store.update_repo("infra", repo);

        let err = check(&tx, 0, &store, &Params::default()).unwrap_err();
        assert_matches!(
            err,
            StateError::BadField { ref msg, .. } if msg.contains("already cast")
        );
    }
}
