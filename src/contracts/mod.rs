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

//! The system contract table.
//!
//! Each transaction type is realized by a contract. Contracts are registered
//! in a fixed order and dispatch picks the first contract whose `can_exec`
//! accepts the transaction type; the registration order is normative because
//! `can_exec` predicates are not required to be disjoint (in this table they
//! are, which `tests` asserts).
//!
//! Proposal contracts additionally expose an applier: the idempotent effect
//! of a *passed* proposal on repository state. Appliers are reached back
//! through the registry handle carried by the contexts, never through
//! direct contract-to-contract calls.

use std::fmt;

use crate::errors::StateError;
use crate::helpers::Height;
use crate::keepers::{AccountKeeper, Keepers};
use crate::params::Params;
use crate::types::{Account, Address, Amount, RepoProposal, Repository, Transaction, TxType};

pub mod commission;
pub mod create_repo;
pub mod gas;
pub mod namespace;
pub mod proposals;
pub mod push;
pub mod push_key;
pub mod ticket;
pub mod transfer_coin;

/// Execution context of a single transaction.
pub struct ExecContext<'a> {
    /// World-state facade.
    pub keepers: &'a mut dyn Keepers,
    /// Protocol parameters.
    pub params: &'a Params,
    /// Shared handle to the contract table.
    pub registry: &'a ContractRegistry,
    /// The transaction being executed.
    pub tx: &'a Transaction,
    /// Height of the last committed block; the transaction lands in the
    /// block at `height + 1`.
    pub height: Height,
}

impl<'a> fmt::Debug for ExecContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecContext")
            .field("tx_type", &self.tx.tx_type())
            .field("height", &self.height)
            .finish()
    }
}

impl<'a> ExecContext<'a> {
    /// Address of the transaction sender.
    pub fn sender(&self) -> Address {
        self.tx.sender()
    }

    /// Reads the sender account from the working state.
    pub fn sender_account(&self) -> Account {
        self.keepers.get_account(&self.sender(), None)
    }

    /// Debits `total` from the sender, increments the nonce, cleans released
    /// stakes and writes the account back.
    pub fn debit_sender(&mut self, total: Amount) -> Result<(), StateError> {
        let sender = self.sender();
        let mut account = self.keepers.get_account(&sender, None);
        account.balance = account.balance.checked_sub(total).ok_or_else(|| {
            StateError::InsufficientBalance(format!(
                "sender balance {} cannot cover {}",
                account.balance, total
            ))
        })?;
        account.nonce += 1;
        account.clean(self.height.next());
        self.keepers.update_account(&sender, account);
        Ok(())
    }
}

/// Context handed to a proposal applier once its proposal passed.
pub struct ApplyContext<'a> {
    /// World-state facade.
    pub keepers: &'a mut dyn Keepers,
    /// Protocol parameters.
    pub params: &'a Params,
    /// The passed proposal.
    pub proposal: &'a RepoProposal,
    /// The repository the proposal targets, loaded into the working state.
    pub repo: &'a mut Repository,
    /// Name of the target repository.
    pub repo_name: &'a str,
    /// Height of the last committed block.
    pub height: Height,
}

impl<'a> fmt::Debug for ApplyContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplyContext")
            .field("repo", &self.repo_name)
            .field("proposal", &self.proposal.id)
            .field("height", &self.height)
            .finish()
    }
}

/// The idempotent effect of a passed proposal on repository state.
pub trait ProposalApplier {
    /// Applies the proposal carried by `ctx` to its repository.
    fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<(), StateError>;
}

/// A system contract: the implementation of one transaction type.
pub trait SystemContract: fmt::Debug {
    /// Whether this contract implements `tx_type`.
    fn can_exec(&self, tx_type: TxType) -> bool;

    /// Executes the transaction carried by `ctx`.
    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError>;

    /// The proposal applier, for contracts that realize proposal actions.
    fn applier(&self) -> Option<&dyn ProposalApplier> {
        None
    }
}

/// The ordered contract table.
#[derive(Debug)]
pub struct ContractRegistry {
    contracts: Vec<Box<dyn SystemContract>>,
}

impl ContractRegistry {
    /// Builds the standard table with every core contract registered.
    pub fn standard() -> Self {
        ContractRegistry {
            contracts: vec![
                Box::new(transfer_coin::TransferCoin),
                Box::new(ticket::PurchaseTicket),
                Box::new(ticket::UnbondTicket),
                Box::new(commission::SetDelegatorCommission),
                Box::new(push_key::RegisterPushKey),
                Box::new(push_key::UpdateDelPushKey),
                Box::new(namespace::RegisterNamespace),
                Box::new(namespace::UpdateNamespaceDomains),
                Box::new(create_repo::CreateRepo),
                Box::new(push::GitPush),
                Box::new(gas::GasMint),
                Box::new(gas::GasToCoin),
                Box::new(gas::BurnForSwap),
                Box::new(proposals::upsert_owner::UpsertOwner),
                Box::new(proposals::update_repo::UpdateRepo),
                Box::new(proposals::register_push_keys::RegisterRepoPushKeys),
                Box::new(proposals::vote::VoteProposal),
                Box::new(proposals::deposit_fee::DepositProposalFee),
            ],
        }
    }

    /// First contract accepting `tx_type`, if any.
    pub fn dispatch(&self, tx_type: TxType) -> Option<&dyn SystemContract> {
        self.contracts
            .iter()
            .find(|c| c.can_exec(tx_type))
            .map(|c| &**c)
    }

    /// Applier of the first contract accepting `action`, if that contract
    /// realizes proposals.
    pub fn applier_for(&self, action: TxType) -> Option<&dyn ProposalApplier> {
        self.dispatch(action).and_then(|c| c.applier())
    }

    /// Registered contracts, in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn SystemContract> {
        self.contracts.iter().map(|c| &**c)
    }
}

/// Destructuring a payload the dispatcher routed to the wrong contract is a
/// bug in the table, never a transaction failure.
pub(crate) fn wrong_payload(expected: TxType) -> StateError {
    StateError::InvariantViolation(format!(
        "contract for {} dispatched with a foreign payload",
        expected.as_str()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TYPES: [TxType; 18] = [
        TxType::TransferCoin,
        TxType::TicketPurchase,
        TxType::TicketUnbond,
        TxType::SetDelegatorCommission,
        TxType::RegisterPushKey,
        TxType::UpdateDelPushKey,
        TxType::RegisterNamespace,
        TxType::UpdateNamespaceDomains,
        TxType::CreateRepo,
        TxType::GitPush,
        TxType::GasMint,
        TxType::GasToCoin,
        TxType::BurnForSwap,
        TxType::ProposalUpsertOwner,
        TxType::ProposalUpdateRepo,
        TxType::ProposalRegisterPushKeys,
        TxType::ProposalVote,
        TxType::ProposalDepositFee,
    ];

    #[test]
    fn every_type_has_exactly_one_contract() {
        let registry = ContractRegistry::standard();
        for ty in ALL_TYPES.iter() {
            let matching = registry.iter().filter(|c| c.can_exec(*ty)).count();
            assert_eq!(matching, 1, "{} must match exactly one contract", ty.as_str());
        }
    }

    #[test]
    fn proposal_actions_have_appliers() {
        let registry = ContractRegistry::standard();
        for ty in &[
            TxType::ProposalUpsertOwner,
            TxType::ProposalUpdateRepo,
            TxType::ProposalRegisterPushKeys,
        ] {
            assert!(registry.applier_for(*ty).is_some());
        }
        assert!(registry.applier_for(TxType::TransferCoin).is_none());
    }
}
