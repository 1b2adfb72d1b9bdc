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

//! A deterministic in-memory keeper implementation.
//!
//! `MemStore` plays the role a temporary database plays in node tests: it
//! implements every keeper trait over `BTreeMap`s, so iteration order is
//! canonical and test runs are reproducible. Height-scoped reads return the
//! current working state; the store keeps no history.

use exonum_crypto::{Hash, PublicKey};
use rust_decimal::Decimal;

use std::collections::{BTreeMap, BTreeSet};

use super::{
    AccountKeeper, EndingProposal, NamespaceKeeper, PushKeyKeeper, RepoKeeper, SysKeeper,
    TicketManager,
};
use crate::errors::StateError;
use crate::helpers::Height;
use crate::types::{
    Account, Address, Amount, BlockInfo, Namespace, PushKey, PushKeyId, Repository, Ticket,
    TicketType,
};

/// In-memory world-state.
#[derive(Debug, Default, PartialEq)]
pub struct MemStore {
    accounts: BTreeMap<Address, Account>,
    repos: BTreeMap<String, Repository>,
    namespaces: BTreeMap<String, Namespace>,
    push_keys: BTreeMap<PushKeyId, PushKey>,
    tickets: BTreeMap<Hash, Ticket>,
    proposal_ends: BTreeMap<Height, BTreeSet<EndingProposal>>,
    last_block: Option<BlockInfo>,
}

impl MemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the last committed block, as the block driver would.
    pub fn set_last_block_info(&mut self, info: BlockInfo) {
        self.last_block = Some(info);
    }

    /// Credits `value` to an account, creating it lazily.
    pub fn credit_account(&mut self, addr: &Address, value: Amount) {
        let mut account = self.get_account(addr, None);
        account.balance += value;
        self.update_account(addr, account);
    }

    /// Sum of all coin balances held in accounts and repositories. Test
    /// helper for balance-conservation checks.
    pub fn total_coin_supply(&self) -> Amount {
        let accounts: Amount = self.accounts.values().map(|a| a.balance).sum();
        let repos: Amount = self.repos.values().map(|r| r.balance).sum();
        accounts + repos
    }
}

impl AccountKeeper for MemStore {
    fn get_account(&self, addr: &Address, _height: Option<Height>) -> Account {
        self.accounts.get(addr).cloned().unwrap_or_default()
    }

    fn update_account(&mut self, addr: &Address, account: Account) {
        if account.is_nil() {
            self.accounts.remove(addr);
        } else {
            self.accounts.insert(addr.clone(), account);
        }
    }
}

impl RepoKeeper for MemStore {
    fn get_repo(&self, name: &str, _height: Option<Height>) -> Repository {
        self.repos.get(name).cloned().unwrap_or_default()
    }

    fn update_repo(&mut self, name: &str, repo: Repository) {
        self.repos.insert(name.to_owned(), repo);
    }

    fn index_proposal_end(
        &mut self,
        repo: &str,
        proposal_id: &str,
        end_height: Height,
    ) -> Result<(), StateError> {
        self.proposal_ends
            .entry(end_height)
            .or_insert_with(BTreeSet::new)
            .insert(EndingProposal {
                repo: repo.to_owned(),
                proposal_id: proposal_id.to_owned(),
            });
        Ok(())
    }

    fn get_proposals_ending_at(&self, height: Height) -> Vec<EndingProposal> {
        self.proposal_ends
            .get(&height)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl NamespaceKeeper for MemStore {
    fn get_namespace(&self, name: &str, _height: Option<Height>) -> Namespace {
        self.namespaces.get(name).cloned().unwrap_or_default()
    }

    fn update_namespace(&mut self, name: &str, ns: Namespace) {
        self.namespaces.insert(name.to_owned(), ns);
    }
}

impl PushKeyKeeper for MemStore {
    fn get_push_key(&self, id: &PushKeyId, _height: Option<Height>) -> Option<PushKey> {
        self.push_keys.get(id).cloned()
    }

    fn update_push_key(&mut self, id: &PushKeyId, key: PushKey) {
        self.push_keys.insert(id.clone(), key);
    }

    fn remove_push_key(&mut self, id: &PushKeyId) {
        self.push_keys.remove(id);
    }
}

impl SysKeeper for MemStore {
    fn get_last_block_info(&self) -> Option<BlockInfo> {
        self.last_block
    }
}

impl TicketManager for MemStore {
    fn get_by_hash(&self, hash: &Hash) -> Option<Ticket> {
        self.tickets.get(hash).cloned()
    }

    fn get_non_delegated_tickets(
        &self,
        proposer: &PublicKey,
        ticket_type: TicketType,
    ) -> Vec<Ticket> {
        self.tickets
            .values()
            .filter(|t| {
                t.ticket_type == ticket_type && &t.proposer == proposer && !t.is_delegated()
            })
            .cloned()
            .collect()
    }

    fn value_of_all_tickets(&self, max_height: Height) -> Decimal {
        self.tickets
            .values()
            .filter(|t| max_height == Height::zero() || t.height <= max_height)
            .filter(|t| !t.is_decaying())
            .map(|t| t.value.decimal())
            .sum()
    }

    fn get_top_hosts(&self, limit: usize) -> Vec<Ticket> {
        let mut hosts: Vec<_> = self
            .tickets
            .values()
            .filter(|t| t.ticket_type == TicketType::Host && !t.is_decaying())
            .cloned()
            .collect();
        hosts.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.hash.cmp(&b.hash)));
        hosts.truncate(limit);
        hosts
    }

    fn register_ticket(&mut self, ticket: Ticket) {
        self.tickets.insert(ticket.hash, ticket);
    }

    fn mark_for_decay(&mut self, hash: &Hash, decay_by: Height) {
        if let Some(ticket) = self.tickets.get_mut(hash) {
            ticket.decay_by = decay_by;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nil_accounts_are_dropped() {
        let mut store = MemStore::new();
        let addr: Address = "a".repeat(40).parse().unwrap();
        store.credit_account(&addr, Amount::from(5));
        assert_eq!(store.get_account(&addr, None).balance, Amount::from(5));

        let mut account = store.get_account(&addr, None);
        account.balance = Amount::zero();
        store.update_account(&addr, account);
        assert!(store.accounts.is_empty());
    }

    #[test]
    fn proposal_end_index_is_ordered() {
        let mut store = MemStore::new();
        store.index_proposal_end("zeta", "2", Height(10)).unwrap();
        store.index_proposal_end("alpha", "1", Height(10)).unwrap();
        store.index_proposal_end("alpha", "9", Height(11)).unwrap();

        let ending = store.get_proposals_ending_at(Height(10));
        assert_eq!(ending.len(), 2);
        assert_eq!(ending[0].repo, "alpha");
        assert_eq!(ending[1].repo, "zeta");
        assert!(store.get_proposals_ending_at(Height(12)).is_empty());
    }
}
