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

//! The keeper facade: capability-scoped access to the world-state.
//!
//! The node's storage layer implements these traits on top of its versioned
//! state tree; the in-memory [`MemStore`](memory/struct.MemStore.html)
//! implements them for tests. Reads are height-aware (`None` reads the
//! working state of the current block); writes are buffered by the driver
//! and committed atomically with the block.
//!
//! `get_*` accessors return a default ("barebone") record when the entity
//! does not exist; callers distinguish through the types' `is_nil` methods.

use exonum_crypto::{Hash, PublicKey};
use rust_decimal::Decimal;

use crate::errors::StateError;
use crate::helpers::Height;
use crate::types::{
    Account, Address, BlockInfo, Namespace, PushKey, PushKeyId, Repository, Ticket, TicketType,
};

pub mod memory;

/// A proposal indexed under its finalization height.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EndingProposal {
    /// Repository that holds the proposal.
    pub repo: String,
    /// Proposal identifier.
    pub proposal_id: String,
}

/// Access to network accounts.
pub trait AccountKeeper {
    /// Reads an account; a barebone account if the address is unknown.
    fn get_account(&self, addr: &Address, height: Option<Height>) -> Account;

    /// Writes an account back. Implementations drop records that report
    /// `is_nil`.
    fn update_account(&mut self, addr: &Address, account: Account);
}

/// Access to repositories and the proposal end-height index.
pub trait RepoKeeper {
    /// Reads a repository; a barebone repository if the name is unknown.
    fn get_repo(&self, name: &str, height: Option<Height>) -> Repository;

    /// Writes a repository back.
    fn update_repo(&mut self, name: &str, repo: Repository);

    /// Indexes a pending proposal under the height it finalizes at, so the
    /// end-of-block finalizer can find it.
    fn index_proposal_end(
        &mut self,
        repo: &str,
        proposal_id: &str,
        end_height: Height,
    ) -> Result<(), StateError>;

    /// Proposals indexed under `height`, in canonical order.
    fn get_proposals_ending_at(&self, height: Height) -> Vec<EndingProposal>;
}

/// Access to namespaces.
pub trait NamespaceKeeper {
    /// Reads a namespace; a barebone namespace if the name is unknown.
    fn get_namespace(&self, name: &str, height: Option<Height>) -> Namespace;

    /// Writes a namespace back.
    fn update_namespace(&mut self, name: &str, ns: Namespace);
}

/// Access to registered push keys.
pub trait PushKeyKeeper {
    /// Reads a push key.
    fn get_push_key(&self, id: &PushKeyId, height: Option<Height>) -> Option<PushKey>;

    /// Writes a push key.
    fn update_push_key(&mut self, id: &PushKeyId, key: PushKey);

    /// Removes a push key.
    fn remove_push_key(&mut self, id: &PushKeyId);
}

/// Access to chain-level system records.
pub trait SysKeeper {
    /// Information about the last committed block, if any block has been
    /// committed.
    fn get_last_block_info(&self) -> Option<BlockInfo>;
}

/// Query and forwarding interface of the ticket manager. Ticket lifecycle
/// internals (maturation, decay, expiry) live outside the core.
pub trait TicketManager {
    /// Looks a ticket up by the hash of its purchasing transaction.
    fn get_by_hash(&self, hash: &Hash) -> Option<Ticket>;

    /// Active, non-delegated tickets proposed by `proposer`.
    fn get_non_delegated_tickets(&self, proposer: &PublicKey, ticket_type: TicketType)
        -> Vec<Ticket>;

    /// Total value of live tickets purchased at or before `max_height`.
    /// A zero `max_height` counts every live ticket.
    fn value_of_all_tickets(&self, max_height: Height) -> Decimal;

    /// The top `limit` hosts by ticket value.
    fn get_top_hosts(&self, limit: usize) -> Vec<Ticket>;

    /// Forwards a purchase to the ticket manager.
    fn register_ticket(&mut self, ticket: Ticket);

    /// Marks a ticket for decay ending at `decay_by`.
    fn mark_for_decay(&mut self, hash: &Hash, decay_by: Height);
}

/// The full facade handed to contracts: every capability group in one
/// borrowed view.
pub trait Keepers:
    AccountKeeper + RepoKeeper + NamespaceKeeper + PushKeyKeeper + SysKeeper + TicketManager
{
}

impl<T> Keepers for T where
    T: AccountKeeper + RepoKeeper + NamespaceKeeper + PushKeyKeeper + SysKeeper + TicketManager
{
}

/// Upper bound on chained namespace lookups while resolving a URI.
const MAX_NAMESPACE_RESOLUTION_DEPTH: usize = 10;

/// Resolves a `<namespace>/<domain>` URI down to a concrete account or
/// repository, following domain targets that point at further namespaces.
pub fn resolve_namespace_uri(
    keepers: &dyn Keepers,
    ns: &str,
    domain: &str,
    height: Option<Height>,
) -> Result<crate::types::Recipient, StateError> {
    use crate::types::Recipient;

    let mut ns = ns.to_owned();
    let mut domain = domain.to_owned();
    for _ in 0..MAX_NAMESPACE_RESOLUTION_DEPTH {
        let namespace = keepers.get_namespace(&ns, height);
        if namespace.is_nil() {
            return Err(StateError::NotFound(format!("namespace {}", ns)));
        }
        let target = namespace
            .domains
            .get(&domain)
            .ok_or_else(|| StateError::NotFound(format!("namespace domain {}/{}", ns, domain)))?;
        match Recipient::parse(target)
            .map_err(|_| StateError::NotFound(format!("namespace domain {}/{}", ns, domain)))?
        {
            Recipient::Namespace {
                ns: next_ns,
                domain: next_domain,
            } => {
                ns = next_ns;
                domain = next_domain;
            }
            resolved => return Ok(resolved),
        }
    }
    Err(StateError::NotFound(format!(
        "namespace domain {}/{} does not resolve",
        ns, domain
    )))
}
