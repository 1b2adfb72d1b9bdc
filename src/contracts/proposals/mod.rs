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

//! Proposal-creating contracts and the vote/deposit contracts.
//!
//! Creation contracts share one flow: build the proposal, encode the
//! action payload, escrow the proposal fee, hand the proposal to the
//! governance engine, and index it under its end height when it stays
//! pending.

use super::ExecContext;
use crate::errors::{StateError, ERR_APPLY_PROPOSAL, ERR_INDEX_PROPOSAL_END};
use crate::governance;
use crate::keepers::RepoKeeper;
use crate::types::{ActionData, Amount, TxType};

pub mod deposit_fee;
pub mod register_push_keys;
pub mod update_repo;
pub mod upsert_owner;
pub mod vote;

/// The shared creation flow of proposal contracts.
pub(crate) fn execute_proposal_creation(
    ctx: &mut ExecContext<'_>,
    repo_name: &str,
    proposal_id: &str,
    value: Amount,
    action: TxType,
    action_data: ActionData,
) -> Result<(), StateError> {
    let mut repo = ctx.keepers.get_repo(repo_name, None);
    if repo.is_nil() {
        return Err(StateError::InvariantViolation(format!(
            "repo {} vanished between validate and apply",
            repo_name
        )));
    }

    let mut prop = governance::make_proposal(
        ctx.sender(),
        &repo.config.governance,
        proposal_id,
        action,
        value,
        ctx.height,
    );
    prop.action_data = action_data;
    let end_at = prop.end_at;

    ctx.debit_sender(value + ctx.tx.fee)?;
    repo.proposals.insert(proposal_id.to_owned(), prop);

    let applied = governance::maybe_apply_proposal(
        ctx.keepers,
        ctx.params,
        ctx.registry,
        repo_name,
        &mut repo,
        proposal_id,
        ctx.height,
    )
    .map_err(|e| e.wrap(ERR_APPLY_PROPOSAL))?;

    if !applied {
        ctx.keepers
            .index_proposal_end(repo_name, proposal_id, end_at)
            .map_err(|e| e.wrap(ERR_INDEX_PROPOSAL_END))?;
    }

    ctx.keepers.update_repo(repo_name, repo);
    Ok(())
}
