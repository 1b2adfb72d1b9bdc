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

//! The git push contract.
//!
//! The core settles the push fee (honoring the contributor's fee mode) and
//! advances the pusher's nonce. Applying the pushed references to the git
//! object store is delegated to the repository layer.

use super::{wrong_payload, ExecContext, SystemContract};
use crate::errors::StateError;
use crate::keepers::{AccountKeeper, PushKeyKeeper, RepoKeeper};
use crate::types::{FeeMode, PushNote, TxPayload, TxType};

/// Executes an endorsed push note.
#[derive(Debug)]
pub struct GitPush;

impl GitPush {
    /// Settles the push fee against the repository balance for repo-paying
    /// contributors.
    fn settle_repo_fee(
        &self,
        ctx: &mut ExecContext<'_>,
        note: &PushNote,
        capped: bool,
    ) -> Result<(), StateError> {
        let fee = ctx.tx.fee;
        let mut repo = ctx.keepers.get_repo(&note.repo, None);
        let contributor = repo
            .contributors
            .get_mut(&note.pusher_key_id)
            .ok_or_else(|| {
                StateError::InvariantViolation(format!(
                    "contributor {} vanished between validate and apply",
                    note.pusher_key_id
                ))
            })?;

        if capped {
            let within = contributor.fee_cap.is_zero()
                || contributor.fee_used + fee <= contributor.fee_cap;
            if !within {
                return Err(StateError::InsufficientBalance(format!(
                    "contributor fee cap {} exhausted",
                    contributor.fee_cap
                )));
            }
        }
        contributor.fee_used += fee;
        repo.balance = repo.balance.checked_sub(fee).ok_or_else(|| {
            StateError::InsufficientBalance(format!(
                "repo balance {} cannot cover push fee {}",
                repo.balance, fee
            ))
        })?;
        ctx.keepers.update_repo(&note.repo, repo);

        // The pusher still commits a transaction: advance the nonce without
        // touching the balance.
        let sender = ctx.sender();
        let mut account = ctx.keepers.get_account(&sender, None);
        account.nonce += 1;
        ctx.keepers.update_account(&sender, account);
        Ok(())
    }
}

impl SystemContract for GitPush {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::GitPush
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let note = match &ctx.tx.payload {
            TxPayload::GitPush { note, .. } => note.clone(),
            _ => return Err(wrong_payload(TxType::GitPush)),
        };

        let repo = ctx.keepers.get_repo(&note.repo, None);
        let fee_mode = repo
            .contributors
            .get(&note.pusher_key_id)
            .map(|c| c.fee_mode)
            .unwrap_or_default();

        match fee_mode {
            FeeMode::PusherPays => {
                ctx.debit_sender(ctx.tx.fee)?;
                let mut key = ctx
                    .keepers
                    .get_push_key(&note.pusher_key_id, None)
                    .ok_or_else(|| {
                        StateError::InvariantViolation(format!(
                            "push key {} vanished between validate and apply",
                            note.pusher_key_id
                        ))
                    })?;
                key.fee_used += ctx.tx.fee;
                ctx.keepers.update_push_key(&note.pusher_key_id, key);
            }
            FeeMode::RepoPays => self.settle_repo_fee(ctx, &note, false)?,
            FeeMode::RepoPaysCapped => self.settle_repo_fee(ctx, &note, true)?,
        }

        debug!(
            "push of {} reference(s) to {} settled",
            note.references.len(),
            note.repo
        );
        Ok(())
    }
}
