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

//! Push key registration and maintenance.

use super::{wrong_payload, ExecContext, SystemContract};
use crate::errors::StateError;
use crate::keepers::PushKeyKeeper;
use crate::types::{PushKey, PushKeyId, TxPayload, TxType};

/// Registers a push key under the sender account.
#[derive(Debug)]
pub struct RegisterPushKey;

impl SystemContract for RegisterPushKey {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::RegisterPushKey
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let (pub_key, scopes, fee_cap) = match &ctx.tx.payload {
            TxPayload::RegisterPushKey {
                pub_key,
                scopes,
                fee_cap,
            } => (*pub_key, scopes.clone(), *fee_cap),
            _ => return Err(wrong_payload(TxType::RegisterPushKey)),
        };

        ctx.debit_sender(ctx.tx.fee)?;
        let id = PushKeyId::from_public_key(&pub_key);
        ctx.keepers.update_push_key(
            &id,
            PushKey {
                pub_key,
                address: ctx.sender(),
                scopes,
                fee_cap,
                fee_used: crate::types::Amount::zero(),
            },
        );
        debug!("push key {} registered", id);
        Ok(())
    }
}

/// Updates the scopes or fee cap of a push key, or deletes it.
#[derive(Debug)]
pub struct UpdateDelPushKey;

impl SystemContract for UpdateDelPushKey {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::UpdateDelPushKey
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let (id, delete, add_scopes, remove_scopes, fee_cap) = match &ctx.tx.payload {
            TxPayload::UpdateDelPushKey {
                id,
                delete,
                add_scopes,
                remove_scopes,
                fee_cap,
            } => (
                id.clone(),
                *delete,
                add_scopes.clone(),
                remove_scopes.clone(),
                *fee_cap,
            ),
            _ => return Err(wrong_payload(TxType::UpdateDelPushKey)),
        };

        ctx.debit_sender(ctx.tx.fee)?;

        if delete {
            ctx.keepers.remove_push_key(&id);
            debug!("push key {} removed", id);
            return Ok(());
        }

        let mut key = ctx.keepers.get_push_key(&id, None).ok_or_else(|| {
            StateError::InvariantViolation(format!(
                "push key {} vanished between validate and apply",
                id
            ))
        })?;
        key.scopes.retain(|s| !remove_scopes.contains(s));
        for scope in add_scopes {
            if !key.scopes.contains(&scope) {
                key.scopes.push(scope);
            }
        }
        if let Some(cap) = fee_cap {
            key.fee_cap = cap;
        }
        ctx.keepers.update_push_key(&id, key);
        Ok(())
    }
}
