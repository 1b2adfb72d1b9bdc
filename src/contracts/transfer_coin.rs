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

//! Coin transfers.

use super::{wrong_payload, ExecContext, SystemContract};
use crate::errors::StateError;
use crate::keepers::{resolve_namespace_uri, AccountKeeper, RepoKeeper};
use crate::types::{Recipient, TxPayload, TxType};

/// Transfers coins to an account, a repository, or a namespace-addressed
/// target.
#[derive(Debug)]
pub struct TransferCoin;

impl SystemContract for TransferCoin {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::TransferCoin
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let (to, value) = match &ctx.tx.payload {
            TxPayload::TransferCoin { to, value } => (to.clone(), *value),
            _ => return Err(wrong_payload(TxType::TransferCoin)),
        };

        ctx.debit_sender(value + ctx.tx.fee)?;

        let recipient = Recipient::parse(&to)
            .map_err(StateError::InvariantViolation)
            .and_then(|r| match r {
                Recipient::Namespace { ns, domain } => {
                    resolve_namespace_uri(ctx.keepers, &ns, &domain, None).map_err(|_| {
                        StateError::InvariantViolation(format!(
                            "recipient {} no longer resolves",
                            to
                        ))
                    })
                }
                direct => Ok(direct),
            })?;

        match recipient {
            Recipient::Account(addr) => {
                let mut account = ctx.keepers.get_account(&addr, None);
                account.balance += value;
                ctx.keepers.update_account(&addr, account);
                debug!("transferred {} to account {}", value, addr);
            }
            Recipient::Repo(name) => {
                let mut repo = ctx.keepers.get_repo(&name, None);
                if repo.is_nil() {
                    return Err(StateError::InvariantViolation(format!(
                        "recipient repo {} vanished between validate and apply",
                        name
                    )));
                }
                repo.balance += value;
                ctx.keepers.update_repo(&name, repo);
                debug!("transferred {} to repo {}", value, name);
            }
            Recipient::Namespace { .. } => {
                return Err(StateError::InvariantViolation(
                    "namespace resolution yielded another namespace".to_owned(),
                ));
            }
        }
        Ok(())
    }
}
