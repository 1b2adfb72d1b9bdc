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

//! Repository creation.

use super::{wrong_payload, ExecContext, SystemContract};
use crate::errors::StateError;
use crate::keepers::RepoKeeper;
use crate::types::{RepoOwner, Repository, TxPayload, TxType};

/// Creates a repository with the sender as its first owner. The transferred
/// value becomes the repository's starting balance.
#[derive(Debug)]
pub struct CreateRepo;

impl SystemContract for CreateRepo {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::CreateRepo
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let (name, description, value, config) = match &ctx.tx.payload {
            TxPayload::CreateRepo {
                name,
                description,
                value,
                config,
            } => (name.clone(), description.clone(), *value, config.clone()),
            _ => return Err(wrong_payload(TxType::CreateRepo)),
        };

        ctx.debit_sender(value + ctx.tx.fee)?;

        let mut repo = Repository::default();
        repo.config.merge(&config);
        repo.balance = value;
        repo.description = description;
        repo.owners.insert(
            ctx.sender(),
            RepoOwner {
                creator: true,
                joined_at: ctx.height.next(),
                veto: false,
            },
        );
        ctx.keepers.update_repo(&name, repo);
        info!("repo {} created", name);
        Ok(())
    }
}
