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

//! Proposal: update repository configuration or description.

use super::execute_proposal_creation;
use crate::contracts::{
    wrong_payload, ApplyContext, ExecContext, ProposalApplier, SystemContract,
};
use crate::errors::StateError;
use crate::types::action_keys;
use crate::types::{ActionData, RepoConfigUpdate, TxPayload, TxType};

/// Proposes merging a partial configuration (and optionally a new
/// description) onto a repository.
#[derive(Debug)]
pub struct UpdateRepo;

impl SystemContract for UpdateRepo {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::ProposalUpdateRepo
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let (repo, proposal_id, value, config, description) = match &ctx.tx.payload {
            TxPayload::ProposalUpdateRepo {
                repo,
                proposal_id,
                value,
                config,
                description,
            } => (
                repo.clone(),
                proposal_id.clone(),
                *value,
                config.clone(),
                description.clone(),
            ),
            _ => return Err(wrong_payload(TxType::ProposalUpdateRepo)),
        };

        let mut data = ActionData::default();
        data.set(action_keys::CFG, &config);
        if let Some(description) = &description {
            data.set(action_keys::DESCRIPTION, description);
        }
        execute_proposal_creation(
            ctx,
            &repo,
            &proposal_id,
            value,
            TxType::ProposalUpdateRepo,
            data,
        )
    }

    fn applier(&self) -> Option<&dyn ProposalApplier> {
        Some(self)
    }
}

impl ProposalApplier for UpdateRepo {
    fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<(), StateError> {
        // Absent keys mean "no change".
        if let Some(config) = ctx
            .proposal
            .action_data
            .get::<RepoConfigUpdate>(action_keys::CFG)?
        {
            ctx.repo.config.merge(&config);
        }
        if let Some(description) = ctx
            .proposal
            .action_data
            .get::<String>(action_keys::DESCRIPTION)?
        {
            ctx.repo.description = description;
        }
        Ok(())
    }
}
