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

//! Proposal: add owners or change their veto rights.

use super::execute_proposal_creation;
use crate::contracts::{
    wrong_payload, ApplyContext, ExecContext, ProposalApplier, SystemContract,
};
use crate::errors::StateError;
use crate::types::action_keys;
use crate::types::{ActionData, Address, TxPayload, TxType};

/// Proposes adding owners to a repository (or updating their veto right
/// when they already are owners).
#[derive(Debug)]
pub struct UpsertOwner;

impl SystemContract for UpsertOwner {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::ProposalUpsertOwner
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let (repo, proposal_id, value, addresses, veto) = match &ctx.tx.payload {
            TxPayload::ProposalUpsertOwner {
                repo,
                proposal_id,
                value,
                addresses,
                veto,
            } => (
                repo.clone(),
                proposal_id.clone(),
                *value,
                addresses.clone(),
                *veto,
            ),
            _ => return Err(wrong_payload(TxType::ProposalUpsertOwner)),
        };

        let mut data = ActionData::default();
        data.set(action_keys::ADDRS, &addresses);
        data.set(action_keys::VETO, &veto);
        execute_proposal_creation(
            ctx,
            &repo,
            &proposal_id,
            value,
            TxType::ProposalUpsertOwner,
            data,
        )
    }

    fn applier(&self) -> Option<&dyn ProposalApplier> {
        Some(self)
    }
}

impl ProposalApplier for UpsertOwner {
    fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<(), StateError> {
        let addresses: Vec<Address> = ctx.proposal.action_data.require(action_keys::ADDRS)?;
        let veto: bool = ctx.proposal.action_data.require(action_keys::VETO)?;

        for addr in addresses {
            ctx.repo.upsert_owner(addr, ctx.height.next(), veto);
        }
        Ok(())
    }
}
