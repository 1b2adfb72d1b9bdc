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

//! Topping up proposal fee deposits.

use crate::contracts::{wrong_payload, ExecContext, SystemContract};
use crate::errors::StateError;
use crate::keepers::RepoKeeper;
use crate::types::{TxPayload, TxType};

/// Deposits an additional fee contribution into a proposal during its
/// deposit window.
#[derive(Debug)]
pub struct DepositProposalFee;

impl SystemContract for DepositProposalFee {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::ProposalDepositFee
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let (repo_name, proposal_id, value) = match &ctx.tx.payload {
            TxPayload::ProposalDepositFee {
                repo,
                proposal_id,
                value,
            } => (repo.clone(), proposal_id.clone(), *value),
            _ => return Err(wrong_payload(TxType::ProposalDepositFee)),
        };

        let sender = ctx.sender();
        let mut repo = ctx.keepers.get_repo(&repo_name, None);
        let prop = repo.proposals.get_mut(&proposal_id).ok_or_else(|| {
            StateError::InvariantViolation(format!(
                "proposal {}/{} vanished between validate and apply",
                repo_name, proposal_id
            ))
        })?;
        prop.add_fee(sender, value);

        ctx.debit_sender(value + ctx.tx.fee)?;
        ctx.keepers.update_repo(&repo_name, repo);
        debug!(
            "fee deposit of {} added to proposal {}/{}",
            value, repo_name, proposal_id
        );
        Ok(())
    }
}
