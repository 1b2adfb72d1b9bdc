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

//! Casting votes on proposals.

use rust_decimal::Decimal;

use crate::contracts::{wrong_payload, ExecContext, SystemContract};
use crate::errors::StateError;
use crate::keepers::{RepoKeeper, TicketManager};
use crate::types::{TallyMethod, TicketType, TxPayload, TxType, VoteChoice, VoterType};

/// Casts the sender's vote on an open proposal.
#[derive(Debug)]
pub struct VoteProposal;

impl SystemContract for VoteProposal {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::ProposalVote
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let (repo_name, proposal_id, vote) = match &ctx.tx.payload {
            TxPayload::ProposalVote {
                repo,
                proposal_id,
                vote,
            } => (repo.clone(), proposal_id.clone(), *vote),
            _ => return Err(wrong_payload(TxType::ProposalVote)),
        };

        let sender = ctx.sender();
        let mut repo = ctx.keepers.get_repo(&repo_name, None);
        let is_veto_owner = repo
            .owners
            .get(&sender)
            .map(|o| o.veto)
            .unwrap_or(false);

        // Vote weight under net-stake tallying is the value of the voter's
        // own (non-delegated) tickets.
        let stake_weight: Decimal = ctx
            .keepers
            .get_non_delegated_tickets(&ctx.tx.sender_pub_key, TicketType::Validator)
            .iter()
            .chain(
                ctx.keepers
                    .get_non_delegated_tickets(&ctx.tx.sender_pub_key, TicketType::Host)
                    .iter(),
            )
            .map(|t| t.value.decimal())
            .sum();

        let prop = repo.proposals.get_mut(&proposal_id).ok_or_else(|| {
            StateError::InvariantViolation(format!(
                "proposal {}/{} vanished between validate and apply",
                repo_name, proposal_id
            ))
        })?;

        let weight = match prop.config.tally_method {
            TallyMethod::Identity => Decimal::from(1),
            TallyMethod::NetStake => stake_weight,
        };

        match vote {
            VoteChoice::Yes => prop.incr_accept(weight),
            VoteChoice::No => prop.incr_reject(weight),
            VoteChoice::NoWithVeto => {
                prop.incr_veto(weight);
                // Owners with veto rights double as the owners' veto bloc
                // under staker-with-owner-veto governance; that tally counts
                // heads, not stake.
                if prop.config.voter == VoterType::NetStakersAndVetoOwner && is_veto_owner {
                    prop.incr_owner_veto(Decimal::from(1));
                }
            }
        }
        prop.voters.insert(sender);
        debug!(
            "vote {:?} recorded on proposal {}/{}",
            vote, repo_name, proposal_id
        );

        ctx.debit_sender(ctx.tx.fee)?;
        ctx.keepers.update_repo(&repo_name, repo);
        Ok(())
    }
}
