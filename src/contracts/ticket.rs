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

//! Validator and host ticket purchase and unbonding.
//!
//! The core locks the stake on the purchasing account and forwards the
//! ticket to the ticket manager; maturation and decay run there.

use super::{wrong_payload, ExecContext, SystemContract};
use crate::errors::StateError;
use crate::keepers::{AccountKeeper, TicketManager};
use crate::types::{StakeType, Ticket, TicketType, TxPayload, TxType};

/// Purchases a validator or host ticket.
#[derive(Debug)]
pub struct PurchaseTicket;

impl SystemContract for PurchaseTicket {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::TicketPurchase
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let (ticket_type, value, delegate) = match &ctx.tx.payload {
            TxPayload::TicketPurchase {
                ticket_type,
                value,
                delegate,
                ..
            } => (*ticket_type, *value, *delegate),
            _ => return Err(wrong_payload(TxType::TicketPurchase)),
        };

        let sender = ctx.sender();
        let ticket_hash = ctx.tx.hash();
        let stake_type = match ticket_type {
            TicketType::Validator => StakeType::Validator,
            TicketType::Host => StakeType::Host,
        };

        ctx.debit_sender(ctx.tx.fee)?;
        let mut account = ctx.sender_account();
        account.add_stake(stake_type, &hex::encode(ticket_hash.as_ref()), value);
        ctx.keepers.update_account(&sender, account);

        let (proposer, delegator) = match delegate {
            Some(delegate) => (delegate, Some(sender.clone())),
            None => (ctx.tx.sender_pub_key, None),
        };
        ctx.keepers.register_ticket(Ticket {
            hash: ticket_hash,
            ticket_type,
            proposer,
            owner: sender,
            delegator,
            height: ctx.height.next(),
            value,
            decay_by: crate::helpers::Height::zero(),
        });
        debug!("ticket {} purchased for {}", hex::encode(ticket_hash.as_ref()), value);
        Ok(())
    }
}

/// Marks a host ticket for decay, releasing its stake once the decay period
/// runs out.
#[derive(Debug)]
pub struct UnbondTicket;

impl SystemContract for UnbondTicket {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::TicketUnbond
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let ticket_hash = match &ctx.tx.payload {
            TxPayload::TicketUnbond { ticket_hash } => *ticket_hash,
            _ => return Err(wrong_payload(TxType::TicketUnbond)),
        };

        let ticket = ctx.keepers.get_by_hash(&ticket_hash).ok_or_else(|| {
            StateError::InvariantViolation(format!(
                "ticket {} vanished between validate and apply",
                hex::encode(ticket_hash.as_ref())
            ))
        })?;
        let stake_type = match ticket.ticket_type {
            TicketType::Validator => StakeType::Validator,
            TicketType::Host => StakeType::Host,
        };

        ctx.debit_sender(ctx.tx.fee)?;

        let decay_by = ctx.height.next();
        let owner = ticket.owner.clone();
        let mut account = ctx.keepers.get_account(&owner, None);
        account.unbond_stake(stake_type, &hex::encode(ticket_hash.as_ref()), decay_by);
        ctx.keepers.update_account(&owner, account);
        ctx.keepers.mark_for_decay(&ticket_hash, decay_by);
        debug!("ticket {} marked for decay", hex::encode(ticket_hash.as_ref()));
        Ok(())
    }
}
