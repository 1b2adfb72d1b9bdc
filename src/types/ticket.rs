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

//! Ticket records as exposed by the ticket manager.
//!
//! The ticket manager's lifecycle (maturation, decay, expiry) is an external
//! collaborator; the core only reads these records and forwards purchase and
//! unbond requests.

use exonum_crypto::{Hash, PublicKey};

use super::{Address, Amount};
use crate::helpers::Height;

/// The kind of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketType {
    /// Grants the right to join the validator set.
    Validator,
    /// Grants the right to host repository objects.
    Host,
}

/// A validator or host ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Hash of the purchasing transaction.
    pub hash: Hash,
    /// Kind of the ticket.
    pub ticket_type: TicketType,
    /// Key of the node the ticket empowers.
    pub proposer: PublicKey,
    /// Address of the purchasing account.
    pub owner: Address,
    /// When set, the account that delegated the ticket to `proposer`.
    pub delegator: Option<Address>,
    /// Purchase height.
    pub height: Height,
    /// Staked value.
    pub value: Amount,
    /// Height at which the ticket finishes decaying; zero while active.
    pub decay_by: Height,
}

impl Ticket {
    /// Returns `true` once the ticket has been marked for decay.
    pub fn is_decaying(&self) -> bool {
        self.decay_by != Height::zero()
    }

    /// Returns `true` if the ticket was bought on behalf of someone else.
    pub fn is_delegated(&self) -> bool {
        self.delegator.is_some()
    }
}
