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

//! The two-phase transaction validator.
//!
//! The **sanity** pass is a pure function of the transaction (and protocol
//! parameters): field shapes, decimal ranges, fee floor, endorsement
//! structure, signature. The **consistency** pass reads the keepers at the
//! last committed height and checks the transaction against the world-state:
//! account nonce and balance, referenced entities, governance rules.
//!
//! Both passes fail with structured [`BadField`](../errors/enum.StateError.html)
//! errors and never panic on input.

pub mod consistency;
pub mod sanity;

use crate::errors::StateError;
use crate::keepers::Keepers;
use crate::params::Params;
use crate::types::Transaction;

/// Runs both validation passes; the gate in front of every contract
/// invocation.
pub fn validate_tx(
    tx: &Transaction,
    index: usize,
    keepers: &dyn Keepers,
    params: &Params,
) -> Result<(), StateError> {
    sanity::check(tx, index, params)?;
    consistency::check(tx, index, keepers, params)
}
