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

//! The transaction executor: validation, dispatch and the end-of-block
//! proposal finalizer.
//!
//! The executor is the only caller of contract `exec`; contracts never call
//! each other directly except through the proposal engine. Per-transaction
//! failures are reported to consensus through a non-zero code; an
//! [`InvariantViolation`](../errors/enum.StateError.html) escapes as a hard
//! error so the driver aborts the block.

use crate::contracts::{ContractRegistry, ExecContext};
use crate::errors::StateError;
use crate::governance;
use crate::helpers::Height;
use crate::keepers::Keepers;
use crate::params::Params;
use crate::types::Transaction;
use crate::validation;

/// Result code reported to consensus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Code {
    /// Successful execution.
    Ok = 0,
    /// The transaction failed validation.
    FailedDecode = 1,
    /// The dispatched contract failed, or no contract accepted the type.
    ExecFailure = 2,
}

/// Outcome of one transaction, as surfaced to the block driver.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecResult {
    /// Result code; `Code::Ok` denotes success.
    pub code: Code,
    /// Diagnosable log line for failures.
    pub log: String,
}

impl ExecResult {
    fn ok() -> Self {
        ExecResult {
            code: Code::Ok,
            log: String::new(),
        }
    }

    /// Returns `true` on success.
    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }
}

/// The state-transition executor.
#[derive(Debug)]
pub struct Executor {
    params: Params,
    registry: ContractRegistry,
}

impl Executor {
    /// Creates an executor over the standard contract table.
    pub fn new(params: Params) -> Self {
        Executor {
            params,
            registry: ContractRegistry::standard(),
        }
    }

    /// The protocol parameters in use.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Validates and executes one transaction against the working state.
    /// `height` is the height of the last committed block; the transaction
    /// lands in the block that follows.
    ///
    /// A hard `Err` is returned only for invariant violations; the block
    /// must then be abandoned.
    pub fn exec_tx(
        &self,
        keepers: &mut dyn Keepers,
        tx: &Transaction,
        height: Height,
    ) -> Result<ExecResult, StateError> {
        if let Err(err) = validation::validate_tx(tx, 0, keepers, &self.params) {
            debug!("tx {} failed validation: {}", tx.tx_type().as_str(), err);
            return Ok(ExecResult {
                code: Code::FailedDecode,
                log: err.to_string(),
            });
        }

        let contract = match self.registry.dispatch(tx.tx_type()) {
            Some(contract) => contract,
            None => {
                warn!("no contract registered for {}", tx.tx_type().as_str());
                return Ok(ExecResult {
                    code: Code::ExecFailure,
                    log: "no executor found".to_owned(),
                });
            }
        };

        let mut ctx = ExecContext {
            keepers,
            params: &self.params,
            registry: &self.registry,
            tx,
            height,
        };
        match contract.exec(&mut ctx) {
            Ok(()) => Ok(ExecResult::ok()),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                debug!("tx {} failed: {}", tx.tx_type().as_str(), err);
                Ok(ExecResult {
                    code: Code::ExecFailure,
                    log: err.to_string(),
                })
            }
        }
    }

    /// End-of-block hook: finalizes the proposals whose voting period ends
    /// with the block that follows `height`.
    pub fn end_block(&self, keepers: &mut dyn Keepers, height: Height) -> Result<(), StateError> {
        governance::finalize_proposals_at(keepers, &self.params, &self.registry, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keepers::memory::MemStore;
    use crate::types::{Amount, TxPayload};
    use exonum_crypto::gen_keypair;
    use pretty_assertions::assert_eq;

    #[test]
    fn validation_failure_maps_to_failed_decode() {
        let executor = Executor::new(Params::default());
        let mut store = MemStore::new();

        let (pub_key, secret_key) = gen_keypair();
        let tx = Transaction::new_signed(
            TxPayload::TransferCoin {
                to: "r/infra".into(),
                value: Amount::from(1),
            },
            0, // zero nonce never validates
            Amount::from(1),
            1_500_000_000,
            pub_key,
            &secret_key,
        );

        let result = executor.exec_tx(&mut store, &tx, Height::zero()).unwrap();
        assert_eq!(result.code, Code::FailedDecode);
        assert!(result.log.contains("nonce"));
    }
}
