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

//! Error kinds shared by the validator, the contracts and the proposal
//! engine.
//!
//! Every error except [`InvariantViolation`](enum.StateError.html) is
//! per-transaction: the executor reports it to consensus via a non-zero code
//! and the rest of the block continues. `InvariantViolation` marks a
//! condition that is impossible if the validator did its job; the block must
//! not commit.

/// Stable prefix used when a proposal apply fails inside a contract.
pub const ERR_APPLY_PROPOSAL: &str = "failed to apply proposal";
/// Stable prefix used when indexing a proposal under its end height fails.
pub const ERR_INDEX_PROPOSAL_END: &str = "failed to index proposal against end height";

/// An error raised while validating or executing a transaction.
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum StateError {
    /// A transaction field failed validation. `index` is the position of the
    /// transaction within the submitted batch.
    #[fail(display = "field:{}, msg:{}", field, msg)]
    BadField {
        /// Position of the offending transaction in its batch.
        index: usize,
        /// Name of the offending field.
        field: String,
        /// Human readable description of the failure.
        msg: String,
    },

    /// The transaction signature does not verify against the sender key.
    #[fail(display = "signature is not valid")]
    BadSignature,

    /// A referenced entity does not exist.
    #[fail(display = "{} not found", _0)]
    NotFound(String),

    /// The sender lacks the right to perform the operation.
    #[fail(display = "unauthorized: {}", _0)]
    Unauthorized(String),

    /// The sender cannot cover the transferred value plus fee.
    #[fail(display = "insufficient balance: {}", _0)]
    InsufficientBalance(String),

    /// A condition that the validator must have ruled out was observed while
    /// applying state. Fatal: the current block must be aborted.
    #[fail(display = "invariant violation: {}", _0)]
    InvariantViolation(String),
}

impl StateError {
    /// Shorthand for a field validation error.
    pub fn bad_field(index: usize, field: &str, msg: impl Into<String>) -> Self {
        StateError::BadField {
            index,
            field: field.to_owned(),
            msg: msg.into(),
        }
    }

    /// Returns `true` if the error must abort the whole block.
    pub fn is_fatal(&self) -> bool {
        match self {
            StateError::InvariantViolation(..) => true,
            _ => false,
        }
    }

    /// Wraps the error message with a stable, diagnosable prefix.
    pub fn wrap(self, prefix: &str) -> Self {
        match self {
            StateError::InvariantViolation(msg) => {
                StateError::InvariantViolation(format!("{}: {}", prefix, msg))
            }
            StateError::NotFound(msg) => StateError::NotFound(format!("{}: {}", prefix, msg)),
            StateError::Unauthorized(msg) => {
                StateError::Unauthorized(format!("{}: {}", prefix, msg))
            }
            StateError::InsufficientBalance(msg) => {
                StateError::InsufficientBalance(format!("{}: {}", prefix, msg))
            }
            StateError::BadField { index, field, msg } => StateError::BadField {
                index,
                field,
                msg: format!("{}: {}", prefix, msg),
            },
            StateError::BadSignature => StateError::BadSignature,
        }
    }
}
