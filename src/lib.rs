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

//! State-transition core of the Repochain network.
//!
//! This crate is the layer that takes validated transactions from consensus
//! and deterministically mutates the versioned world-state. It consists of:
//!
//! - a dispatched table of [system contracts](contracts/index.html), one per
//!   transaction type;
//! - a [repository governance engine](governance/index.html) that drives
//!   on-chain proposals through deposit, voting, tallying and fee settlement;
//! - a two-phase [transaction validator](validation/index.html) that gates
//!   every contract invocation;
//! - the [executor](execution/index.html) gluing the three together for the
//!   block driver.
//!
//! Storage engines, consensus, networking and the git object layer are
//! external collaborators reached through the [keeper facade](keepers/index.html).

#![deny(missing_debug_implementations)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate failure;

pub mod contracts;
pub mod errors;
pub mod execution;
pub mod governance;
pub mod helpers;
pub mod keepers;
pub mod params;
pub mod types;
pub mod validation;

pub use crate::errors::StateError;
pub use crate::execution::{Code, ExecResult, Executor};
pub use crate::helpers::Height;
pub use crate::params::Params;
