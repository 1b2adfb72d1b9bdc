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

//! State and wire types of the Repochain core.

pub use self::account::{Account, StakeEntry, StakeType};
pub use self::address::{
    is_valid_namespace_name, is_valid_repo_name, Address, PushKeyId, Recipient,
};
pub use self::namespace::Namespace;
pub use self::proposal::{
    action_keys, ActionData, FeeRefundType, ProposalOutcome, RepoProposal, TallyMethod, VoterType,
};
pub use self::push_key::PushKey;
pub use self::repo::{
    GovernanceConfig, GovernanceConfigUpdate, Policy, RepoConfig, RepoConfigUpdate,
    RepoContributor, FeeMode, RepoOwner, Repository,
};
pub use self::ticket::{Ticket, TicketType};
pub use self::tx::{
    PushEndorsement, PushNote, PushedReference, Transaction, TxPayload, TxType, VoteChoice,
};

use rust_decimal::Decimal;

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use crate::helpers::Height;

mod account;
mod address;
mod namespace;
mod proposal;
mod push_key;
mod repo;
mod ticket;
mod tx;

/// A monetary quantity: a non-negative, exact decimal.
///
/// Arithmetic is saturating-free; callers check balances before subtracting.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount.
    pub fn zero() -> Self {
        Amount(Decimal::from(0))
    }

    /// Wraps a raw decimal.
    pub fn new(value: Decimal) -> Self {
        Amount(value)
    }

    /// Returns the underlying decimal.
    pub fn decimal(self) -> Decimal {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Subtraction that refuses to go below zero.
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        if self.0 < rhs.0 {
            None
        } else {
            Some(Amount(self.0 - rhs.0))
        }
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount(Decimal::from(value))
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Amount) {
        self.0 -= rhs.0;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::zero(), Add::add)
    }
}

/// Information about the last committed block, written by the block driver.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Height of the last committed block.
    pub height: Height,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn amount_parses_decimal_strings() {
        let amount: Amount = "1.5".parse().unwrap();
        assert_eq!(amount + Amount::from(1), "2.5".parse().unwrap());
        assert!("abc".parse::<Amount>().is_err());
    }

    #[test]
    fn amount_checked_sub() {
        let ten = Amount::from(10);
        assert_eq!(ten.checked_sub(Amount::from(4)), Some(Amount::from(6)));
        assert_eq!(Amount::from(4).checked_sub(ten), None);
    }
}
