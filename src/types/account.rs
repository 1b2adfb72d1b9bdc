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

//! Network accounts.

use rust_decimal::Decimal;

use std::collections::BTreeMap;

use super::Amount;
use crate::helpers::Height;

/// The kind of stake held by an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeType {
    /// Stake backing a validator ticket.
    Validator,
    /// Stake backing a host ticket.
    Host,
}

/// A single stake entry. The entry stays on the account until its unbond
/// height passes and the account is cleaned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeEntry {
    /// Staked value.
    pub value: Amount,
    /// Height at which the stake stops counting against the spendable
    /// balance. Zero means the stake is not unbonding.
    pub unbond_height: Height,
}

/// A network account.
///
/// Accounts are created lazily on first credit and removed again once every
/// field is back at its default.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Spendable coin balance, including staked coins.
    pub balance: Amount,
    /// Gas balance, only usable through the gas contracts.
    pub gas_balance: Amount,
    /// Number of transactions committed by this account.
    pub nonce: u64,
    /// Active and unbonding stakes, keyed `"<type>:<ticket-hash>"`.
    pub stakes: BTreeMap<String, StakeEntry>,
    /// Commission rate (percent) taken by this account when it proposes
    /// tickets on behalf of delegators.
    pub delegator_commission: Decimal,
}

impl Account {
    /// Returns `true` if the account holds no state worth persisting.
    pub fn is_nil(&self) -> bool {
        self.balance.is_zero()
            && self.gas_balance.is_zero()
            && self.nonce == 0
            && self.stakes.is_empty()
            && self.delegator_commission.is_zero()
    }

    /// Sum of stakes still locked at `height`.
    pub fn total_staked(&self, height: Height) -> Amount {
        self.stakes
            .values()
            .filter(|s| s.unbond_height == Height::zero() || s.unbond_height > height)
            .map(|s| s.value)
            .sum()
    }

    /// Balance available for spending at `height`: the coin balance minus
    /// locked stakes.
    pub fn available_balance(&self, height: Height) -> Amount {
        self.balance
            .checked_sub(self.total_staked(height))
            .unwrap_or_else(Amount::zero)
    }

    /// Adds a stake entry for a ticket.
    pub fn add_stake(&mut self, ty: StakeType, ticket_hash: &str, value: Amount) {
        let key = Self::stake_key(ty, ticket_hash);
        self.stakes.insert(
            key,
            StakeEntry {
                value,
                unbond_height: Height::zero(),
            },
        );
    }

    /// Marks the stake of `ticket_hash` for release at `unbond_height`.
    pub fn unbond_stake(&mut self, ty: StakeType, ticket_hash: &str, unbond_height: Height) {
        let key = Self::stake_key(ty, ticket_hash);
        if let Some(entry) = self.stakes.get_mut(&key) {
            entry.unbond_height = unbond_height;
        }
    }

    /// Drops stake entries whose unbond height has passed. Their value stays
    /// on the balance and becomes spendable.
    pub fn clean(&mut self, height: Height) {
        self.stakes
            .retain(|_, s| s.unbond_height == Height::zero() || s.unbond_height > height);
    }

    fn stake_key(ty: StakeType, ticket_hash: &str) -> String {
        let tag = match ty {
            StakeType::Validator => "v",
            StakeType::Host => "s",
        };
        format!("{}:{}", tag, ticket_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn staked_coins_are_not_spendable() {
        let mut acct = Account::default();
        acct.balance = Amount::from(100);
        acct.add_stake(StakeType::Host, "aa11", Amount::from(30));
        assert_eq!(acct.available_balance(Height(5)), Amount::from(70));

        acct.unbond_stake(StakeType::Host, "aa11", Height(10));
        assert_eq!(acct.available_balance(Height(5)), Amount::from(70));
        assert_eq!(acct.available_balance(Height(11)), Amount::from(100));
    }

    #[test]
    fn clean_drops_released_stakes_only() {
        let mut acct = Account::default();
        acct.balance = Amount::from(10);
        acct.add_stake(StakeType::Validator, "aa", Amount::from(5));
        acct.add_stake(StakeType::Host, "bb", Amount::from(5));
        acct.unbond_stake(StakeType::Host, "bb", Height(3));

        acct.clean(Height(4));
        assert_eq!(acct.stakes.len(), 1);
        assert!(acct.stakes.contains_key("v:aa"));
    }

    #[test]
    fn nil_account() {
        let mut acct = Account::default();
        assert!(acct.is_nil());
        acct.nonce = 1;
        assert!(!acct.is_nil());
    }
}
