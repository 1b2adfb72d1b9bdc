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

//! Protocol-wide parameters.
//!
//! These values must be identical on every node of a network at a given
//! height; they are loaded from the network genesis data by the node shell
//! and handed to the executor.

use rust_decimal::Decimal;

use crate::types::Amount;

/// Name of the protocol-designated repository that receives a share of
/// distributed proposal fees.
pub const HELM_REPO: &str = "helm";

/// Protocol-wide parameters recognized by the state-transition core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Fee charged per byte of transaction size.
    pub fee_per_byte: Decimal,
    /// Exact price of acquiring a namespace.
    pub cost_of_namespace: Decimal,
    /// Lowest commission rate a delegator may set.
    pub min_delegator_commission: Decimal,
    /// Minimum stake for a host ticket.
    pub min_host_stake: Decimal,
    /// Number of endorsements a push transaction must carry.
    pub push_endorse_quorum_size: usize,
    /// Maximum number of hosts returned by the ticket manager.
    pub num_top_hosts_limit: usize,
    /// Fraction (percent) of distributed proposal fees credited to the helm
    /// repository.
    pub helm_proposal_fee_split: Decimal,
    /// Fraction (percent) of distributed proposal fees credited to the
    /// proposal's target repository.
    pub target_repo_proposal_fee_split: Decimal,
    /// Exchange rate applied when converting between gas and coin balances.
    pub gas_to_coin_ex_rate: Decimal,
    /// Number of blocks a namespace stays owned before it can be re-acquired.
    pub namespace_ttl: u64,
}

impl Params {
    /// Proposal-fee cut credited to the helm repository.
    pub fn helm_fee_cut(&self, total: Amount) -> Amount {
        Amount::new(total.decimal() * self.helm_proposal_fee_split / Decimal::from(100))
    }

    /// Proposal-fee cut credited to the target repository.
    pub fn target_repo_fee_cut(&self, total: Amount) -> Amount {
        Amount::new(total.decimal() * self.target_repo_proposal_fee_split / Decimal::from(100))
    }
}

impl Default for Params {
    fn default() -> Self {
        Params {
            fee_per_byte: Decimal::new(1, 5), // 0.00001
            cost_of_namespace: Decimal::from(5),
            min_delegator_commission: Decimal::from(10),
            min_host_stake: Decimal::from(10),
            push_endorse_quorum_size: 3,
            num_top_hosts_limit: 21,
            helm_proposal_fee_split: Decimal::from(10),
            target_repo_proposal_fee_split: Decimal::from(90),
            gas_to_coin_ex_rate: Decimal::from(1),
            namespace_ttl: 1_036_800,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_split_is_exact() {
        let params = Params::default();
        let total = Amount::from(7);
        let helm = params.helm_fee_cut(total);
        let repo = params.target_repo_fee_cut(total);
        assert_eq!(helm + repo, total);
    }
}
