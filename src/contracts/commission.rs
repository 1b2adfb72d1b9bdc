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

//! Delegator commission updates.

use super::{wrong_payload, ExecContext, SystemContract};
use crate::errors::StateError;
use crate::keepers::AccountKeeper;
use crate::types::{TxPayload, TxType};

/// Sets the commission rate the sender takes from delegated stakes.
#[derive(Debug)]
pub struct SetDelegatorCommission;

impl SystemContract for SetDelegatorCommission {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::SetDelegatorCommission
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let commission = match &ctx.tx.payload {
            TxPayload::SetDelegatorCommission { commission } => *commission,
            _ => return Err(wrong_payload(TxType::SetDelegatorCommission)),
        };

        ctx.debit_sender(ctx.tx.fee)?;
        let sender = ctx.sender();
        let mut account = ctx.sender_account();
        account.delegator_commission = commission;
        ctx.keepers.update_account(&sender, account);
        Ok(())
    }
}
