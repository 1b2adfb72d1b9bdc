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

//! Conversions between coin and gas balances.
//!
//! All conversions run at the protocol-wide `gas_to_coin_ex_rate` (coins per
//! unit of gas).

use super::{wrong_payload, ExecContext, SystemContract};
use crate::errors::StateError;
use crate::keepers::AccountKeeper;
use crate::types::{Amount, TxPayload, TxType};

fn gas_debit(
    ctx: &mut ExecContext<'_>,
    value: Amount,
    credit_coin: Amount,
) -> Result<(), StateError> {
    ctx.debit_sender(ctx.tx.fee)?;
    let sender = ctx.sender();
    let mut account = ctx.sender_account();
    account.gas_balance = account.gas_balance.checked_sub(value).ok_or_else(|| {
        StateError::InsufficientBalance(format!(
            "gas balance {} cannot cover {}",
            account.gas_balance, value
        ))
    })?;
    account.balance += credit_coin;
    ctx.keepers.update_account(&sender, account);
    Ok(())
}

/// Converts coins into gas.
#[derive(Debug)]
pub struct GasMint;

impl SystemContract for GasMint {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::GasMint
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let value = match &ctx.tx.payload {
            TxPayload::GasMint { value } => *value,
            _ => return Err(wrong_payload(TxType::GasMint)),
        };

        ctx.debit_sender(value + ctx.tx.fee)?;
        let gas = Amount::new(value.decimal() / ctx.params.gas_to_coin_ex_rate);
        let sender = ctx.sender();
        let mut account = ctx.sender_account();
        account.gas_balance += gas;
        ctx.keepers.update_account(&sender, account);
        debug!("minted {} gas for {} coins", gas, value);
        Ok(())
    }
}

/// Converts gas back into coins.
#[derive(Debug)]
pub struct GasToCoin;

impl SystemContract for GasToCoin {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::GasToCoin
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let value = match &ctx.tx.payload {
            TxPayload::GasToCoin { value } => *value,
            _ => return Err(wrong_payload(TxType::GasToCoin)),
        };

        let coins = Amount::new(value.decimal() * ctx.params.gas_to_coin_ex_rate);
        gas_debit(ctx, value, coins)?;
        debug!("converted {} gas into {} coins", value, coins);
        Ok(())
    }
}

/// Burns gas in exchange for value on another chain. The burned value
/// leaves the ledger; the cross-chain side is settled off-core.
#[derive(Debug)]
pub struct BurnForSwap;

impl SystemContract for BurnForSwap {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::BurnForSwap
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let (value, swap_to) = match &ctx.tx.payload {
            TxPayload::BurnForSwap { value, swap_to } => (*value, swap_to.clone()),
            _ => return Err(wrong_payload(TxType::BurnForSwap)),
        };

        gas_debit(ctx, value, Amount::zero())?;
        info!("burned {} gas for swap to {}", value, swap_to);
        Ok(())
    }
}
