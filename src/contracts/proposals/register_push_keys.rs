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

//! Proposal: admit push keys as contributors.

use super::execute_proposal_creation;
use crate::contracts::{
    wrong_payload, ApplyContext, ExecContext, ProposalApplier, SystemContract,
};
use crate::errors::StateError;
use crate::keepers::NamespaceKeeper;
use crate::types::action_keys;
use crate::types::{ActionData, Amount, FeeMode, Policy, PushKeyId, RepoContributor, TxPayload, TxType};

/// Proposes admitting push keys to a repository and/or a namespace, with a
/// fee mode and push policies.
#[derive(Debug)]
pub struct RegisterRepoPushKeys;

impl SystemContract for RegisterRepoPushKeys {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::ProposalRegisterPushKeys
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let payload = match &ctx.tx.payload {
            TxPayload::ProposalRegisterPushKeys {
                repo,
                proposal_id,
                value,
                key_ids,
                policies,
                fee_mode,
                fee_cap,
                namespace,
                namespace_only,
            } => (
                repo.clone(),
                proposal_id.clone(),
                *value,
                key_ids.clone(),
                policies.clone(),
                *fee_mode,
                *fee_cap,
                namespace.clone(),
                namespace_only.clone(),
            ),
            _ => return Err(wrong_payload(TxType::ProposalRegisterPushKeys)),
        };
        let (repo, proposal_id, value, key_ids, policies, fee_mode, fee_cap, ns, ns_only) =
            payload;

        let mut data = ActionData::default();
        data.set(action_keys::IDS, &key_ids);
        data.set(action_keys::POLICIES, &policies);
        data.set(action_keys::FEE_MODE, &fee_mode);
        data.set(action_keys::FEE_CAP, &fee_cap);
        if let Some(ns) = &ns {
            data.set(action_keys::NAMESPACE, ns);
        }
        if let Some(ns_only) = &ns_only {
            data.set(action_keys::NAMESPACE_ONLY, ns_only);
        }
        execute_proposal_creation(
            ctx,
            &repo,
            &proposal_id,
            value,
            TxType::ProposalRegisterPushKeys,
            data,
        )
    }

    fn applier(&self) -> Option<&dyn ProposalApplier> {
        Some(self)
    }
}

impl ProposalApplier for RegisterRepoPushKeys {
    fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<(), StateError> {
        let data = &ctx.proposal.action_data;
        let key_ids: Vec<PushKeyId> = data.require(action_keys::IDS)?;
        let policies: Vec<Policy> = data.get(action_keys::POLICIES)?.unwrap_or_default();
        let fee_mode: FeeMode = data.require(action_keys::FEE_MODE)?;
        let fee_cap: Amount = data.get(action_keys::FEE_CAP)?.unwrap_or_else(Amount::zero);
        let namespace: Option<String> = data.get(action_keys::NAMESPACE)?;
        let namespace_only: Option<String> = data.get(action_keys::NAMESPACE_ONLY)?;

        let contributor = RepoContributor {
            fee_mode,
            fee_cap,
            fee_used: Amount::zero(),
            policies,
        };

        let ns_name = namespace_only.clone().or(namespace);
        if let Some(ns_name) = ns_name {
            let mut ns = ctx.keepers.get_namespace(&ns_name, None);
            if ns.is_nil() {
                // The validator guarantees the namespace exists; a missing
                // one here means the state diverged.
                return Err(StateError::InvariantViolation(format!(
                    "namespace {} does not exist",
                    ns_name
                )));
            }
            for id in &key_ids {
                ns.contributors.insert(id.clone(), contributor.clone());
            }
            ctx.keepers.update_namespace(&ns_name, ns);
        }

        if namespace_only.is_none() {
            for id in &key_ids {
                ctx.repo.contributors.insert(id.clone(), contributor.clone());
            }
        }
        Ok(())
    }
}
