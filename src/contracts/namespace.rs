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

//! Namespace acquisition and domain maintenance.

use std::collections::BTreeMap;

use super::{wrong_payload, ExecContext, SystemContract};
use crate::errors::StateError;
use crate::keepers::{NamespaceKeeper, RepoKeeper};
use crate::params::HELM_REPO;
use crate::types::{Namespace, TxPayload, TxType};

/// Acquires a namespace for the sender or a repository.
///
/// The acquisition price is credited to the helm repository.
#[derive(Debug)]
pub struct RegisterNamespace;

impl SystemContract for RegisterNamespace {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::RegisterNamespace
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let (name, value, to_repo, domains) = match &ctx.tx.payload {
            TxPayload::RegisterNamespace {
                name,
                value,
                to_repo,
                domains,
            } => (name.clone(), *value, to_repo.clone(), domains.clone()),
            _ => return Err(wrong_payload(TxType::RegisterNamespace)),
        };

        ctx.debit_sender(value + ctx.tx.fee)?;

        let (owner, owner_repo) = match to_repo {
            Some(repo) => (None, Some(repo)),
            None => (Some(ctx.sender()), None),
        };
        ctx.keepers.update_namespace(
            &name,
            Namespace {
                owner,
                owner_repo,
                grace_end_at: crate::helpers::Height(ctx.height.0 + 1 + ctx.params.namespace_ttl),
                contributors: BTreeMap::new(),
                domains,
            },
        );

        let mut helm = ctx.keepers.get_repo(HELM_REPO, None);
        helm.balance += value;
        ctx.keepers.update_repo(HELM_REPO, helm);
        debug!("namespace {} acquired for {}", name, value);
        Ok(())
    }
}

/// Adds, replaces or removes domains of an owned namespace.
#[derive(Debug)]
pub struct UpdateNamespaceDomains;

impl SystemContract for UpdateNamespaceDomains {
    fn can_exec(&self, tx_type: TxType) -> bool {
        tx_type == TxType::UpdateNamespaceDomains
    }

    fn exec(&self, ctx: &mut ExecContext<'_>) -> Result<(), StateError> {
        let (name, domains) = match &ctx.tx.payload {
            TxPayload::UpdateNamespaceDomains { name, domains } => {
                (name.clone(), domains.clone())
            }
            _ => return Err(wrong_payload(TxType::UpdateNamespaceDomains)),
        };

        ctx.debit_sender(ctx.tx.fee)?;

        let mut ns = ctx.keepers.get_namespace(&name, None);
        if ns.is_nil() {
            return Err(StateError::InvariantViolation(format!(
                "namespace {} vanished between validate and apply",
                name
            )));
        }
        for (domain, target) in domains {
            if target.is_empty() {
                ns.domains.remove(&domain);
            } else {
                ns.domains.insert(domain, target);
            }
        }
        ctx.keepers.update_namespace(&name, ns);
        Ok(())
    }
}
