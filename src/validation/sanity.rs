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

//! The sanity pass: state-independent transaction checks.

use rust_decimal::Decimal;

use std::collections::BTreeSet;

use crate::errors::StateError;
use crate::params::Params;
use crate::types::{
    is_valid_namespace_name, is_valid_repo_name, Amount, PushEndorsement, PushKeyId, PushNote,
    Recipient, TicketType, Transaction, TxPayload,
};

/// Required length of a host BLS public key.
const BLS_PUBLIC_KEY_LENGTH: usize = 128;

/// Maximum byte length of a proposal identifier.
const MAX_PROPOSAL_ID_LENGTH: usize = 8;

/// Runs every state-independent check against `tx`.
pub fn check(tx: &Transaction, index: usize, params: &Params) -> Result<(), StateError> {
    check_common(tx, index, params)?;

    match &tx.payload {
        TxPayload::TransferCoin { to, .. } => {
            Recipient::parse(to).map_err(|msg| StateError::bad_field(index, "to", msg))?;
        }
        TxPayload::TicketPurchase {
            ticket_type,
            bls_pub_key,
            vrf_pub_key,
            ..
        } => match ticket_type {
            TicketType::Host => {
                if bls_pub_key.len() != BLS_PUBLIC_KEY_LENGTH {
                    return Err(StateError::bad_field(
                        index,
                        "bls_pub_key",
                        format!("BLS public key length must be {}", BLS_PUBLIC_KEY_LENGTH),
                    ));
                }
            }
            TicketType::Validator => {
                if vrf_pub_key.is_empty() {
                    return Err(StateError::bad_field(
                        index,
                        "vrf_pub_key",
                        "VRF public key is required",
                    ));
                }
            }
        },
        TxPayload::TicketUnbond { ticket_hash } => {
            if *ticket_hash == exonum_crypto::Hash::zero() {
                return Err(StateError::bad_field(
                    index,
                    "ticket_hash",
                    "ticket hash is required",
                ));
            }
        }
        TxPayload::SetDelegatorCommission { commission } => {
            if *commission < params.min_delegator_commission {
                return Err(StateError::bad_field(
                    index,
                    "commission",
                    format!(
                        "commission rate cannot be below the minimum ({}%)",
                        params.min_delegator_commission
                    ),
                ));
            }
            if *commission > Decimal::from(100) {
                return Err(StateError::bad_field(
                    index,
                    "commission",
                    "commission rate cannot exceed 100%",
                ));
            }
        }
        TxPayload::RegisterPushKey {
            scopes, fee_cap, ..
        } => {
            check_scopes(index, scopes)?;
            check_non_negative(index, "fee_cap", fee_cap.decimal())?;
        }
        TxPayload::UpdateDelPushKey {
            id,
            add_scopes,
            fee_cap,
            ..
        } => {
            check_push_key_id(index, "id", id)?;
            check_scopes(index, add_scopes)?;
            if let Some(cap) = fee_cap {
                check_non_negative(index, "fee_cap", cap.decimal())?;
            }
        }
        TxPayload::RegisterNamespace {
            name,
            value,
            to_repo,
            domains,
        } => {
            if !is_valid_namespace_name(name) {
                return Err(StateError::bad_field(
                    index,
                    "name",
                    "name is invalid; only alphanumerics, '-' and '_' over 3-128 characters",
                ));
            }
            if value.decimal() != params.cost_of_namespace {
                return Err(StateError::bad_field(
                    index,
                    "value",
                    format!(
                        "invalid value; has {}, want {}",
                        value, params.cost_of_namespace
                    ),
                ));
            }
            if let Some(repo) = to_repo {
                if !is_valid_repo_name(repo) {
                    return Err(StateError::bad_field(index, "to_repo", "invalid repo name"));
                }
            }
            check_domain_targets(index, domains, false)?;
        }
        TxPayload::UpdateNamespaceDomains { name, domains } => {
            if !is_valid_namespace_name(name) {
                return Err(StateError::bad_field(index, "name", "name is invalid"));
            }
            if domains.is_empty() {
                return Err(StateError::bad_field(
                    index,
                    "domains",
                    "at least one domain is required",
                ));
            }
            check_domain_targets(index, domains, true)?;
        }
        TxPayload::CreateRepo { name, config, .. } => {
            if !is_valid_repo_name(name) {
                return Err(StateError::bad_field(
                    index,
                    "name",
                    "name is invalid; only alphanumerics, '-' and '_' up to 128 characters",
                ));
            }
            check_config_percentages(index, config)?;
        }
        TxPayload::GitPush { note, endorsements } => {
            check_push(index, params, note, endorsements)?;
        }
        TxPayload::GasMint { value } | TxPayload::GasToCoin { value } => {
            check_positive(index, "value", *value)?;
        }
        TxPayload::BurnForSwap { value, swap_to } => {
            check_positive(index, "value", *value)?;
            if swap_to.is_empty() {
                return Err(StateError::bad_field(
                    index,
                    "swap_to",
                    "destination address is required",
                ));
            }
        }
        TxPayload::ProposalUpsertOwner {
            repo,
            proposal_id,
            addresses,
            ..
        } => {
            check_proposal_target(index, repo, proposal_id)?;
            if addresses.is_empty() {
                return Err(StateError::bad_field(
                    index,
                    "addresses",
                    "at least one address is required",
                ));
            }
            for addr in addresses {
                if addr.as_str().parse::<crate::types::Address>().is_err() {
                    return Err(StateError::bad_field(
                        index,
                        "addresses",
                        format!("invalid address: {}", addr),
                    ));
                }
            }
        }
        TxPayload::ProposalUpdateRepo {
            repo,
            proposal_id,
            config,
            ..
        } => {
            check_proposal_target(index, repo, proposal_id)?;
            check_config_percentages(index, config)?;
        }
        TxPayload::ProposalRegisterPushKeys {
            repo,
            proposal_id,
            key_ids,
            policies,
            fee_mode,
            fee_cap,
            namespace,
            namespace_only,
            ..
        } => {
            check_proposal_target(index, repo, proposal_id)?;
            if key_ids.is_empty() {
                return Err(StateError::bad_field(
                    index,
                    "ids",
                    "at least one push key id is required",
                ));
            }
            for id in key_ids {
                check_push_key_id(index, "ids", id)?;
            }
            for policy in policies {
                if policy.object.is_empty() || policy.action.is_empty() {
                    return Err(StateError::bad_field(
                        index,
                        "policies",
                        "policy object and action are required",
                    ));
                }
            }
            if !fee_cap.is_zero() && *fee_mode != crate::types::FeeMode::RepoPaysCapped {
                return Err(StateError::bad_field(
                    index,
                    "feeCap",
                    "value not expected for the chosen fee mode",
                ));
            }
            if namespace.is_some() && namespace_only.is_some() {
                return Err(StateError::bad_field(
                    index,
                    "namespace",
                    "cannot set both namespace and namespaceOnly",
                ));
            }
            for ns in namespace.iter().chain(namespace_only.iter()) {
                if !is_valid_namespace_name(ns) {
                    return Err(StateError::bad_field(index, "namespace", "name is invalid"));
                }
            }
        }
        TxPayload::ProposalVote {
            repo, proposal_id, ..
        } => {
            check_proposal_target(index, repo, proposal_id)?;
        }
        TxPayload::ProposalDepositFee {
            repo,
            proposal_id,
            value,
        } => {
            check_proposal_target(index, repo, proposal_id)?;
            check_positive(index, "value", *value)?;
        }
    }

    // The signature check runs last so field errors surface with their own
    // messages first.
    if !tx.verify_signature() {
        return Err(StateError::BadSignature);
    }
    Ok(())
}

fn check_common(tx: &Transaction, index: usize, params: &Params) -> Result<(), StateError> {
    if tx.nonce == 0 {
        return Err(StateError::bad_field(
            index,
            "nonce",
            "nonce must be greater than zero",
        ));
    }
    check_non_negative(index, "value", tx.value().decimal())?;
    check_non_negative(index, "fee", tx.fee.decimal())?;

    let base_fee = Decimal::from(tx.size_for_fee()) * params.fee_per_byte;
    if tx.fee.decimal() < base_fee {
        return Err(StateError::bad_field(
            index,
            "fee",
            format!("fee cannot be lower than the base price of {}", base_fee),
        ));
    }

    if tx.timestamp <= 0 {
        return Err(StateError::bad_field(
            index,
            "timestamp",
            "timestamp is required",
        ));
    }
    if tx.timestamp > chrono::Utc::now().timestamp() {
        return Err(StateError::bad_field(
            index,
            "timestamp",
            "timestamp cannot be a future time",
        ));
    }
    Ok(())
}

fn check_push(
    index: usize,
    params: &Params,
    note: &PushNote,
    endorsements: &[PushEndorsement],
) -> Result<(), StateError> {
    if !is_valid_repo_name(&note.repo) {
        return Err(StateError::bad_field(index, "note", "repo name is invalid"));
    }
    check_push_key_id(index, "note", &note.pusher_key_id)?;
    if note.references.is_empty() {
        return Err(StateError::bad_field(
            index,
            "note",
            "at least one reference is required",
        ));
    }

    if endorsements.len() < params.push_endorse_quorum_size {
        return Err(StateError::bad_field(
            index,
            "endorsements",
            format!(
                "not enough endorsements included; want {}, got {}",
                params.push_endorse_quorum_size,
                endorsements.len()
            ),
        ));
    }

    let note_id = note.id();
    let mut endorsers = BTreeSet::new();
    for endorsement in endorsements {
        if endorsement.note_id != note_id {
            return Err(StateError::bad_field(
                index,
                "endorsements",
                "endorsement does not reference the push note",
            ));
        }
        if endorsement.reference_hashes != endorsements[0].reference_hashes {
            return Err(StateError::bad_field(
                index,
                "endorsements",
                "endorsed reference hashes are not the same across endorsements",
            ));
        }
        if !endorsers.insert(endorsement.endorser_pub_key) {
            return Err(StateError::bad_field(
                index,
                "endorsements",
                "multiple endorsements by one sender",
            ));
        }
    }
    Ok(())
}

fn check_proposal_target(index: usize, repo: &str, proposal_id: &str) -> Result<(), StateError> {
    if !is_valid_repo_name(repo) {
        return Err(StateError::bad_field(index, "repo", "repo name is invalid"));
    }
    if proposal_id.is_empty() || !proposal_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StateError::bad_field(
            index,
            "id",
            "proposal id is not valid; must be numeric",
        ));
    }
    if proposal_id.len() > MAX_PROPOSAL_ID_LENGTH {
        return Err(StateError::bad_field(
            index,
            "id",
            format!("proposal id limit of {} bytes exceeded", MAX_PROPOSAL_ID_LENGTH),
        ));
    }
    Ok(())
}

fn check_push_key_id(index: usize, field: &str, id: &PushKeyId) -> Result<(), StateError> {
    id.as_str()
        .parse::<PushKeyId>()
        .map(|_| ())
        .map_err(|msg| StateError::bad_field(index, field, msg))
}

fn check_scopes(index: usize, scopes: &[String]) -> Result<(), StateError> {
    for scope in scopes {
        let valid = is_valid_repo_name(scope)
            || match Recipient::parse(scope) {
                Ok(Recipient::Namespace { .. }) => true,
                _ => false,
            };
        if !valid {
            return Err(StateError::bad_field(
                index,
                "scopes",
                format!("scope is not a repo name or namespace URI: {}", scope),
            ));
        }
    }
    Ok(())
}

fn check_domain_targets(
    index: usize,
    domains: &std::collections::BTreeMap<String, String>,
    allow_empty: bool,
) -> Result<(), StateError> {
    for (domain, target) in domains {
        if !is_valid_repo_name(domain) {
            return Err(StateError::bad_field(
                index,
                "domains",
                format!("domain name is invalid: {}", domain),
            ));
        }
        if target.is_empty() && allow_empty {
            continue;
        }
        Recipient::parse(target).map_err(|_| {
            StateError::bad_field(
                index,
                "domains",
                format!("domain target is invalid: {}", target),
            )
        })?;
    }
    Ok(())
}

fn check_config_percentages(
    index: usize,
    config: &crate::types::RepoConfigUpdate,
) -> Result<(), StateError> {
    let gov = &config.governance;
    let percentages = [
        gov.prop_quorum,
        gov.prop_threshold,
        gov.prop_veto_quorum,
        gov.prop_veto_owners_quorum,
    ];
    for pct in percentages.iter().flatten() {
        if *pct < Decimal::from(0) || *pct > Decimal::from(100) {
            return Err(StateError::bad_field(
                index,
                "config",
                "governance percentages must be between 0 and 100",
            ));
        }
    }
    if let Some(fee) = gov.prop_fee {
        check_non_negative(index, "config", fee.decimal())?;
    }
    Ok(())
}

fn check_non_negative(index: usize, field: &str, value: Decimal) -> Result<(), StateError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(StateError::bad_field(
            index,
            field,
            "negative figure not allowed",
        ));
    }
    Ok(())
}

fn check_positive(index: usize, field: &str, value: Amount) -> Result<(), StateError> {
    if value.is_negative() || value.is_zero() {
        return Err(StateError::bad_field(
            index,
            field,
            "a positive figure is required",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use exonum_crypto::gen_keypair;

    fn signed(payload: TxPayload) -> Transaction {
        let (pub_key, secret_key) = gen_keypair();
        Transaction::new_signed(
            payload,
            1,
            Amount::from(2),
            1_500_000_000,
            pub_key,
            &secret_key,
        )
    }

    #[test]
    fn rejects_zero_nonce() {
        let mut tx = signed(TxPayload::TransferCoin {
            to: "r/infra".into(),
            value: Amount::from(1),
        });
        tx.nonce = 0;
        let err = check(&tx, 0, &Params::default()).unwrap_err();
        assert_matches!(err, StateError::BadField { ref field, .. } if field == "nonce");
    }

    #[test]
    fn rejects_future_timestamp() {
        let mut tx = signed(TxPayload::TransferCoin {
            to: "r/infra".into(),
            value: Amount::from(1),
        });
        tx.timestamp = chrono::Utc::now().timestamp() + 3600;
        let err = check(&tx, 0, &Params::default()).unwrap_err();
        assert_matches!(err, StateError::BadField { ref field, .. } if field == "timestamp");
    }

    #[test]
    fn rejects_fee_below_base_price() {
        let mut tx = signed(TxPayload::TransferCoin {
            to: "r/infra".into(),
            value: Amount::from(1),
        });
        tx.fee = Amount::zero();
        let err = check(&tx, 0, &Params::default()).unwrap_err();
        assert_matches!(err, StateError::BadField { ref field, .. } if field == "fee");
    }

    #[test]
    fn rejects_tampered_signature() {
        let mut tx = signed(TxPayload::TransferCoin {
            to: "r/infra".into(),
            value: Amount::from(1),
        });
        tx.fee = Amount::from(3);
        assert_matches!(
            check(&tx, 0, &Params::default()),
            Err(StateError::BadSignature)
        );
    }

    #[test]
    fn rejects_bad_recipient() {
        let tx = signed(TxPayload::TransferCoin {
            to: "no such recipient".into(),
            value: Amount::from(1),
        });
        let err = check(&tx, 0, &Params::default()).unwrap_err();
        assert_matches!(err, StateError::BadField { ref field, .. } if field == "to");
    }

    #[test]
    fn host_ticket_requires_full_bls_key() {
        let tx = signed(TxPayload::TicketPurchase {
            ticket_type: TicketType::Host,
            value: Amount::from(10),
            delegate: None,
            bls_pub_key: vec![0; 64],
            vrf_pub_key: vec![],
        });
        let err = check(&tx, 0, &Params::default()).unwrap_err();
        assert_matches!(err, StateError::BadField { ref field, .. } if field == "bls_pub_key");
    }

    #[test]
    fn validator_ticket_requires_vrf_key() {
        let tx = signed(TxPayload::TicketPurchase {
            ticket_type: TicketType::Validator,
            value: Amount::from(10),
            delegate: None,
            bls_pub_key: vec![],
            vrf_pub_key: vec![],
        });
        let err = check(&tx, 0, &Params::default()).unwrap_err();
        assert_matches!(err, StateError::BadField { ref field, .. } if field == "vrf_pub_key");
    }

    #[test]
    fn commission_bounds() {
        let params = Params::default();
        let low = signed(TxPayload::SetDelegatorCommission {
            commission: Decimal::from(5),
        });
        assert_matches!(check(&low, 0, &params), Err(StateError::BadField { .. }));

        let high = signed(TxPayload::SetDelegatorCommission {
            commission: Decimal::from(101),
        });
        assert_matches!(check(&high, 0, &params), Err(StateError::BadField { .. }));

        let ok = signed(TxPayload::SetDelegatorCommission {
            commission: Decimal::from(25),
        });
        assert_matches!(check(&ok, 0, &params), Ok(()));
    }

    #[test]
    fn namespace_price_must_match() {
        let tx = signed(TxPayload::RegisterNamespace {
            name: "tools".into(),
            value: Amount::from(4),
            to_repo: None,
            domains: Default::default(),
        });
        let err = check(&tx, 0, &Params::default()).unwrap_err();
        assert_matches!(err, StateError::BadField { ref field, .. } if field == "value");
    }

    #[test]
    fn proposal_id_shape() {
        let bad = signed(TxPayload::ProposalVote {
            repo: "infra".into(),
            proposal_id: "12a".into(),
            vote: crate::types::VoteChoice::Yes,
        });
        let err = check(&bad, 0, &Params::default()).unwrap_err();
        assert_matches!(err, StateError::BadField { ref field, .. } if field == "id");

        let long = signed(TxPayload::ProposalVote {
            repo: "infra".into(),
            proposal_id: "123456789".into(),
            vote: crate::types::VoteChoice::Yes,
        });
        let err = check(&long, 0, &Params::default()).unwrap_err();
        assert_matches!(err, StateError::BadField { ref field, .. } if field == "id");
    }

    #[test]
    fn push_endorsement_structure() {
        let params = Params::default();
        let note = PushNote {
            repo: "infra".into(),
            pusher_key_id: format!("pk{}", "3".repeat(40)).parse().unwrap(),
            references: vec![crate::types::PushedReference {
                name: "refs/heads/master".into(),
                old_hash: "0".repeat(40),
                new_hash: "f".repeat(40),
            }],
        };
        let note_id = note.id();
        let endorsement = |key: exonum_crypto::PublicKey| PushEndorsement {
            note_id: note_id.clone(),
            endorser_pub_key: key,
            reference_hashes: vec![exonum_crypto::Hash::zero()],
            bls_sig: vec![1; 8],
        };

        // Too few endorsements.
        let (k1, _) = gen_keypair();
        let tx = signed(TxPayload::GitPush {
            note: note.clone(),
            endorsements: vec![endorsement(k1)],
        });
        let err = check(&tx, 0, &params).unwrap_err();
        assert_matches!(err, StateError::BadField { ref field, .. } if field == "endorsements");

        // Duplicate endorser.
        let (k, _) = gen_keypair();
        let tx = signed(TxPayload::GitPush {
            note: note.clone(),
            endorsements: vec![endorsement(k), endorsement(k), endorsement(k)],
        });
        let err = check(&tx, 0, &params).unwrap_err();
        assert_matches!(err, StateError::BadField { ref msg, .. } if msg.contains("one sender"));

        // Quorum of distinct endorsers passes.
        let keys: Vec<_> = (0..3).map(|_| gen_keypair().0).collect();
        let tx = signed(TxPayload::GitPush {
            note,
            endorsements: keys.into_iter().map(endorsement).collect(),
        });
        assert_matches!(check(&tx, 0, &params), Ok(()));
    }

    #[test]
    fn fee_cap_requires_capped_mode() {
        let tx = signed(TxPayload::ProposalRegisterPushKeys {
            repo: "infra".into(),
            proposal_id: "1".into(),
            value: Amount::zero(),
            key_ids: vec![format!("pk{}", "3".repeat(40)).parse().unwrap()],
            policies: vec![],
            fee_mode: crate::types::FeeMode::RepoPays,
            fee_cap: Amount::from(10),
            namespace: None,
            namespace_only: None,
        });
        let err = check(&tx, 0, &Params::default()).unwrap_err();
        assert_matches!(err, StateError::BadField { ref field, .. } if field == "feeCap");
    }
}
