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

//! Transactions.
//!
//! Every transaction carries the common fields `{nonce, fee, timestamp,
//! sender_pub_key, signature}` plus a typed payload; the payload variant is
//! the transaction type. The signature covers the canonical binary encoding
//! of every field except the signature itself.

use exonum_crypto::{Hash, PublicKey, SecretKey, Signature};
use rust_decimal::Decimal;

use std::collections::BTreeMap;

use super::repo::{FeeMode, Policy, RepoConfigUpdate};
use super::ticket::TicketType;
use super::{Address, Amount, PushKeyId};

/// Type tag of a transaction; derived from the payload variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    TransferCoin,
    TicketPurchase,
    TicketUnbond,
    SetDelegatorCommission,
    RegisterPushKey,
    UpdateDelPushKey,
    RegisterNamespace,
    UpdateNamespaceDomains,
    CreateRepo,
    GitPush,
    GasMint,
    GasToCoin,
    BurnForSwap,
    ProposalUpsertOwner,
    ProposalUpdateRepo,
    ProposalRegisterPushKeys,
    ProposalVote,
    ProposalDepositFee,
}

impl TxType {
    /// Stable wire name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            TxType::TransferCoin => "transfer_coin",
            TxType::TicketPurchase => "ticket_purchase",
            TxType::TicketUnbond => "ticket_unbond",
            TxType::SetDelegatorCommission => "set_delegator_commission",
            TxType::RegisterPushKey => "register_push_key",
            TxType::UpdateDelPushKey => "update_del_push_key",
            TxType::RegisterNamespace => "register_namespace",
            TxType::UpdateNamespaceDomains => "update_namespace_domains",
            TxType::CreateRepo => "create_repo",
            TxType::GitPush => "git_push",
            TxType::GasMint => "gas_mint",
            TxType::GasToCoin => "gas_to_coin",
            TxType::BurnForSwap => "burn_for_swap",
            TxType::ProposalUpsertOwner => "proposal_upsert_owner",
            TxType::ProposalUpdateRepo => "proposal_update_repo",
            TxType::ProposalRegisterPushKeys => "proposal_register_push_keys",
            TxType::ProposalVote => "proposal_vote",
            TxType::ProposalDepositFee => "proposal_deposit_fee",
        }
    }
}

/// A voter's choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoteChoice {
    Yes,
    No,
    NoWithVeto,
}

/// A single reference update inside a push note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushedReference {
    /// Full reference name, e.g. `refs/heads/master`.
    pub name: String,
    /// Object hash the reference currently points at.
    pub old_hash: String,
    /// Object hash the reference will point at.
    pub new_hash: String,
}

/// The pusher-signed description of a push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushNote {
    /// Target repository.
    pub repo: String,
    /// Identifier of the push key that signed the push.
    pub pusher_key_id: PushKeyId,
    /// Reference updates.
    pub references: Vec<PushedReference>,
}

impl PushNote {
    /// Canonical identifier of the note.
    pub fn id(&self) -> Hash {
        let bytes = bincode::serialize(self).expect("push note always serializes");
        exonum_crypto::hash(&bytes)
    }
}

/// A host's endorsement of a push note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEndorsement {
    /// Identifier of the endorsed note.
    pub note_id: Hash,
    /// Key of the endorsing host.
    pub endorser_pub_key: PublicKey,
    /// Hashes of the references the endorser validated, in note order.
    pub reference_hashes: Vec<Hash>,
    /// Aggregatable BLS signature over the note; opaque to this layer.
    pub bls_sig: Vec<u8>,
}

/// Typed transaction payloads; one variant per transaction type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum TxPayload {
    TransferCoin {
        /// Recipient: native address, `r/<repo>` or namespace URI.
        to: String,
        value: Amount,
    },
    TicketPurchase {
        ticket_type: TicketType,
        value: Amount,
        /// When set, the validator/host the stake is delegated to.
        delegate: Option<PublicKey>,
        /// BLS public key of the host (host tickets only).
        bls_pub_key: Vec<u8>,
        /// VRF public key of the validator (validator tickets only).
        vrf_pub_key: Vec<u8>,
    },
    TicketUnbond {
        ticket_hash: Hash,
    },
    SetDelegatorCommission {
        commission: Decimal,
    },
    RegisterPushKey {
        pub_key: PublicKey,
        scopes: Vec<String>,
        fee_cap: Amount,
    },
    UpdateDelPushKey {
        id: PushKeyId,
        /// When set, the key is removed entirely and other fields ignored.
        delete: bool,
        add_scopes: Vec<String>,
        remove_scopes: Vec<String>,
        fee_cap: Option<Amount>,
    },
    RegisterNamespace {
        name: String,
        value: Amount,
        /// Repository to own the namespace instead of the sender account.
        to_repo: Option<String>,
        domains: BTreeMap<String, String>,
    },
    UpdateNamespaceDomains {
        name: String,
        /// Domain updates; an empty target removes the domain.
        domains: BTreeMap<String, String>,
    },
    CreateRepo {
        name: String,
        description: String,
        value: Amount,
        config: RepoConfigUpdate,
    },
    GitPush {
        note: PushNote,
        endorsements: Vec<PushEndorsement>,
    },
    GasMint {
        value: Amount,
    },
    GasToCoin {
        value: Amount,
    },
    BurnForSwap {
        value: Amount,
        /// Address on the destination chain; opaque to this layer.
        swap_to: String,
    },
    ProposalUpsertOwner {
        repo: String,
        proposal_id: String,
        value: Amount,
        addresses: Vec<Address>,
        veto: bool,
    },
    ProposalUpdateRepo {
        repo: String,
        proposal_id: String,
        value: Amount,
        config: RepoConfigUpdate,
        description: Option<String>,
    },
    ProposalRegisterPushKeys {
        repo: String,
        proposal_id: String,
        value: Amount,
        key_ids: Vec<PushKeyId>,
        policies: Vec<Policy>,
        fee_mode: FeeMode,
        fee_cap: Amount,
        /// When set, the keys are also admitted to this namespace.
        namespace: Option<String>,
        /// When set, the keys are admitted to this namespace only.
        namespace_only: Option<String>,
    },
    ProposalVote {
        repo: String,
        proposal_id: String,
        vote: VoteChoice,
    },
    ProposalDepositFee {
        repo: String,
        proposal_id: String,
        value: Amount,
    },
}

impl TxPayload {
    /// The type tag of this payload.
    pub fn tx_type(&self) -> TxType {
        match self {
            TxPayload::TransferCoin { .. } => TxType::TransferCoin,
            TxPayload::TicketPurchase { .. } => TxType::TicketPurchase,
            TxPayload::TicketUnbond { .. } => TxType::TicketUnbond,
            TxPayload::SetDelegatorCommission { .. } => TxType::SetDelegatorCommission,
            TxPayload::RegisterPushKey { .. } => TxType::RegisterPushKey,
            TxPayload::UpdateDelPushKey { .. } => TxType::UpdateDelPushKey,
            TxPayload::RegisterNamespace { .. } => TxType::RegisterNamespace,
            TxPayload::UpdateNamespaceDomains { .. } => TxType::UpdateNamespaceDomains,
            TxPayload::CreateRepo { .. } => TxType::CreateRepo,
            TxPayload::GitPush { .. } => TxType::GitPush,
            TxPayload::GasMint { .. } => TxType::GasMint,
            TxPayload::GasToCoin { .. } => TxType::GasToCoin,
            TxPayload::BurnForSwap { .. } => TxType::BurnForSwap,
            TxPayload::ProposalUpsertOwner { .. } => TxType::ProposalUpsertOwner,
            TxPayload::ProposalUpdateRepo { .. } => TxType::ProposalUpdateRepo,
            TxPayload::ProposalRegisterPushKeys { .. } => TxType::ProposalRegisterPushKeys,
            TxPayload::ProposalVote { .. } => TxType::ProposalVote,
            TxPayload::ProposalDepositFee { .. } => TxType::ProposalDepositFee,
        }
    }
}

/// A signed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender nonce; must be exactly one above the committed account nonce.
    pub nonce: u64,
    /// Fee paid to the network.
    pub fee: Amount,
    /// Client-side creation time (unix seconds).
    pub timestamp: i64,
    /// Key of the signing account.
    pub sender_pub_key: PublicKey,
    /// Typed payload.
    pub payload: TxPayload,
    /// Signature over the canonical encoding of all other fields.
    pub signature: Signature,
}

impl Transaction {
    /// Builds and signs a transaction.
    pub fn new_signed(
        payload: TxPayload,
        nonce: u64,
        fee: Amount,
        timestamp: i64,
        sender_pub_key: PublicKey,
        secret_key: &SecretKey,
    ) -> Self {
        let mut tx = Transaction {
            nonce,
            fee,
            timestamp,
            sender_pub_key,
            payload,
            signature: Signature::zero(),
        };
        tx.signature = exonum_crypto::sign(&tx.signing_bytes(), secret_key);
        tx
    }

    /// The type tag of the transaction.
    pub fn tx_type(&self) -> TxType {
        self.payload.tx_type()
    }

    /// Content hash of the signed transaction.
    pub fn hash(&self) -> Hash {
        let bytes = bincode::serialize(self).expect("transaction always serializes");
        exonum_crypto::hash(&bytes)
    }

    /// Address of the sender account.
    pub fn sender(&self) -> Address {
        Address::from_public_key(&self.sender_pub_key)
    }

    /// Canonical bytes covered by the signature: every field except the
    /// signature itself.
    pub fn signing_bytes(&self) -> Vec<u8> {
        bincode::serialize(&(
            self.nonce,
            &self.fee,
            self.timestamp,
            &self.sender_pub_key,
            &self.payload,
        ))
        .expect("transaction always serializes")
    }

    /// Verifies the signature against the sender key.
    pub fn verify_signature(&self) -> bool {
        exonum_crypto::verify(&self.signature, &self.signing_bytes(), &self.sender_pub_key)
    }

    /// Size in bytes relevant for the fee floor: the canonical encoding
    /// without the fee and signature fields.
    pub fn size_for_fee(&self) -> u64 {
        bincode::serialize(&(
            self.nonce,
            self.timestamp,
            &self.sender_pub_key,
            &self.payload,
        ))
        .expect("transaction always serializes")
        .len() as u64
    }

    /// The value the transaction moves or escrows, on top of the fee.
    pub fn value(&self) -> Amount {
        match &self.payload {
            TxPayload::TransferCoin { value, .. }
            | TxPayload::TicketPurchase { value, .. }
            | TxPayload::RegisterNamespace { value, .. }
            | TxPayload::CreateRepo { value, .. }
            | TxPayload::GasMint { value }
            | TxPayload::BurnForSwap { value, .. }
            | TxPayload::ProposalUpsertOwner { value, .. }
            | TxPayload::ProposalUpdateRepo { value, .. }
            | TxPayload::ProposalRegisterPushKeys { value, .. }
            | TxPayload::ProposalDepositFee { value, .. } => *value,
            // Gas-to-coin spends gas balance, not coin balance.
            TxPayload::GasToCoin { .. } => Amount::zero(),
            TxPayload::TicketUnbond { .. }
            | TxPayload::SetDelegatorCommission { .. }
            | TxPayload::RegisterPushKey { .. }
            | TxPayload::UpdateDelPushKey { .. }
            | TxPayload::UpdateNamespaceDomains { .. }
            | TxPayload::GitPush { .. }
            | TxPayload::ProposalVote { .. } => Amount::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exonum_crypto::gen_keypair;
    use pretty_assertions::assert_eq;

    fn transfer(nonce: u64) -> (Transaction, PublicKey) {
        let (pub_key, secret_key) = gen_keypair();
        let tx = Transaction::new_signed(
            TxPayload::TransferCoin {
                to: "r/infra".to_owned(),
                value: Amount::from(5),
            },
            nonce,
            "0.1".parse().unwrap(),
            1_500_000_000,
            pub_key,
            &secret_key,
        );
        (tx, pub_key)
    }

    #[test]
    fn signature_covers_all_fields_but_itself() {
        let (tx, _) = transfer(1);
        assert!(tx.verify_signature());

        let mut tampered = tx.clone();
        tampered.nonce = 2;
        assert!(!tampered.verify_signature());

        let mut tampered = tx.clone();
        tampered.payload = TxPayload::TransferCoin {
            to: "r/infra".to_owned(),
            value: Amount::from(6),
        };
        assert!(!tampered.verify_signature());
    }

    #[test]
    fn signing_bytes_are_deterministic() {
        let (tx, _) = transfer(1);
        assert_eq!(tx.signing_bytes(), tx.signing_bytes());
        assert!(tx.size_for_fee() > 0);
    }

    #[test]
    fn push_note_id_is_content_addressed() {
        let note = PushNote {
            repo: "infra".to_owned(),
            pusher_key_id: format!("pk{}", "0".repeat(40)).parse().unwrap(),
            references: vec![],
        };
        assert_eq!(note.id(), note.id());

        let mut other = note.clone();
        other.repo = "tools".to_owned();
        assert_ne!(note.id(), other.id());
    }
}
