//! Wire types for the external chain API (C1).

use serde::{Deserialize, Serialize};

use crate::amount::Amount;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceInfo {
    pub last_executed_nonce: Option<u64>,
    pub possible_next_nonce: u64,
    #[serde(default)]
    pub detected_missing_nonces: Vec<u64>,
}

/// Chain-reported transaction status. `Dropped`/`Abort` carry the raw reason
/// string since the chain emits an open-ended family of `dropped_*`/`abort_*`
/// reasons and only `dropped_replace_by_fee` is singled out by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Success,
    DroppedReplaceByFee,
    Dropped(String),
    Abort(String),
    Unknown,
}

impl TxStatus {
    pub fn is_dropped(&self) -> bool {
        matches!(self, TxStatus::DroppedReplaceByFee | TxStatus::Dropped(_))
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, TxStatus::Abort(_))
    }
}

impl From<&str> for TxStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "pending" => TxStatus::Pending,
            "success" => TxStatus::Success,
            "dropped_replace_by_fee" => TxStatus::DroppedReplaceByFee,
            other if other.starts_with("dropped_") => TxStatus::Dropped(other.to_string()),
            other if other.starts_with("abort_") => TxStatus::Abort(other.to_string()),
            _ => TxStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferEvent {
    pub token_kind: TokenKind,
    pub amount: Amount,
    pub recipient: String,
    pub sender: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "assetId")]
pub enum TokenKind {
    Native,
    Ft(String),
}

#[derive(Debug, Clone)]
pub struct TransactionStatusInfo {
    pub status: TxStatus,
    pub sender_address: Option<String>,
    pub block_height: Option<u64>,
    pub events: Vec<TransferEvent>,
}

#[derive(Debug, Clone)]
pub struct BroadcastAccepted {
    pub txid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    ConflictingNonceInMempool,
    Other(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeTiers {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    TokenTransfer,
    ContractCall,
    SmartContract,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimates {
    pub token_transfer: FeeTiers,
    pub contract_call: FeeTiers,
    pub smart_contract: FeeTiers,
}

impl FeeEstimates {
    pub fn tiers(&self, kind: FeeKind) -> FeeTiers {
        match kind {
            FeeKind::TokenTransfer => self.token_transfer,
            FeeKind::ContractCall => self.contract_call,
            FeeKind::SmartContract => self.smart_contract,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeePriority {
    Low,
    Medium,
    High,
}
