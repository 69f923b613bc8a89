//! Parsed representation of a sponsor-mode transaction.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::chain::{TokenKind, TransferEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthMode {
    OriginOnly,
    SponsorPending,
    SponsorSigned,
}

impl AuthMode {
    pub(crate) fn tag(self) -> u8 {
        match self {
            AuthMode::OriginOnly => 0,
            AuthMode::SponsorPending => 1,
            AuthMode::SponsorSigned => 2,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(AuthMode::OriginOnly),
            1 => Some(AuthMode::SponsorPending),
            2 => Some(AuthMode::SponsorSigned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedTransaction {
    pub auth_mode: AuthMode,
    pub origin_address: String,
    pub origin_signature_present: bool,
    pub origin_nonce: u64,
    pub sponsor_address: Option<String>,
    pub sponsor_nonce: u64,
    pub fee_field: u64,
    pub transfer_events: Vec<TransferEvent>,
    /// Opaque chain-specific payload carried through untouched by the codec.
    pub trailing_payload: Bytes,
}

#[derive(Debug, Clone)]
pub struct ExtractedPayment {
    pub token_kind: TokenKind,
    pub amount: Amount,
    pub recipient: String,
    pub sender: String,
}
