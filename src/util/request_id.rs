//! Request-id and opaque-token generation.
//!
//! Request ids use `Uuid::now_v7`, grounded on the teacher's `TraceId` layer,
//! plumbed here as a free function since every error path and success
//! envelope needs one, not just the tower layer. Receipt ids use a random
//! alphanumeric token instead of a UUID, grounded on the teacher's
//! `rand::{Rng, rng}` usage in its EIP-155 client for one-off random values.

use rand::Rng;
use rand::distr::Alphanumeric;
use uuid::Uuid;

pub fn new_request_id() -> String {
    Uuid::now_v7().to_string()
}

pub fn new_receipt_id() -> String {
    let token: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("rcpt_{token}")
}
