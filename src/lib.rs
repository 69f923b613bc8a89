//! # Overview
//!
//! A sponsored-transaction relay: callers submit an already-built,
//! origin-signed transaction; the relay reserves a sponsor nonce, attaches
//! the sponsor's signature and fee, broadcasts it, and returns a receipt
//! once the chain confirms (or the poll budget runs out). It also exposes
//! an x402-style facilitator surface (`settle`/`verify`) over the same
//! settlement pipeline for callers that already hold a sponsor-signed
//! transaction and just need it broadcast and confirmed.
//!
//! # Roles
//!
//! - **Wallet holders / dApps** call `/relay` with an origin-signed,
//!   sponsor-pending transaction and settlement requirements.
//! - **x402 facilitators** call `/settle` and `/verify` with an
//!   already sponsor-signed transaction.
//! - **Operators** provision API keys, tune fee clamps, and watch
//!   `/stats` and `/nonce/stats`.
//!
//! # Modules
//!
//! - [`amount`] - arbitrary-precision token amount, serialized as a decimal string
//! - [`chain`] - the external chain API client and its wire types
//! - [`codec`] - transaction parsing, payment extraction, sponsor signing
//! - [`nonce`] - per-wallet nonce reservation pools and round-robin assignment
//! - [`stats`] - rolling transaction/error counters backing the dashboard JSON
//! - [`receipts`] - payment receipt storage with TTL and consumption tracking
//! - [`dedup`] - payload-hash and client-identifier idempotency store
//! - [`fees`] - cached upstream fee estimates with operator-configured clamps
//! - [`ratelimit`] - per-origin sliding-window rate limiting
//! - [`apikeys`] - hashed API-key store with per-tier quotas
//! - [`wallet`] - sponsor wallet key derivation
//! - [`config`] - server configuration
//! - [`error`] - the unified `ApiError` boundary
//! - [`settlement`] - the request-scoped orchestration tying every component together
//! - [`handlers`] - axum route wiring
//! - [`util`] - shutdown signal handling, tracing bootstrap, request-id generation, base64 helpers

pub mod amount;
pub mod apikeys;
pub mod chain;
pub mod codec;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fees;
pub mod handlers;
pub mod nonce;
pub mod ratelimit;
pub mod receipts;
pub mod settlement;
pub mod stats;
pub mod util;
pub mod wallet;
