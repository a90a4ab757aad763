//! # Sesamo
//!
//! `sesamo` is an authentication service built on SRP (Secure Remote Password).
//! The server never sees a password and never stores one: clients register a
//! salt plus a verifier, and each login runs a two-phase zero-knowledge
//! handshake that yields mutual proof of the password without transmitting it.
//!
//! ## Handshake storage
//!
//! Pending handshakes live in `PostgreSQL` (`srp_handshakes`). Rows are strictly
//! single-use: the completion path deletes the row in the same statement that
//! reads it, so a session id can never be replayed, and a background sweeper
//! reclaims rows whose TTL expired without a completion attempt.
//!
//! ## Enumeration resistance
//!
//! Login for an unknown email runs the same handshake code against a throwaway
//! identity, so the response shape and timing never reveal whether an account
//! exists.

pub mod api;
pub mod cli;
pub mod srp;
pub mod users;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
