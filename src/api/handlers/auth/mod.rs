//! Authentication endpoints: SRP login plus account lifecycle.

pub mod account;
pub mod login;
pub mod types;
mod utils;
