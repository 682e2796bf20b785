//! MCPForge wallet authentication service
//!
//! Challenge-response login for Ethereum-style wallets: issue a one-time
//! nonce, recover the signer of the signed nonce, then log the wallet in or
//! register it as a new user.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
