//! Terminal client for the OldGuard ledger service.
//!
//! The client keeps a rendered copy of the server's chain and trust scores in
//! sync by polling, and lets the user mine new transactions. The server is
//! the only source of truth: after every submission the view is refreshed
//! from it rather than patched locally.

pub mod client;
pub mod config;
pub mod errors;
pub mod ledger_client;
pub mod render;
pub mod snapshot;
pub mod submit;
pub mod sync;
pub mod ui;

#[cfg(test)]
pub mod test_helpers;
