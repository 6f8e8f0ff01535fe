//! # Counter Client
//!
//! Off-chain client for the counter program. It keeps a persistent keypair
//! for the counter account, initializes the account the first time it is
//! seen missing, then increments it. Every transaction is built against a
//! freshly fetched blockhash, confirmed, and followed by a fresh read of the
//! account before its result is reported.
//!
//! ## Layout
//! - `identity` - counter and payer keypairs, and their persistence
//! - `instructions` - account schemas and encoding of each instruction
//! - `transaction` - building and signing counter transactions
//! - `ledger` - the ledger capabilities the client needs
//! - `rpc` - those capabilities over Solana JSON-RPC
//! - `lifecycle` - the initialize-then-increment state machine
//! - `errors` - run-level errors and program error translation

pub mod config;
pub mod errors;
pub mod identity;
pub mod instructions;
pub mod ledger;
pub mod lifecycle;
#[cfg(feature = "rpc")]
pub mod rpc;
pub mod state;
pub mod transaction;

// Re-export for easier access
pub use config::*;
pub use errors::*;
pub use identity::*;
pub use instructions::{CounterAccounts, CounterOperation};
pub use ledger::*;
pub use lifecycle::*;
#[cfg(feature = "rpc")]
pub use rpc::RpcLedgerClient;
pub use state::*;
pub use transaction::*;
