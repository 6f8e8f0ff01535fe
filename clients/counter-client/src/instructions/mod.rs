//! Instructions module for the counter client
//!
//! Each counter program instruction is described in its own file: the fixed
//! account-role schema it expects and the Anchor encoding of its data.

use anchor_lang::solana_program::hash::hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

pub mod increment;
pub mod initialize;

// Re-export instruction builders
pub use increment::*;
pub use initialize::*;

/// Anchor instruction discriminator: `sha256("global:<name>")[..8]`
pub fn sighash(name: &str) -> [u8; 8] {
    let digest = hash(format!("global:{name}").as_bytes()).to_bytes();
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&digest[..8]);
    discriminator
}

/// Operations the client can apply to the counter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CounterOperation {
    Initialize,
    Increment,
}

impl CounterOperation {
    /// Name of the handler in the counter program
    pub fn name(&self) -> &'static str {
        match self {
            CounterOperation::Initialize => "initialize",
            CounterOperation::Increment => "increment",
        }
    }

    /// Whether the counter account itself must sign
    ///
    /// Initialize creates the account at the counter keypair's address, so the
    /// keypair has to authorize it. Increment only needs the user.
    pub fn counter_signs(&self) -> bool {
        matches!(self, CounterOperation::Initialize)
    }

    /// Decode an operation from instruction data
    pub fn from_data(data: &[u8]) -> Option<Self> {
        let discriminator = data.get(..8)?;
        [CounterOperation::Initialize, CounterOperation::Increment]
            .into_iter()
            .find(|operation| sighash(operation.name()) == discriminator)
    }
}

/// Accounts shared by every counter operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterAccounts {
    /// The counter account
    pub counter: Pubkey,
    /// The user authorizing the operation
    pub user: Pubkey,
}

/// Build the instruction for `operation` against `program_id`
pub fn instruction(
    program_id: Pubkey,
    operation: CounterOperation,
    accounts: CounterAccounts,
) -> Instruction {
    match operation {
        CounterOperation::Initialize => initialize(program_id, InitializeAccounts::from(accounts)),
        CounterOperation::Increment => increment(program_id, IncrementAccounts::from(accounts)),
    }
}
