//! Increment instruction for the counter program

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

use super::{sighash, CounterAccounts, CounterOperation};

/// Accounts expected by `increment`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IncrementAccounts {
    /// The counter to increment
    pub counter: Pubkey,
    /// The user authorizing the increment
    pub user: Pubkey,
}

impl IncrementAccounts {
    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.counter, false),
            AccountMeta::new_readonly(self.user, true),
        ]
    }
}

impl From<CounterAccounts> for IncrementAccounts {
    fn from(accounts: CounterAccounts) -> Self {
        Self {
            counter: accounts.counter,
            user: accounts.user,
        }
    }
}

/// Build an `increment` instruction
///
/// # Arguments
/// * `program_id` - The deployed counter program
/// * `accounts` - The counter and the authorizing user
pub fn increment(program_id: Pubkey, accounts: IncrementAccounts) -> Instruction {
    Instruction {
        program_id,
        accounts: accounts.to_account_metas(),
        data: sighash(CounterOperation::Increment.name()).to_vec(),
    }
}
