//! Initialize instruction for the counter program

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk_ids::system_program;

use super::{sighash, CounterAccounts, CounterOperation};

/// Accounts expected by `initialize`
///
/// The counter account is created by the system program during the
/// instruction, so it must be writable and must sign alongside the user who
/// pays for its rent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitializeAccounts {
    pub counter: Pubkey,
    pub user: Pubkey,
}

impl InitializeAccounts {
    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.counter, true),
            AccountMeta::new(self.user, true),
            AccountMeta::new_readonly(system_program::ID, false),
        ]
    }
}

impl From<CounterAccounts> for InitializeAccounts {
    fn from(accounts: CounterAccounts) -> Self {
        Self {
            counter: accounts.counter,
            user: accounts.user,
        }
    }
}

/// Build an `initialize` instruction
pub fn initialize(program_id: Pubkey, accounts: InitializeAccounts) -> Instruction {
    Instruction {
        program_id,
        accounts: accounts.to_account_metas(),
        data: sighash(CounterOperation::Initialize.name()).to_vec(),
    }
}
