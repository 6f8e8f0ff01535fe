//! Transaction assembly and signing for counter operations
//!
//! Building is pure: no ledger access happens here. A transaction is bound
//! to the freshness token it was built with and to its fee payer before it
//! can be signed, and signing refuses any identity set that differs from
//! the one the operation requires.

use std::fmt;

use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::Transaction;

use crate::errors::{ClientError, Result};
use crate::identity::Identity;
use crate::instructions::{self, CounterAccounts, CounterOperation};

/// A recent blockhash bounding how long a transaction stays valid
///
/// Tokens are deliberately not `Clone`: building a transaction consumes the
/// token, so one token can never back two submissions.
#[derive(Debug, PartialEq, Eq)]
pub struct FreshnessToken(Hash);

impl FreshnessToken {
    pub fn new(blockhash: Hash) -> Self {
        Self(blockhash)
    }

    pub fn blockhash(&self) -> Hash {
        self.0
    }
}

impl fmt::Display for FreshnessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A counter transaction that has not been signed yet
#[derive(Debug)]
pub struct UnsignedTransaction {
    operation: CounterOperation,
    fee_payer: Pubkey,
    blockhash: Hash,
    transaction: Transaction,
}

impl UnsignedTransaction {
    /// Assemble `operation` into a transaction paid for by `fee_payer`
    ///
    /// # Arguments
    /// * `program_id` - The counter program
    /// * `operation` - Initialize or increment
    /// * `accounts` - The counter and the authorizing user
    /// * `fee_payer` - The account paying the transaction fee
    /// * `token` - Freshness token fetched for this transaction only
    pub fn build(
        program_id: Pubkey,
        operation: CounterOperation,
        accounts: CounterAccounts,
        fee_payer: Pubkey,
        token: FreshnessToken,
    ) -> Self {
        let ix = instructions::instruction(program_id, operation, accounts);
        let mut transaction = Transaction::new_with_payer(&[ix], Some(&fee_payer));
        transaction.message.recent_blockhash = token.blockhash();

        Self {
            operation,
            fee_payer,
            blockhash: token.blockhash(),
            transaction,
        }
    }

    pub fn operation(&self) -> CounterOperation {
        self.operation
    }

    pub fn fee_payer(&self) -> Pubkey {
        self.fee_payer
    }

    /// Addresses that must sign, fee payer first
    pub fn required_signers(&self) -> &[Pubkey] {
        let required = usize::from(self.transaction.message.header.num_required_signatures);
        &self.transaction.message.account_keys[..required]
    }

    /// Sign with exactly the identities the operation requires
    ///
    /// Fails with `MissingSigner` or `UnexpectedSigner` before touching the
    /// transaction when the identity set is incomplete or has extras.
    pub fn sign(self, identities: &[&Identity]) -> Result<SignedTransaction> {
        let required = self.required_signers();

        if let Some(missing) = required
            .iter()
            .find(|address| !identities.iter().any(|id| id.address() == **address))
        {
            return Err(ClientError::MissingSigner(missing.to_string()));
        }
        if let Some(extra) = identities
            .iter()
            .find(|id| !required.contains(&id.address()))
        {
            return Err(ClientError::UnexpectedSigner(extra.address().to_string()));
        }

        let Self {
            operation,
            fee_payer,
            blockhash,
            mut transaction,
        } = self;

        let keypairs: Vec<&Keypair> = identities.iter().map(|id| id.keypair()).collect();
        transaction
            .try_sign(&keypairs, blockhash)
            .map_err(|e| ClientError::Signing(e.to_string()))?;

        Ok(SignedTransaction {
            operation,
            fee_payer,
            blockhash,
            transaction,
        })
    }
}

/// A fully signed counter transaction, ready for submission
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    operation: CounterOperation,
    fee_payer: Pubkey,
    blockhash: Hash,
    transaction: Transaction,
}

impl SignedTransaction {
    pub fn operation(&self) -> CounterOperation {
        self.operation
    }

    pub fn fee_payer(&self) -> Pubkey {
        self.fee_payer
    }

    /// Blockhash of the freshness token this transaction was built with
    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    /// The fee payer's signature, which identifies the transaction
    pub fn signature(&self) -> Signature {
        self.transaction.signatures[0]
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }
}
