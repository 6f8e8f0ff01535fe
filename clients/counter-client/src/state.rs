//! # State Module
//!
//! This module contains the off-chain view of the counter account and the
//! lifecycle states the client moves the counter through.

use anchor_lang::prelude::borsh;
use anchor_lang::solana_program::hash::hash;
use anchor_lang::{AnchorDeserialize, AnchorSerialize};
use solana_sdk::pubkey::Pubkey;

use crate::errors::{ClientError, Result};

/// Length of the Anchor account discriminator prefix
pub const DISCRIMINATOR_LEN: usize = 8;

/// Anchor discriminator of an account type: `sha256("account:<Name>")[..8]`
pub fn account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = hash(format!("account:{name}").as_bytes()).to_bytes();
    let mut discriminator = [0u8; DISCRIMINATOR_LEN];
    discriminator.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    discriminator
}

/// Borsh layout of the on-chain `Counter` account, after the discriminator
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CounterAccount {
    /// The authority that can modify this counter
    pub authority: [u8; 32],
    /// The current count value
    pub count: u64,
    /// Timestamp when the counter was created
    pub created_at: i64,
    /// Timestamp when the counter was last updated
    pub updated_at: i64,
    /// Total number of increments performed
    pub total_increments: u64,
    /// Total number of decrements performed
    pub total_decrements: u64,
}

impl CounterAccount {
    pub const ACCOUNT_NAME: &'static str = "Counter";

    /// Decode raw account data, checking the discriminator first
    pub fn try_from_account_data(address: &Pubkey, data: &[u8]) -> Result<Self> {
        let invalid = |reason: String| ClientError::InvalidAccountData {
            address: address.to_string(),
            reason,
        };

        if data.len() < DISCRIMINATOR_LEN {
            return Err(invalid(format!(
                "account data is {} bytes, shorter than the discriminator",
                data.len()
            )));
        }
        let (discriminator, mut body) = data.split_at(DISCRIMINATOR_LEN);
        if discriminator != account_discriminator(Self::ACCOUNT_NAME) {
            return Err(invalid("discriminator does not match Counter".to_string()));
        }

        // Trailing bytes are allocation padding; deserialize only the prefix.
        Self::deserialize(&mut body).map_err(|e| invalid(e.to_string()))
    }

    /// Encode as account data, discriminator included
    pub fn to_account_data(&self) -> Vec<u8> {
        let mut data = account_discriminator(Self::ACCOUNT_NAME).to_vec();
        self.serialize(&mut data)
            .expect("serializing into a Vec cannot fail");
        data
    }
}

/// Counter account as last observed on the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterState {
    pub address: Pubkey,
    pub authority: Pubkey,
    pub count: u64,
    pub created_at: i64,
    pub updated_at: i64,
    pub total_increments: u64,
    pub total_decrements: u64,
}

impl CounterState {
    pub fn from_account(address: Pubkey, account: CounterAccount) -> Self {
        Self {
            address,
            authority: Pubkey::new_from_array(account.authority),
            count: account.count,
            created_at: account.created_at,
            updated_at: account.updated_at,
            total_increments: account.total_increments,
            total_decrements: account.total_decrements,
        }
    }

    /// Decode a counter from the data of the account at `address`
    pub fn decode(address: Pubkey, data: &[u8]) -> Result<Self> {
        CounterAccount::try_from_account_data(&address, data)
            .map(|account| Self::from_account(address, account))
    }
}

/// Where the controller believes the counter is in its lifecycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing has been observed yet
    Unknown,
    /// The ledger reported no account at the counter address
    NotInitialized,
    /// The ledger reported an initialized counter
    Initialized(CounterState),
}

impl LifecycleState {
    /// State implied by a fresh ledger observation
    pub fn observed(state: Option<CounterState>) -> Self {
        match state {
            Some(state) => LifecycleState::Initialized(state),
            None => LifecycleState::NotInitialized,
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            LifecycleState::Initialized(state) => Some(state.count),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CounterAccount {
        CounterAccount {
            authority: Pubkey::new_unique().to_bytes(),
            count: 5,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_100,
            total_increments: 5,
            total_decrements: 0,
        }
    }

    #[test]
    fn decodes_padded_account_data() {
        let address = Pubkey::new_unique();
        let account = sample();
        let mut data = account.to_account_data();
        data.extend_from_slice(&[0u8; 16]);

        let state = CounterState::decode(address, &data).unwrap();
        assert_eq!(state.count, 5);
        assert_eq!(state.authority.to_bytes(), account.authority);
        assert_eq!(state.address, address);
    }

    #[test]
    fn account_layout_is_discriminator_then_borsh_fields() {
        let account = sample();
        let data = account.to_account_data();

        // 8 discriminator + 32 authority + 8 count + 8 + 8 timestamps + 8 + 8 totals
        assert_eq!(data.len(), 80);
        assert_eq!(data[..DISCRIMINATOR_LEN], account_discriminator("Counter"));
        assert_eq!(data[8..40], account.authority);
        assert_eq!(data[40..48], 5u64.to_le_bytes());
    }

    #[test]
    fn rejects_foreign_discriminator() {
        let address = Pubkey::new_unique();
        let mut data = sample().to_account_data();
        data[0] ^= 0xff;

        let err = CounterState::decode(address, &data).unwrap_err();
        assert!(matches!(err, ClientError::InvalidAccountData { .. }));
    }

    #[test]
    fn rejects_truncated_data() {
        let address = Pubkey::new_unique();
        assert!(CounterState::decode(address, &[1, 2, 3]).is_err());

        let data = sample().to_account_data();
        assert!(CounterState::decode(address, &data[..20]).is_err());
    }

    #[test]
    fn observation_maps_to_lifecycle_state() {
        assert_eq!(LifecycleState::observed(None), LifecycleState::NotInitialized);
        let state = CounterState::from_account(Pubkey::new_unique(), sample());
        assert_eq!(LifecycleState::observed(Some(state)).count(), Some(5));
        assert_eq!(LifecycleState::Unknown.count(), None);
    }
}
