//! Ledger client backed by a Solana JSON-RPC endpoint

use async_trait::async_trait;
use solana_commitment_config::CommitmentConfig;
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::client_error::Error as RpcClientError;
use solana_sdk::instruction::InstructionError;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::TransactionError;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::errors::{ClientError, RemoteFailure, Result};
use crate::ledger::{ConfirmationPolicy, LedgerClient, SubmissionHandle};
use crate::state::CounterState;
use crate::transaction::{FreshnessToken, SignedTransaction};

pub struct RpcLedgerClient {
    rpc: RpcClient,
    program_id: Pubkey,
    commitment: CommitmentConfig,
    confirmation: ConfirmationPolicy,
}

impl RpcLedgerClient {
    pub fn new(
        url: impl Into<String>,
        commitment: CommitmentConfig,
        program_id: Pubkey,
        confirmation: ConfirmationPolicy,
    ) -> Self {
        Self::with_rpc_client(
            RpcClient::new_with_commitment(url.into(), commitment),
            program_id,
            confirmation,
        )
    }

    /// Wrap an existing RPC client, reading at its commitment level
    pub fn with_rpc_client(
        rpc: RpcClient,
        program_id: Pubkey,
        confirmation: ConfirmationPolicy,
    ) -> Self {
        let commitment = rpc.commitment();
        Self {
            rpc,
            program_id,
            commitment,
            confirmation,
        }
    }
}

/// Extract the raw failure from an executed or simulated transaction error
pub fn remote_failure(error: &TransactionError) -> RemoteFailure {
    let code = match error {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => Some(*code),
        _ => None,
    };
    RemoteFailure::new(code, error.to_string())
}

/// Classify an RPC error: transaction rejections vs. transport failures
fn classify(error: RpcClientError) -> ClientError {
    match error.get_transaction_error() {
        Some(tx_error) => ClientError::rejected(remote_failure(&tx_error)),
        None => ClientError::Network(error.to_string()),
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        self.rpc.get_balance(address).await.map_err(classify)
    }

    async fn latest_freshness_token(&self) -> Result<FreshnessToken> {
        let blockhash = self.rpc.get_latest_blockhash().await.map_err(classify)?;
        debug!(%blockhash, "fetched latest blockhash");
        Ok(FreshnessToken::new(blockhash))
    }

    async fn submit(&self, transaction: &SignedTransaction) -> Result<SubmissionHandle> {
        let signature = self
            .rpc
            .send_transaction(transaction.transaction())
            .await
            .map_err(classify)?;
        Ok(SubmissionHandle::from(signature))
    }

    async fn await_confirmation(&self, handle: &SubmissionHandle) -> Result<()> {
        let deadline = Instant::now() + self.confirmation.timeout;

        loop {
            let status = self
                .rpc
                .get_signature_status_with_commitment(&handle.signature, self.commitment)
                .await
                .map_err(classify)?;

            match status {
                Some(Ok(())) => return Ok(()),
                Some(Err(tx_error)) => return Err(ClientError::rejected(remote_failure(&tx_error))),
                None => trace!(signature = %handle.signature, "not yet confirmed"),
            }

            if Instant::now() >= deadline {
                return Err(ClientError::ConfirmationTimeout {
                    signature: handle.signature.to_string(),
                    waited_secs: self.confirmation.timeout.as_secs(),
                });
            }
            sleep(self.confirmation.poll_interval).await;
        }
    }

    async fn fetch_resource_state(&self, address: &Pubkey) -> Result<Option<CounterState>> {
        let account = self
            .rpc
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(classify)?
            .value;

        let Some(account) = account else {
            return Ok(None);
        };
        if account.owner != self.program_id {
            return Err(ClientError::InvalidAccountData {
                address: address.to_string(),
                reason: format!("owned by {}, expected {}", account.owner, self.program_id),
            });
        }

        CounterState::decode(*address, &account.data).map(Some)
    }
}
