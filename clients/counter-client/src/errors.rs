//! Errors module for the counter client
//!
//! This module contains the run-level error type returned by every boundary
//! call, and the translator that turns numeric program failure codes reported
//! by the ledger into the counter program's domain errors.

use std::fmt;
use std::path::PathBuf;

use anchor_lang::error::ERROR_CODE_OFFSET;
use thiserror::Error;

/// A failure reported by the ledger, exactly as it was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFailure {
    /// Program error code, when the rejection carried one
    pub code: Option<u32>,
    /// Raw failure text from the ledger
    pub raw: String,
}

impl RemoteFailure {
    pub fn new(code: Option<u32>, raw: impl Into<String>) -> Self {
        Self {
            code,
            raw: raw.into(),
        }
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A translated program failure with a stable code and message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainError {
    pub code: u32,
    pub name: &'static str,
    pub message: &'static str,
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.code, self.message)
    }
}

/// Custom error codes of the counter program
///
/// Codes are assigned in declaration order starting at Anchor's
/// `ERROR_CODE_OFFSET`, the way `#[error_code]` numbers them on-chain.
const COUNTER_ERRORS: &[(&str, &str)] = &[
    ("Unauthorized", "Unauthorized operation"),
    ("InvalidStatement", "Invalid statement parameters"),
    ("ArithmeticError", "Arithmetic error"),
    ("NotInitialized", "Counter not initialized"),
    ("InvalidRegistryConfig", "Invalid predicate registry configuration"),
    ("InvalidPolicyConfig", "Invalid policy configuration"),
    ("InvalidAttesterConfig", "Invalid attester configuration"),
    ("ValidationFailed", "Predicate validation failed"),
];

/// Anchor framework error codes (`anchor_lang::error::ErrorCode`)
const FRAMEWORK_ERRORS: &[(u32, &str, &str)] = &[
    // Instructions
    (100, "InstructionMissing", "8 byte instruction identifier not provided"),
    (101, "InstructionFallbackNotFound", "Fallback functions are not supported"),
    (102, "InstructionDidNotDeserialize", "The program could not deserialize the given instruction"),
    (103, "InstructionDidNotSerialize", "The program could not serialize the given instruction"),
    // IDL instructions
    (1000, "IdlInstructionStub", "The program was compiled without idl instructions"),
    (1001, "IdlInstructionInvalidProgram", "Invalid program given to the IDL instruction"),
    (1002, "IdlAccountNotEmpty", "IDL account must be empty in order to resize, try closing first"),
    // Event instructions
    (1500, "EventInstructionStub", "The program was compiled without `event-cpi` feature"),
    // Constraints
    (2000, "ConstraintMut", "A mut constraint was violated"),
    (2001, "ConstraintHasOne", "A has one constraint was violated"),
    (2002, "ConstraintSigner", "A signer constraint was violated"),
    (2003, "ConstraintRaw", "A raw constraint was violated"),
    (2004, "ConstraintOwner", "An owner constraint was violated"),
    (2005, "ConstraintRentExempt", "A rent exemption constraint was violated"),
    (2006, "ConstraintSeeds", "A seeds constraint was violated"),
    (2007, "ConstraintExecutable", "An executable constraint was violated"),
    (2008, "ConstraintState", "Deprecated Error, feel free to replace with something else"),
    (2009, "ConstraintAssociated", "An associated constraint was violated"),
    (2010, "ConstraintAssociatedInit", "An associated init constraint was violated"),
    (2011, "ConstraintClose", "A close constraint was violated"),
    (2012, "ConstraintAddress", "An address constraint was violated"),
    (2013, "ConstraintZero", "Expected zero account discriminant"),
    (2014, "ConstraintTokenMint", "A token mint constraint was violated"),
    (2015, "ConstraintTokenOwner", "A token owner constraint was violated"),
    (2016, "ConstraintMintMintAuthority", "A mint mint authority constraint was violated"),
    (2017, "ConstraintMintFreezeAuthority", "A mint freeze authority constraint was violated"),
    (2018, "ConstraintMintDecimals", "A mint decimals constraint was violated"),
    (2019, "ConstraintSpace", "A space constraint was violated"),
    (2020, "ConstraintAccountIsNone", "A required account for the constraint is None"),
    (2021, "ConstraintTokenTokenProgram", "A token account token program constraint was violated"),
    (2022, "ConstraintMintTokenProgram", "A mint token program constraint was violated"),
    (2023, "ConstraintAssociatedTokenTokenProgram", "An associated token account token program constraint was violated"),
    (2024, "ConstraintMintGroupPointerExtension", "Invalid mint group pointer extension"),
    (2025, "ConstraintMintGroupPointerExtensionAuthority", "Invalid mint group pointer extension authority"),
    (2026, "ConstraintMintGroupPointerExtensionGroupAddress", "Invalid mint group pointer extension group address"),
    (2027, "ConstraintMintGroupMemberPointerExtension", "Invalid mint group member pointer extension"),
    (2028, "ConstraintMintGroupMemberPointerExtensionAuthority", "Invalid mint group member pointer extension authority"),
    (2029, "ConstraintMintGroupMemberPointerExtensionMemberAddress", "Invalid mint group member pointer extension member address"),
    (2030, "ConstraintMintMetadataPointerExtension", "Invalid mint metadata pointer extension"),
    (2031, "ConstraintMintMetadataPointerExtensionAuthority", "Invalid mint metadata pointer extension authority"),
    (2032, "ConstraintMintMetadataPointerExtensionMetadataAddress", "Invalid mint metadata pointer extension metadata address"),
    (2033, "ConstraintMintCloseAuthorityExtension", "Invalid mint close authority extension"),
    (2034, "ConstraintMintCloseAuthorityExtensionAuthority", "Invalid mint close authority extension authority"),
    (2035, "ConstraintMintPermanentDelegateExtension", "Invalid mint permanent delegate extension"),
    (2036, "ConstraintMintPermanentDelegateExtensionDelegate", "Invalid mint permanent delegate extension delegate"),
    (2037, "ConstraintMintTransferHookExtension", "Invalid mint transfer hook extension"),
    (2038, "ConstraintMintTransferHookExtensionAuthority", "Invalid mint transfer hook extension authority"),
    (2039, "ConstraintMintTransferHookExtensionProgramId", "Invalid mint transfer hook extension program id"),
    (2040, "ConstraintDuplicateMutableAccount", "A duplicate mutable account constraint was violated"),
    // Require
    (2500, "RequireViolated", "A require expression was violated"),
    (2501, "RequireEqViolated", "A require_eq expression was violated"),
    (2502, "RequireKeysEqViolated", "A require_keys_eq expression was violated"),
    (2503, "RequireNeqViolated", "A require_neq expression was violated"),
    (2504, "RequireKeysNeqViolated", "A require_keys_neq expression was violated"),
    (2505, "RequireGtViolated", "A require_gt expression was violated"),
    (2506, "RequireGteViolated", "A require_gte expression was violated"),
    // Accounts
    (3000, "AccountDiscriminatorAlreadySet", "The account discriminator was already set on this account"),
    (3001, "AccountDiscriminatorNotFound", "No discriminator was found on the account"),
    (3002, "AccountDiscriminatorMismatch", "Account discriminator did not match what was expected"),
    (3003, "AccountDidNotDeserialize", "Failed to deserialize the account"),
    (3004, "AccountDidNotSerialize", "Failed to serialize the account"),
    (3005, "AccountNotEnoughKeys", "Not enough account keys given to the instruction"),
    (3006, "AccountNotMutable", "The given account is not mutable"),
    (3007, "AccountOwnedByWrongProgram", "The given account is owned by a different program than expected"),
    (3008, "InvalidProgramId", "Program ID was not as expected"),
    (3009, "InvalidProgramExecutable", "Program account is not executable"),
    (3010, "AccountNotSigner", "The given account did not sign"),
    (3011, "AccountNotSystemOwned", "The given account is not owned by the system program"),
    (3012, "AccountNotInitialized", "The program expected this account to be already initialized"),
    (3013, "AccountNotProgramData", "The given account is not a program data account"),
    (3014, "AccountNotAssociatedTokenAccount", "The given account is not the associated token account"),
    (3015, "AccountSysvarMismatch", "The given public key does not match the required sysvar"),
    (3016, "AccountReallocExceedsLimit", "The account reallocation exceeds the MAX_PERMITTED_DATA_INCREASE limit"),
    (3017, "AccountDuplicateReallocs", "The account was duplicated for more than one reallocation"),
    // Miscellaneous
    (4100, "DeclaredProgramIdMismatch", "The declared program id does not match the actual program id"),
    (4101, "TryingToInitPayerAsProgramAccount", "You cannot/should not initialize the payer account as a program account"),
    (4102, "InvalidNumericConversion", "Error during numeric conversion"),
    // Deprecated
    (5000, "Deprecated", "The API being used is deprecated and should no longer be used"),
];

/// Translate a raw ledger failure into a domain error
///
/// Returns `None` when the failure carries no code or an unknown one; the
/// caller must then report the raw failure unchanged.
pub fn translate(failure: &RemoteFailure) -> Option<DomainError> {
    failure.code.and_then(from_code)
}

/// Look up a single program error code
pub fn from_code(code: u32) -> Option<DomainError> {
    if code >= ERROR_CODE_OFFSET {
        let index = usize::try_from(code - ERROR_CODE_OFFSET).ok()?;
        return COUNTER_ERRORS
            .get(index)
            .map(|&(name, message)| DomainError {
                code,
                name,
                message,
            });
    }

    FRAMEWORK_ERRORS
        .iter()
        .find(|(known, _, _)| *known == code)
        .map(|&(code, name, message)| DomainError {
            code,
            name,
            message,
        })
}

/// Tag describing which branch of the taxonomy an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Storage,
    Network,
    RemoteProgram,
    Rejected,
    ConfirmationTimeout,
    Signing,
    InvalidState,
    Config,
}

/// Run-level error returned by every boundary of the client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Identity file missing, unwritable or corrupt
    #[error("identity storage error at {}: {reason}", .path.display())]
    Storage {
        path: PathBuf,
        reason: String,
    },

    /// The ledger endpoint could not be reached
    #[error("network error: {0}")]
    Network(String),

    /// The program rejected the transaction with a numeric code
    #[error("{}", program_message(.failure, .translated))]
    RemoteProgram {
        failure: RemoteFailure,
        translated: Option<DomainError>,
    },

    /// The ledger rejected the transaction without a program code
    #[error("transaction rejected: {0}")]
    TransactionRejected(RemoteFailure),

    /// Submission succeeded but confirmation did not arrive in time
    #[error("transaction {signature} was not confirmed within {waited_secs}s; its outcome is unknown")]
    ConfirmationTimeout {
        signature: String,
        waited_secs: u64,
    },

    /// A signer required by the operation was not supplied
    #[error("missing required signer {0}")]
    MissingSigner(String),

    /// An identity that the operation does not require was supplied
    #[error("unexpected signer {0}")]
    UnexpectedSigner(String),

    #[error("signing failed: {0}")]
    Signing(String),

    /// Account data does not decode as a counter
    #[error("invalid counter account {address}: {reason}")]
    InvalidAccountData {
        address: String,
        reason: String,
    },

    /// A confirmed mutation was not visible on re-query
    #[error("counter account {0} was not found after a confirmed transaction")]
    StateNotObserved(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Wrap a rejected submission, translating its code when possible
    pub fn rejected(failure: RemoteFailure) -> Self {
        match failure.code {
            Some(_) => {
                let translated = translate(&failure);
                ClientError::RemoteProgram {
                    failure,
                    translated,
                }
            }
            None => ClientError::TransactionRejected(failure),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        ClientError::Storage {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Storage { .. } => ErrorKind::Storage,
            ClientError::Network(_) => ErrorKind::Network,
            ClientError::RemoteProgram { .. } => ErrorKind::RemoteProgram,
            ClientError::TransactionRejected(_) => ErrorKind::Rejected,
            ClientError::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
            ClientError::MissingSigner(_)
            | ClientError::UnexpectedSigner(_)
            | ClientError::Signing(_) => ErrorKind::Signing,
            ClientError::InvalidAccountData { .. } | ClientError::StateNotObserved(_) => {
                ErrorKind::InvalidState
            }
            ClientError::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether the ledger definitively refused the transaction
    pub fn is_rejection(&self) -> bool {
        matches!(self.kind(), ErrorKind::RemoteProgram | ErrorKind::Rejected)
    }
}

fn program_message(failure: &RemoteFailure, translated: &Option<DomainError>) -> String {
    match translated {
        Some(error) => error.message.to_string(),
        None => failure.raw.clone(),
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
