use thiserror::Error;

use crate::accounts::AccountId;
use crate::keys::PublicKey;

/// Failures of signature recovery and authority verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    #[error("committee account may only propose transactions")]
    InvalidCommitteeApproval,

    #[error("missing required active authority of account {0}")]
    MissingActiveAuthority(AccountId),

    #[error("missing required owner authority of account {0}")]
    MissingOwnerAuthority(AccountId),

    #[error("missing required operation-supplied authority #{0}")]
    MissingOtherAuthority(usize),

    #[error("duplicate signature detected for key {0}")]
    DuplicateSignature(PublicKey),

    #[error("unnecessary signatures detected")]
    UnnecessarySignatures,

    #[error("signature recovery failed: {0}")]
    InvalidSignature(#[from] secp256k1::Error),
}

pub type AuthorityResult<T> = std::result::Result<T, AuthorityError>;

/// Structural failures reported by the per-operation validation hook
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("transfer amount must be positive")]
    ZeroTransferAmount,

    #[error("transfer sender and receiver must differ")]
    SelfTransfer,

    #[error("invalid account name {0:?}")]
    InvalidAccountName(String),

    #[error("account update changes neither authority")]
    EmptyAccountUpdate,

    #[error("proposal update carries no approvals")]
    EmptyProposalApprovals,

    #[error("{0} authority entry has zero weight")]
    ZeroAuthorityWeight(&'static str),

    #[error("{0} authority lists a duplicate entry")]
    DuplicateAuthorityEntry(&'static str),

    #[error("{0} authority threshold exceeds the total available weight")]
    ImpossibleAuthority(&'static str),
}

/// Transaction-level validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxRuleError {
    #[error("operation {0} is invalid: {1}")]
    InvalidOperation(usize, OperationError),
}

pub type TxResult<T> = std::result::Result<T, TxRuleError>;
