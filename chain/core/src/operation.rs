use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::accounts::AccountId;
use crate::authority::Authority;
use crate::errors::tx::OperationError;
use crate::keys::PublicKey;

/// Longest permitted account name.
pub const MAX_ACCOUNT_NAME_LEN: usize = 63;

/// Moves `amount` from one account to another. The memo is opaque to the
/// chain and travels with the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOperation {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: u64,
    #[serde(with = "serde_bytes")]
    pub memo: Vec<u8>,
}

/// Registers a new account with its initial owner and active authorities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreateOperation {
    pub registrar: AccountId,
    pub name: String,
    pub owner: Authority,
    pub active: Authority,
}

/// Replaces an account's owner and/or active authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdateOperation {
    pub account: AccountId,
    pub owner: Option<Authority>,
    pub active: Option<Authority>,
}

/// Adds approvals to a pending proposal. Account approvals require the
/// corresponding account authority; key approvals are vouched for by an
/// authority supplied inline with the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalUpdateOperation {
    pub payer: AccountId,
    pub active_approvals_to_add: Vec<AccountId>,
    pub owner_approvals_to_add: Vec<AccountId>,
    pub key_approvals_to_add: Vec<PublicKey>,
}

/// The closed set of operation kinds. The wire tag of each variant is
/// authoritative; it precedes the payload in the canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Transfer(TransferOperation),
    AccountCreate(AccountCreateOperation),
    AccountUpdate(AccountUpdateOperation),
    ProposalUpdate(ProposalUpdateOperation),
}

impl Operation {
    const TRANSFER_TAG: u8 = 0;
    const ACCOUNT_CREATE_TAG: u8 = 1;
    const ACCOUNT_UPDATE_TAG: u8 = 2;
    const PROPOSAL_UPDATE_TAG: u8 = 3;

    /// Underlying wire tag of this variant
    pub fn tag(&self) -> u8 {
        match self {
            Operation::Transfer(_) => Operation::TRANSFER_TAG,
            Operation::AccountCreate(_) => Operation::ACCOUNT_CREATE_TAG,
            Operation::AccountUpdate(_) => Operation::ACCOUNT_UPDATE_TAG,
            Operation::ProposalUpdate(_) => Operation::PROPOSAL_UPDATE_TAG,
        }
    }

    /// Pure structural validation of the payload. Authority requirements are
    /// not checked here; see [`Self::get_required_authorities`].
    pub fn validate(&self) -> Result<(), OperationError> {
        match self {
            Operation::Transfer(op) => op.validate(),
            Operation::AccountCreate(op) => op.validate(),
            Operation::AccountUpdate(op) => op.validate(),
            Operation::ProposalUpdate(op) => op.validate(),
        }
    }

    /// Accumulates the accounts whose active/owner authority this operation
    /// requires, plus any authorities it supplies inline
    pub fn get_required_authorities(
        &self,
        active: &mut BTreeSet<AccountId>,
        owner: &mut BTreeSet<AccountId>,
        other: &mut Vec<Authority>,
    ) {
        match self {
            Operation::Transfer(op) => op.get_required_authorities(active, owner, other),
            Operation::AccountCreate(op) => op.get_required_authorities(active, owner, other),
            Operation::AccountUpdate(op) => op.get_required_authorities(active, owner, other),
            Operation::ProposalUpdate(op) => op.get_required_authorities(active, owner, other),
        }
    }

    /// Accumulates every account this operation touches, for downstream
    /// indexing. Not used for authorization.
    pub fn get_impacted_accounts(&self, impacted: &mut BTreeSet<AccountId>) {
        match self {
            Operation::Transfer(op) => {
                impacted.insert(op.from);
                impacted.insert(op.to);
            }
            Operation::AccountCreate(op) => {
                impacted.insert(op.registrar);
            }
            Operation::AccountUpdate(op) => {
                impacted.insert(op.account);
            }
            Operation::ProposalUpdate(op) => {
                impacted.insert(op.payer);
                impacted.extend(op.active_approvals_to_add.iter().copied());
                impacted.extend(op.owner_approvals_to_add.iter().copied());
            }
        }
    }
}

impl TransferOperation {
    fn validate(&self) -> Result<(), OperationError> {
        if self.amount == 0 {
            return Err(OperationError::ZeroTransferAmount);
        }
        if self.from == self.to {
            return Err(OperationError::SelfTransfer);
        }
        Ok(())
    }

    fn get_required_authorities(
        &self,
        active: &mut BTreeSet<AccountId>,
        _owner: &mut BTreeSet<AccountId>,
        _other: &mut Vec<Authority>,
    ) {
        active.insert(self.from);
    }
}

impl AccountCreateOperation {
    fn validate(&self) -> Result<(), OperationError> {
        if !is_valid_account_name(&self.name) {
            return Err(OperationError::InvalidAccountName(self.name.clone()));
        }
        check_authority_structure(&self.owner, "owner")?;
        check_authority_structure(&self.active, "active")
    }

    fn get_required_authorities(
        &self,
        active: &mut BTreeSet<AccountId>,
        _owner: &mut BTreeSet<AccountId>,
        _other: &mut Vec<Authority>,
    ) {
        active.insert(self.registrar);
    }
}

impl AccountUpdateOperation {
    fn validate(&self) -> Result<(), OperationError> {
        if self.owner.is_none() && self.active.is_none() {
            return Err(OperationError::EmptyAccountUpdate);
        }
        if let Some(owner) = &self.owner {
            check_authority_structure(owner, "owner")?;
        }
        if let Some(active) = &self.active {
            check_authority_structure(active, "active")?;
        }
        Ok(())
    }

    fn get_required_authorities(
        &self,
        active: &mut BTreeSet<AccountId>,
        owner: &mut BTreeSet<AccountId>,
        _other: &mut Vec<Authority>,
    ) {
        // Replacing the owner authority takes the owner authority itself
        if self.owner.is_some() {
            owner.insert(self.account);
        } else {
            active.insert(self.account);
        }
    }
}

impl ProposalUpdateOperation {
    fn validate(&self) -> Result<(), OperationError> {
        if self.active_approvals_to_add.is_empty()
            && self.owner_approvals_to_add.is_empty()
            && self.key_approvals_to_add.is_empty()
        {
            return Err(OperationError::EmptyProposalApprovals);
        }
        Ok(())
    }

    fn get_required_authorities(
        &self,
        active: &mut BTreeSet<AccountId>,
        owner: &mut BTreeSet<AccountId>,
        other: &mut Vec<Authority>,
    ) {
        active.insert(self.payer);
        active.extend(self.active_approvals_to_add.iter().copied());
        owner.extend(self.owner_approvals_to_add.iter().copied());
        if !self.key_approvals_to_add.is_empty() {
            let mut auth = Authority::new(self.key_approvals_to_add.len() as u32);
            for key in self.key_approvals_to_add.iter() {
                auth.key_auths.push((*key, 1));
            }
            other.push(auth);
        }
    }
}

/// Account names are 1-63 chars of lowercase ASCII, digits and dashes,
/// starting with a letter and not ending with a dash.
fn is_valid_account_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_ACCOUNT_NAME_LEN {
        return false;
    }
    if !bytes[0].is_ascii_lowercase() {
        return false;
    }
    if bytes[bytes.len() - 1] == b'-' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
}

fn check_authority_structure(auth: &Authority, which: &'static str) -> Result<(), OperationError> {
    let mut seen_keys = BTreeSet::new();
    for (key, weight) in auth.key_auths.iter() {
        if *weight == 0 {
            return Err(OperationError::ZeroAuthorityWeight(which));
        }
        if !seen_keys.insert(*key) {
            return Err(OperationError::DuplicateAuthorityEntry(which));
        }
    }
    let mut seen_accounts = BTreeSet::new();
    for (account, weight) in auth.account_auths.iter() {
        if *weight == 0 {
            return Err(OperationError::ZeroAuthorityWeight(which));
        }
        if !seen_accounts.insert(*account) {
            return Err(OperationError::DuplicateAuthorityEntry(which));
        }
    }
    if auth.is_impossible() {
        return Err(OperationError::ImpossibleAuthority(which));
    }
    Ok(())
}
