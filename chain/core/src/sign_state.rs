use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use crate::accounts::{AccountId, COMMITTEE_ACCOUNT, TEMP_ACCOUNT};
use crate::authority::Authority;
use crate::constants::MAX_SIGNATURE_CHECK_DEPTH;
use crate::errors::tx::{AuthorityError, AuthorityResult};
use crate::keys::PublicKey;
use crate::operation::Operation;

/// Read-only account-authority lookup supplied by the enclosing system. An
/// absent result is treated as an unsatisfiable authority.
pub type AuthorityLookup<'a> = dyn Fn(AccountId) -> Option<&'a Authority> + 'a;

/// Transient state of a single authority-verification call: the recovered
/// signer keys with their used flags, the accounts already shown satisfied,
/// and the recursion bound. Constructed fresh per call, never shared.
pub struct SignState<'a> {
    get_active: &'a AuthorityLookup<'a>,
    available_keys: BTreeSet<PublicKey>,
    pub provided_signatures: BTreeMap<PublicKey, bool>,
    pub approved_by: BTreeSet<AccountId>,
    pub max_recursion: u32,
}

impl<'a> SignState<'a> {
    pub fn new(signature_keys: &BTreeSet<PublicKey>, get_active: &'a AuthorityLookup<'a>, available_keys: BTreeSet<PublicKey>) -> Self {
        let provided_signatures = signature_keys.iter().map(|key| (*key, false)).collect();
        let mut approved_by = BTreeSet::new();
        approved_by.insert(TEMP_ACCOUNT);
        Self { get_active, available_keys, provided_signatures, approved_by, max_recursion: MAX_SIGNATURE_CHECK_DEPTH }
    }

    /// Returns true if we have a signature for this key or can produce a
    /// signature for this key, else returns false. Any true return marks the
    /// key used; this is the sole path by which a key becomes used.
    pub fn signed_by(&mut self, key: &PublicKey) -> bool {
        match self.provided_signatures.get_mut(key) {
            Some(used) => {
                *used = true;
                true
            }
            None => {
                if self.available_keys.contains(key) {
                    self.provided_signatures.insert(*key, true);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Checks whether the signatures seen so far satisfy the authority. Key
    /// entries are consulted before account entries, each group in declared
    /// order; an account entry that would recurse past `max_recursion` is
    /// skipped.
    pub fn check_authority(&mut self, authority: Option<&Authority>, depth: u32) -> bool {
        let Some(auth) = authority else {
            return false;
        };

        let mut total_weight: u32 = 0;
        for (key, weight) in auth.key_auths.iter() {
            if self.signed_by(key) {
                total_weight += *weight as u32;
                if total_weight >= auth.weight_threshold {
                    return true;
                }
            }
        }

        for (account, weight) in auth.account_auths.iter() {
            if self.approved_by.contains(account) {
                total_weight += *weight as u32;
                if total_weight >= auth.weight_threshold {
                    return true;
                }
            } else if depth == self.max_recursion {
                continue;
            } else {
                let account_active = (self.get_active)(*account);
                if self.check_authority(account_active, depth + 1) {
                    self.approved_by.insert(*account);
                    total_weight += *weight as u32;
                    if total_weight >= auth.weight_threshold {
                        return true;
                    }
                }
            }
        }
        total_weight >= auth.weight_threshold
    }

    /// Whether the account's active authority is satisfied, short-circuiting
    /// on accounts already approved within this call
    pub fn check_account_authority(&mut self, account: AccountId) -> bool {
        if self.approved_by.contains(&account) {
            return true;
        }
        let account_active = (self.get_active)(account);
        self.check_authority(account_active, 0)
    }

    /// Erases every provided signature whose used flag is still clear;
    /// returns whether at least one was erased
    pub fn remove_unused_signatures(&mut self) -> bool {
        let count_before = self.provided_signatures.len();
        self.provided_signatures.retain(|_, used| *used);
        self.provided_signatures.len() != count_before
    }
}

/// Checks that `signature_keys` satisfies every authority required by the
/// operations: the inline authorities they supply, then the active
/// authorities (owner always accepted in place of active), then the owner
/// authorities. Every provided key must end up contributing, otherwise the
/// call fails with `UnnecessarySignatures`.
#[allow(clippy::too_many_arguments)]
pub fn verify_authority<'a>(
    operations: &[Operation],
    signature_keys: &BTreeSet<PublicKey>,
    get_active: &'a AuthorityLookup<'a>,
    get_owner: &'a AuthorityLookup<'a>,
    max_recursion: u32,
    allow_committee: bool,
    active_approvals: &BTreeSet<AccountId>,
    owner_approvals: &BTreeSet<AccountId>,
) -> AuthorityResult<()> {
    let mut required_active = BTreeSet::new();
    let mut required_owner = BTreeSet::new();
    let mut other = Vec::new();
    for op in operations.iter() {
        op.get_required_authorities(&mut required_active, &mut required_owner, &mut other);
    }
    trace!(
        "verifying authority over {} operations: {} active, {} owner, {} inline, {} signer keys",
        operations.len(),
        required_active.len(),
        required_owner.len(),
        other.len(),
        signature_keys.len()
    );

    if !allow_committee && required_active.contains(&COMMITTEE_ACCOUNT) {
        return Err(AuthorityError::InvalidCommitteeApproval);
    }

    let mut state = SignState::new(signature_keys, get_active, BTreeSet::new());
    state.max_recursion = max_recursion;
    state.approved_by.extend(active_approvals.iter().copied());
    state.approved_by.extend(owner_approvals.iter().copied());

    for (i, auth) in other.iter().enumerate() {
        if !state.check_authority(Some(auth), 0) {
            return Err(AuthorityError::MissingOtherAuthority(i));
        }
    }

    for account in required_active.iter() {
        if !state.check_account_authority(*account) && !state.check_authority(get_owner(*account), 0) {
            return Err(AuthorityError::MissingActiveAuthority(*account));
        }
    }

    for account in required_owner.iter() {
        if !owner_approvals.contains(account) && !state.check_authority(get_owner(*account), 0) {
            return Err(AuthorityError::MissingOwnerAuthority(*account));
        }
    }

    if state.remove_unused_signatures() {
        return Err(AuthorityError::UnnecessarySignatures);
    }
    Ok(())
}
