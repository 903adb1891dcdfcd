use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::{self, FromStr};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::accounts::AccountId;
use crate::authority::Authority;
use crate::errors::tx::{AuthorityError, AuthorityResult, TxResult, TxRuleError};
use crate::hashing;
use crate::keys::{self, CompactSignature, PublicKey, SecretKey};
use crate::operation::Operation;
use crate::sign_state::{self, AuthorityLookup, SignState};
use crate::BlockId;
use meridian_hashes::Hash;

/// The size of the array used to store transaction identifiers: the leading
/// 160 bits of the transaction digest.
pub const TRANSACTION_ID_SIZE: usize = 20;

/// The ID of a Meridian transaction. Unlike the digest it is derived from,
/// trailing digest bytes are discarded.
#[derive(
    Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct TransactionId([u8; TRANSACTION_ID_SIZE]);

impl TransactionId {
    pub const fn from_bytes(bytes: [u8; TRANSACTION_ID_SIZE]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(self) -> [u8; TRANSACTION_ID_SIZE] {
        self.0
    }

    /// Copies the leading digest bytes; the rest of the digest is discarded
    pub fn from_digest(digest: Hash) -> Self {
        let mut bytes = [0u8; TRANSACTION_ID_SIZE];
        bytes.copy_from_slice(&digest.as_bytes()[..TRANSACTION_ID_SIZE]);
        Self(bytes)
    }
}

impl AsRef<[u8]> for TransactionId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut hex = [0u8; TRANSACTION_ID_SIZE * 2];
        faster_hex::hex_encode(&self.0, &mut hex).map_err(|_| std::fmt::Error)?;
        f.write_str(str::from_utf8(&hex).expect("hex is always valid UTF-8"))
    }
}

impl FromStr for TransactionId {
    type Err = faster_hex::Error;

    fn from_str(hex_str: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; TRANSACTION_ID_SIZE];
        faster_hex::hex_decode(hex_str.as_bytes(), &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// An opaque tagged extension slot. Extensions are part of the canonical
/// encoding but the core never interprets them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Extension {
    pub tag: u8,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// The result an operation produced when it was applied. Application happens
/// outside this core; results participate only in the processed-transaction
/// digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationResult {
    Void,
    AccountCreated(AccountId),
}

/// A Meridian transaction: the reference-block binding, an expiration
/// timestamp and an ordered list of operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    /// Absolute wall-clock expiration in seconds. The core carries the field;
    /// expiration policy is enforced by the chain engine.
    pub expiration: u32,
    pub operations: Vec<Operation>,
    pub extensions: Vec<Extension>,
}

impl Transaction {
    pub fn new(
        ref_block_num: u16,
        ref_block_prefix: u32,
        expiration: u32,
        operations: Vec<Operation>,
        extensions: Vec<Extension>,
    ) -> Self {
        Self { ref_block_num, ref_block_prefix, expiration, operations, extensions }
    }

    /// Digest of the signing preimage. Every signature commits to this value.
    pub fn digest(&self) -> Hash {
        hashing::tx::signing_digest(self)
    }

    /// Returns the transaction ID
    pub fn id(&self) -> TransactionId {
        hashing::tx::id(self)
    }

    /// Runs the structural validation hook of every operation in order,
    /// failing on the first invalid one
    pub fn validate(&self) -> TxResult<()> {
        for (i, op) in self.operations.iter().enumerate() {
            op.validate().map_err(|err| TxRuleError::InvalidOperation(i, err))?;
        }
        Ok(())
    }

    pub fn set_expiration(&mut self, expiration: u32) {
        self.expiration = expiration;
    }

    /// Binds the transaction to a recent block. The block number is embedded
    /// big-endian in the leading word of the id; the prefix is the second
    /// word, forced to zero whenever the derived number is zero.
    pub fn set_reference_block(&mut self, reference_block: BlockId) {
        let mut words = reference_block.iter_u32_le();
        let leading = words.next().expect("a block id contains eight 32-bit words");
        let second = words.next().expect("a block id contains eight 32-bit words");
        self.ref_block_num = leading.swap_bytes() as u16;
        self.ref_block_prefix = if self.ref_block_num == 0 { 0 } else { second };
    }

    /// Accumulates the authority requirements of every operation
    pub fn get_required_authorities(
        &self,
        active: &mut BTreeSet<AccountId>,
        owner: &mut BTreeSet<AccountId>,
        other: &mut Vec<Authority>,
    ) {
        for op in self.operations.iter() {
            op.get_required_authorities(active, owner, other);
        }
    }

    /// Accumulates the accounts touched by every operation
    pub fn get_impacted_accounts(&self, impacted: &mut BTreeSet<AccountId>) {
        for op in self.operations.iter() {
            op.get_impacted_accounts(impacted);
        }
    }
}

/// A transaction plus the compact recoverable signatures produced over its
/// digest. Signature order is preserved for wire reproducibility; the
/// authority engine treats them as a set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    pub tx: Transaction,
    pub signatures: Vec<CompactSignature>,
}

impl SignedTransaction {
    pub fn new(tx: Transaction) -> Self {
        Self { tx, signatures: Vec::new() }
    }

    /// Signs the transaction digest and appends the signature
    pub fn sign(&mut self, secret_key: &SecretKey) -> &CompactSignature {
        let digest = self.tx.digest();
        self.signatures.push(keys::sign_compact(secret_key, digest));
        self.signatures.last().expect("a signature was just appended")
    }

    /// Recovers the signer key of every signature into a set. Two signatures
    /// recovering to the same key is a validation error.
    pub fn get_signature_keys(&self) -> AuthorityResult<BTreeSet<PublicKey>> {
        let digest = self.tx.digest();
        let mut signature_keys = BTreeSet::new();
        for signature in self.signatures.iter() {
            let key = keys::recover_compact(signature, digest)?;
            if !signature_keys.insert(key) {
                return Err(AuthorityError::DuplicateSignature(key));
            }
        }
        Ok(signature_keys)
    }

    /// Checks that the recovered signatures satisfy every authority the
    /// operations require, with no pre-approvals and committee proposals
    /// disallowed
    pub fn verify_authority<'a>(
        &self,
        get_active: &'a AuthorityLookup<'a>,
        get_owner: &'a AuthorityLookup<'a>,
        max_recursion: u32,
    ) -> AuthorityResult<()> {
        sign_state::verify_authority(
            &self.tx.operations,
            &self.get_signature_keys()?,
            get_active,
            get_owner,
            max_recursion,
            false,
            &BTreeSet::new(),
            &BTreeSet::new(),
        )
    }

    /// Suggests keys from `available_keys` sufficient to authorize the
    /// transaction on top of the signatures already present. The suggestion
    /// names enough keys but may name more than necessary; see
    /// [`Self::minimize_required_signatures`].
    pub fn get_required_signatures<'a>(
        &self,
        available_keys: &BTreeSet<PublicKey>,
        get_active: &'a AuthorityLookup<'a>,
        get_owner: &'a AuthorityLookup<'a>,
        max_recursion: u32,
    ) -> AuthorityResult<BTreeSet<PublicKey>> {
        let mut required_active = BTreeSet::new();
        let mut required_owner = BTreeSet::new();
        let mut other = Vec::new();
        self.tx.get_required_authorities(&mut required_active, &mut required_owner, &mut other);

        let mut state = SignState::new(&self.get_signature_keys()?, get_active, available_keys.clone());
        state.max_recursion = max_recursion;

        for auth in other.iter() {
            state.check_authority(Some(auth), 0);
        }
        for account in required_owner.iter() {
            state.check_authority(get_owner(*account), 0);
        }
        for account in required_active.iter() {
            state.check_account_authority(*account);
        }
        state.remove_unused_signatures();

        Ok(state.provided_signatures.keys().filter(|key| available_keys.contains(key)).copied().collect())
    }

    /// Greedily drops keys whose signatures the required authorities can do
    /// without. The result is minimal (no single further key can be removed),
    /// not necessarily minimum, and is deterministic in the iteration order
    /// of the starting set.
    pub fn minimize_required_signatures<'a>(
        &self,
        available_keys: &BTreeSet<PublicKey>,
        get_active: &'a AuthorityLookup<'a>,
        get_owner: &'a AuthorityLookup<'a>,
        max_recursion: u32,
    ) -> AuthorityResult<BTreeSet<PublicKey>> {
        let candidates = self.get_required_signatures(available_keys, get_active, get_owner, max_recursion)?;
        let mut result = candidates.clone();

        for key in candidates.iter() {
            result.remove(key);
            match sign_state::verify_authority(
                &self.tx.operations,
                &result,
                get_active,
                get_owner,
                max_recursion,
                false,
                &BTreeSet::new(),
                &BTreeSet::new(),
            ) {
                // The key stays removed
                Ok(()) => {}
                Err(AuthorityError::MissingActiveAuthority(_))
                | Err(AuthorityError::MissingOwnerAuthority(_))
                | Err(AuthorityError::MissingOtherAuthority(_)) => {
                    result.insert(*key);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(result)
    }
}

/// A signed transaction plus the per-operation results its application
/// produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedTransaction {
    pub tx: SignedTransaction,
    pub operation_results: Vec<OperationResult>,
}

impl ProcessedTransaction {
    pub fn new(tx: SignedTransaction, operation_results: Vec<OperationResult>) -> Self {
        Self { tx, operation_results }
    }

    /// Digest of the complete record including signatures and results, as
    /// hashed into block merkle trees
    pub fn merkle_digest(&self) -> Hash {
        hashing::tx::merkle_digest(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::tx::OperationError;
    use crate::operation::TransferOperation;
    use secp256k1::SECP256K1;

    fn account(n: u8) -> AccountId {
        AccountId::from_byte(n)
    }

    fn keypair(seed: u8) -> (SecretKey, PublicKey) {
        let secret = SecretKey::from_slice(&[seed; 32]).unwrap();
        let public = PublicKey::from_secret_key(SECP256K1, &secret);
        (secret, public)
    }

    fn transfer(amount: u64) -> Operation {
        Operation::Transfer(TransferOperation { from: account(10), to: account(11), amount, memo: vec![] })
    }

    #[test]
    fn test_set_reference_block() {
        let mut id_bytes = [0u8; 32];
        id_bytes[..8].copy_from_slice(&[0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0]);
        let block_id = BlockId::from_bytes(id_bytes);

        let mut tx = Transaction::default();
        tx.set_reference_block(block_id);
        // Leading word 0x78563412 byte-swapped is 0x12345678; low 16 bits remain
        assert_eq!(tx.ref_block_num, 0x5678);
        assert_eq!(tx.ref_block_prefix, 0xf0debc9a);
    }

    #[test]
    fn test_set_reference_block_zero_num_zeroes_prefix() {
        // The leading word byte-swaps to 0x00003412: truncated block num 0
        let mut id_bytes = [0u8; 32];
        id_bytes[..8].copy_from_slice(&[0x12, 0x34, 0x00, 0x00, 0x9a, 0xbc, 0xde, 0xf0]);

        let mut tx = Transaction::default();
        tx.ref_block_prefix = 77;
        tx.set_reference_block(BlockId::from_bytes(id_bytes));
        assert_eq!(tx.ref_block_num, 0);
        assert_eq!(tx.ref_block_prefix, 0);
    }

    #[test]
    fn test_set_expiration() {
        let mut tx = Transaction::default();
        tx.set_expiration(1650000000);
        assert_eq!(tx.expiration, 1650000000);
    }

    #[test]
    fn test_validate_reports_offending_operation() {
        let tx = Transaction::new(0, 0, 0, vec![transfer(1), transfer(0)], vec![]);
        assert_eq!(tx.validate(), Err(TxRuleError::InvalidOperation(1, OperationError::ZeroTransferAmount)));

        Transaction::new(0, 0, 0, vec![transfer(1)], vec![]).validate().unwrap();
    }

    #[test]
    fn test_sign_appends_and_recovers() {
        let (secret, public) = keypair(3);
        let mut stx = SignedTransaction::new(Transaction::new(0, 0, 0, vec![transfer(5)], vec![]));
        stx.sign(&secret);
        assert_eq!(stx.signatures.len(), 1);

        let recovered = stx.get_signature_keys().unwrap();
        assert_eq!(recovered.into_iter().collect::<Vec<_>>(), vec![public]);
    }

    #[test]
    fn test_signatures_bind_the_digest() {
        let (secret, public) = keypair(3);
        let mut stx = SignedTransaction::new(Transaction::new(0, 0, 0, vec![transfer(5)], vec![]));
        stx.sign(&secret);

        // Mutating the transaction after signing recovers a different key
        stx.tx.expiration += 1;
        match stx.get_signature_keys() {
            Ok(recovered) => assert!(!recovered.contains(&public)),
            Err(AuthorityError::InvalidSignature(_)) => {}
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    #[test]
    fn test_duplicate_signature_detected() {
        let (secret, public) = keypair(3);
        let mut stx = SignedTransaction::new(Transaction::new(0, 0, 0, vec![transfer(5)], vec![]));
        stx.sign(&secret);
        stx.sign(&secret);
        assert_eq!(stx.get_signature_keys(), Err(AuthorityError::DuplicateSignature(public)));
    }

    #[test]
    fn test_authority_and_impact_accumulation() {
        let second = Operation::Transfer(TransferOperation { from: account(12), to: account(13), amount: 2, memo: vec![] });
        let tx = Transaction::new(0, 0, 0, vec![transfer(1), second], vec![]);

        let (mut active, mut owner, mut other) = (BTreeSet::new(), BTreeSet::new(), Vec::new());
        tx.get_required_authorities(&mut active, &mut owner, &mut other);
        assert_eq!(active.into_iter().collect::<Vec<_>>(), vec![account(10), account(12)]);
        assert!(owner.is_empty() && other.is_empty());

        let mut impacted = BTreeSet::new();
        tx.get_impacted_accounts(&mut impacted);
        assert_eq!(impacted.into_iter().collect::<Vec<_>>(), vec![account(10), account(11), account(12), account(13)]);
    }

    #[test]
    fn test_transaction_id_hex_round_trip() {
        let tx = Transaction::new(1, 2, 3, vec![transfer(5)], vec![]);
        let id = tx.id();
        assert_eq!(id.to_string().parse::<TransactionId>().unwrap(), id);
    }

    #[test]
    fn test_transaction_serde_json_round_trip() {
        let (secret, _) = keypair(3);
        let mut stx = SignedTransaction::new(Transaction::new(7, 8, 9, vec![transfer(5)], vec![Extension { tag: 1, data: vec![2] }]));
        stx.sign(&secret);

        let json = serde_json::to_string(&stx).unwrap();
        let back: SignedTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stx);
        assert_eq!(back.tx.digest(), stx.tx.digest());
    }
}
