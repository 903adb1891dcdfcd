use super::HasherExtensions;
use crate::authority::Authority;
use crate::keys::CompactSignature;
use crate::operation::Operation;
use crate::tx::{Extension, OperationResult, ProcessedTransaction, Transaction, TransactionId};
use meridian_hashes::{Hash, Hasher, HasherBase, TransactionMerkleHash, TransactionSigningHash};

/// Returns the digest of the signing preimage: the header fields, operations
/// and extensions in canonical order. Every signature commits to this value.
pub fn signing_digest(tx: &Transaction) -> Hash {
    let mut hasher = TransactionSigningHash::new();
    write_transaction(&mut hasher, tx);
    hasher.finalize()
}

/// Not intended for direct use by clients. Instead use `tx.id()`
pub fn id(tx: &Transaction) -> TransactionId {
    TransactionId::from_digest(signing_digest(tx))
}

/// Returns the digest of the complete processed record, signatures and
/// operation results included. Note that this is different than the signing
/// digest.
pub fn merkle_digest(ptx: &ProcessedTransaction) -> Hash {
    let mut hasher = TransactionMerkleHash::new();
    write_transaction(&mut hasher, &ptx.tx.tx);
    write_signatures(&mut hasher, &ptx.tx.signatures);
    write_results(&mut hasher, &ptx.operation_results);
    hasher.finalize()
}

/// Write the transaction signing preimage into the provided hasher
fn write_transaction<T: HasherBase>(hasher: &mut T, tx: &Transaction) {
    hasher.write_u16(tx.ref_block_num).write_u32(tx.ref_block_prefix).write_u32(tx.expiration);

    hasher.write_len(tx.operations.len());
    for op in tx.operations.iter() {
        write_operation(hasher, op);
    }

    hasher.write_len(tx.extensions.len());
    for extension in tx.extensions.iter() {
        write_extension(hasher, extension);
    }
}

/// Write the operation variant tag followed by its payload
fn write_operation<T: HasherBase>(hasher: &mut T, op: &Operation) {
    hasher.write_varint(op.tag() as u64);
    match op {
        Operation::Transfer(transfer) => {
            hasher.update(transfer.from).update(transfer.to).write_u64(transfer.amount).write_var_bytes(&transfer.memo);
        }
        Operation::AccountCreate(create) => {
            hasher.update(create.registrar).write_var_bytes(create.name.as_bytes());
            write_authority(hasher, &create.owner);
            write_authority(hasher, &create.active);
        }
        Operation::AccountUpdate(update) => {
            hasher.update(update.account);
            write_optional_authority(hasher, update.owner.as_ref());
            write_optional_authority(hasher, update.active.as_ref());
        }
        Operation::ProposalUpdate(proposal) => {
            hasher.update(proposal.payer);
            hasher.write_len(proposal.active_approvals_to_add.len());
            for account in proposal.active_approvals_to_add.iter() {
                hasher.update(account);
            }
            hasher.write_len(proposal.owner_approvals_to_add.len());
            for account in proposal.owner_approvals_to_add.iter() {
                hasher.update(account);
            }
            hasher.write_len(proposal.key_approvals_to_add.len());
            for key in proposal.key_approvals_to_add.iter() {
                hasher.update(key.serialize());
            }
        }
    }
}

#[inline(always)]
fn write_authority<T: HasherBase>(hasher: &mut T, auth: &Authority) {
    hasher.write_u32(auth.weight_threshold).write_len(auth.key_auths.len());
    for (key, weight) in auth.key_auths.iter() {
        hasher.update(key.serialize()).write_u16(*weight);
    }
    hasher.write_len(auth.account_auths.len());
    for (account, weight) in auth.account_auths.iter() {
        hasher.update(account).write_u16(*weight);
    }
}

#[inline(always)]
fn write_optional_authority<T: HasherBase>(hasher: &mut T, auth: Option<&Authority>) {
    match auth {
        Some(auth) => {
            hasher.write_bool(true);
            write_authority(hasher, auth);
        }
        None => {
            hasher.write_bool(false);
        }
    }
}

#[inline(always)]
fn write_extension<T: HasherBase>(hasher: &mut T, extension: &Extension) {
    hasher.write_u8(extension.tag).write_var_bytes(&extension.data);
}

fn write_signatures<T: HasherBase>(hasher: &mut T, signatures: &[CompactSignature]) {
    hasher.write_len(signatures.len());
    for signature in signatures.iter() {
        hasher.update(signature);
    }
}

fn write_results<T: HasherBase>(hasher: &mut T, results: &[OperationResult]) {
    hasher.write_len(results.len());
    for result in results.iter() {
        match result {
            OperationResult::Void => {
                hasher.write_varint(0);
            }
            OperationResult::AccountCreated(account) => {
                hasher.write_varint(1);
                hasher.update(account);
            }
        }
    }
}

struct PreimageHasher {
    buff: Vec<u8>,
}

impl HasherBase for PreimageHasher {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.buff.extend_from_slice(data.as_ref());
        self
    }
}

/// Serializes the signing preimage without hashing it, for wire reproduction
pub fn signing_preimage(tx: &Transaction) -> Vec<u8> {
    let mut hasher = PreimageHasher { buff: Vec::new() };
    write_transaction(&mut hasher, tx);
    hasher.buff
}
