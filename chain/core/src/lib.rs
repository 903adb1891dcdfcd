pub mod accounts;
pub mod authority;
pub mod constants;
pub mod errors;
pub mod hashing;
pub mod keys;
pub mod operation;
pub mod sign_state;
pub mod tx;

/// Block identifiers share the digest representation
pub type BlockId = meridian_hashes::Hash;
