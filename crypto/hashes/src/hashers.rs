use crate::Hash;

pub trait HasherBase {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self;
}

pub trait Hasher: HasherBase + Clone + Default {
    fn finalize(self) -> Hash;
    fn reset(&mut self);
    fn hash<A: AsRef<[u8]>>(data: A) -> Hash {
        let mut hasher = Self::default();
        hasher.update(data);
        hasher.finalize()
    }
}

/// Declares a SHA-256 backed hasher struct. The protocol digest is a plain
/// single-pass SHA-256 with no domain separation, so every declared hasher
/// shares the same function; distinct types keep call sites honest about
/// which preimage they are building.
macro_rules! sha256_hasher {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(sha2::Sha256);

        impl $name {
            #[inline(always)]
            pub fn new() -> Self {
                Self(<sha2::Sha256 as sha2::Digest>::new())
            }
        }

        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self::new()
            }
        }

        impl HasherBase for $name {
            #[inline(always)]
            fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
                sha2::Digest::update(&mut self.0, data.as_ref());
                self
            }
        }

        impl Hasher for $name {
            #[inline(always)]
            fn finalize(self) -> Hash {
                Hash::from_bytes(sha2::Digest::finalize(self.0).into())
            }

            #[inline(always)]
            fn reset(&mut self) {
                sha2::Digest::reset(&mut self.0);
            }
        }
    };
}

sha256_hasher!(
    /// Hashes the signing preimage of a transaction (header, operations, extensions)
    TransactionSigningHash
);
sha256_hasher!(
    /// Hashes the full processed-transaction record, signatures and results included
    TransactionMerkleHash
);
