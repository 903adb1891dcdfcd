use borsh::{BorshDeserialize, BorshSerialize};
use meridian_hashes::Hash;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, SECP256K1};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::{self, FromStr};

pub use secp256k1::{PublicKey, SecretKey};

/// Size of a compact recoverable signature: one recovery header byte followed
/// by the 64-byte compact ECDSA signature.
pub const COMPACT_SIGNATURE_SIZE: usize = 65;

// Recovery header convention: 27 marks a recoverable signature, plus 4 for a
// compressed public key, plus the 2-bit recovery id.
const RECOVERY_HEADER_BASE: u8 = 27 + 4;

/// A compact ECDSA signature from which the signing public key can be
/// recovered given the 256-bit message digest it was produced over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct CompactSignature([u8; COMPACT_SIGNATURE_SIZE]);

impl CompactSignature {
    pub const fn from_bytes(bytes: [u8; COMPACT_SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; COMPACT_SIGNATURE_SIZE] {
        &self.0
    }
}

impl AsRef<[u8]> for CompactSignature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for CompactSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut hex = [0u8; COMPACT_SIGNATURE_SIZE * 2];
        faster_hex::hex_encode(&self.0, &mut hex).map_err(|_| std::fmt::Error)?;
        f.write_str(str::from_utf8(&hex).expect("hex is always valid UTF-8"))
    }
}

impl FromStr for CompactSignature {
    type Err = faster_hex::Error;

    fn from_str(hex_str: &str) -> Result<Self, Self::Err> {
        if hex_str.len() != COMPACT_SIGNATURE_SIZE * 2 {
            return Err(faster_hex::Error::InvalidLength(hex_str.len()));
        }
        let mut bytes = [0u8; COMPACT_SIGNATURE_SIZE];
        faster_hex::hex_decode(hex_str.as_bytes(), &mut bytes)?;
        Ok(Self(bytes))
    }
}

//
// Serde serializers are manually implemented for `CompactSignature` since
// serde does not derive for arrays past 32 elements
//

impl Serialize for CompactSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for CompactSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = <&str as Deserialize>::deserialize(deserializer)?;
            FromStr::from_str(s).map_err(serde::de::Error::custom)
        } else {
            let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
            <[u8; COMPACT_SIGNATURE_SIZE]>::try_from(bytes.as_ref())
                .map(Self)
                .map_err(|_| serde::de::Error::invalid_length(bytes.len(), &"a 65-byte compact signature"))
        }
    }
}

/// Produces a compact recoverable signature of `digest` under `secret_key`
pub fn sign_compact(secret_key: &SecretKey, digest: Hash) -> CompactSignature {
    let message = Message::from_slice(digest.as_bytes().as_slice()).expect("the digest is exactly 32 bytes");
    let (recovery_id, serialized) = SECP256K1.sign_ecdsa_recoverable(&message, secret_key).serialize_compact();
    let mut bytes = [0u8; COMPACT_SIGNATURE_SIZE];
    bytes[0] = RECOVERY_HEADER_BASE + recovery_id.to_i32() as u8;
    bytes[1..].copy_from_slice(&serialized);
    CompactSignature(bytes)
}

/// Recovers the public key that produced `signature` over `digest`
pub fn recover_compact(signature: &CompactSignature, digest: Hash) -> Result<PublicKey, secp256k1::Error> {
    let message = Message::from_slice(digest.as_bytes().as_slice()).expect("the digest is exactly 32 bytes");
    let header = signature.0[0].checked_sub(RECOVERY_HEADER_BASE).ok_or(secp256k1::Error::InvalidRecoveryId)?;
    let recovery_id = RecoveryId::from_i32(header as i32)?;
    let recoverable = RecoverableSignature::from_compact(&signature.0[1..], recovery_id)?;
    SECP256K1.recover_ecdsa(&message, &recoverable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair(seed: u8) -> (SecretKey, PublicKey) {
        let secret = SecretKey::from_slice(&[seed; 32]).unwrap();
        let public = PublicKey::from_secret_key(SECP256K1, &secret);
        (secret, public)
    }

    #[test]
    fn test_sign_recover_round_trip() {
        let (secret, public) = keypair(42);
        let digest = Hash::from_u64(0xfeed);
        let signature = sign_compact(&secret, digest);
        assert_eq!(recover_compact(&signature, digest).unwrap(), public);
    }

    #[test]
    fn test_recovery_is_digest_bound() {
        let (secret, public) = keypair(42);
        let signature = sign_compact(&secret, Hash::from_u64(1));
        // Recovery against a different digest yields some key, but not ours
        match recover_compact(&signature, Hash::from_u64(2)) {
            Ok(other) => assert_ne!(other, public),
            Err(_) => {}
        }
    }

    #[test]
    fn test_malformed_header_rejected() {
        let (secret, _) = keypair(7);
        let mut bytes = *sign_compact(&secret, Hash::from_u64(5)).as_bytes();
        bytes[0] = 0;
        assert!(recover_compact(&CompactSignature::from_bytes(bytes), Hash::from_u64(5)).is_err());
        bytes[0] = RECOVERY_HEADER_BASE + 4;
        assert!(recover_compact(&CompactSignature::from_bytes(bytes), Hash::from_u64(5)).is_err());
    }

    #[test]
    fn test_signature_hex_round_trip() {
        let (secret, _) = keypair(9);
        let signature = sign_compact(&secret, Hash::from_u64(11));
        let hex = signature.to_string();
        assert_eq!(hex.len(), COMPACT_SIGNATURE_SIZE * 2);
        assert_eq!(CompactSignature::from_str(&hex).unwrap(), signature);
    }

    #[test]
    fn test_signature_serde_json() {
        let (secret, _) = keypair(13);
        let signature = sign_compact(&secret, Hash::from_u64(17));
        let json = serde_json::to_string(&signature).unwrap();
        assert_eq!(json, format!("\"{}\"", signature));
        assert_eq!(serde_json::from_str::<CompactSignature>(&json).unwrap(), signature);
    }
}
