use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::{self, FromStr};

/// The size of the array used to store account identifiers.
pub const ACCOUNT_ID_SIZE: usize = 20;

/// The domain representation of an account identifier. The core treats it as
/// an opaque value; the enclosing system assigns ids and resolves them to
/// authority records.
#[derive(
    Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct AccountId([u8; ACCOUNT_ID_SIZE]);

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AccountId {
    pub const fn from_byte(b: u8) -> AccountId {
        let mut bytes = [0u8; ACCOUNT_ID_SIZE];
        bytes[0] = b;
        AccountId(bytes)
    }

    pub const fn from_bytes(bytes: [u8; ACCOUNT_ID_SIZE]) -> AccountId {
        AccountId(bytes)
    }

    pub const fn as_bytes(self) -> [u8; ACCOUNT_ID_SIZE] {
        self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut hex = [0u8; ACCOUNT_ID_SIZE * 2];
        faster_hex::hex_encode(&self.0, &mut hex).map_err(|_| std::fmt::Error)?;
        f.write_str(str::from_utf8(&hex).expect("hex is always valid UTF-8"))
    }
}

impl FromStr for AccountId {
    type Err = faster_hex::Error;

    #[inline]
    fn from_str(str: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; ACCOUNT_ID_SIZE];
        faster_hex::hex_decode(str.as_bytes(), &mut bytes)?;
        Ok(AccountId(bytes))
    }
}

/// The account through which the chain's committee acts. It may appear as a
/// required active authority only when the caller allows committee proposals.
pub const COMMITTEE_ACCOUNT: AccountId = AccountId::from_byte(0);

/// The anonymous staging account. Its authority is treated as satisfied in
/// every verification call.
pub const TEMP_ACCOUNT: AccountId = AccountId::from_byte(1);
