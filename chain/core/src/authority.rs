use serde::{Deserialize, Serialize};

use crate::accounts::AccountId;
use crate::keys::PublicKey;

/// Weight contributed by a single key or account entry of an authority.
pub type AuthWeight = u16;

/// A weighted-threshold predicate over keys and accounts. The authority is
/// satisfied once the weights of present contributors reach the threshold:
/// keys contribute when their signature is present or producible, accounts
/// when their own active authority is satisfied, transitively.
///
/// Entries are consulted in declared order, keys before accounts. A zero
/// threshold is legal and trivially satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authority {
    pub weight_threshold: u32,
    pub key_auths: Vec<(PublicKey, AuthWeight)>,
    pub account_auths: Vec<(AccountId, AuthWeight)>,
}

impl Authority {
    pub fn new(weight_threshold: u32) -> Self {
        Self { weight_threshold, key_auths: Vec::new(), account_auths: Vec::new() }
    }

    /// A threshold-one authority satisfied by the single given key
    pub fn from_key(key: PublicKey) -> Self {
        Self::new(1).with_key_auth(key, 1)
    }

    pub fn with_key_auth(mut self, key: PublicKey, weight: AuthWeight) -> Self {
        self.key_auths.push((key, weight));
        self
    }

    pub fn with_account_auth(mut self, account: AccountId, weight: AuthWeight) -> Self {
        self.account_auths.push((account, weight));
        self
    }

    pub fn num_auths(&self) -> usize {
        self.key_auths.len() + self.account_auths.len()
    }

    /// Combined weight of every listed entry
    pub fn total_weight(&self) -> u64 {
        self.key_auths.iter().map(|(_, weight)| *weight as u64).sum::<u64>()
            + self.account_auths.iter().map(|(_, weight)| *weight as u64).sum::<u64>()
    }

    /// True when the threshold cannot be reached even with every listed key
    /// and account contributing
    pub fn is_impossible(&self) -> bool {
        (self.weight_threshold as u64) > self.total_weight()
    }
}
