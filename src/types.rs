//! Common types shared across modules.

use chrono::{DateTime, Utc};
use ethers::types::Address;
use ethers::utils::to_checksum;
use std::fmt;

/// The currently authorized signer, identified by its chain address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Account(pub Address);

impl Account {
    pub fn address(&self) -> Address {
        self.0
    }

    /// `0x1234…abcd` form for compact display.
    pub fn short(&self) -> String {
        let full = self.to_string();
        if full.len() <= 12 {
            return full;
        }
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}

impl From<Address> for Account {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_checksum(&self.0, None))
    }
}

/// One wave recorded on the ledger. Immutable once observed.
///
/// Equality and hashing cover all three fields, which is also the key the
/// feed deduplicates on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WaveRecord {
    pub author: Account,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl WaveRecord {
    pub fn new(author: impl Into<Account>, timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            timestamp,
            message: message.into(),
        }
    }
}
