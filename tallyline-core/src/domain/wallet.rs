//! Wallet references on transaction legs

use serde::{Deserialize, Serialize};

/// The wallet a leg moved from/to.
///
/// Only the wallet-service tag takes part in fingerprints; the address is
/// carried for downstream transfer matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRef {
    pub wallet_service_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl WalletRef {
    pub fn new(wallet_service_tag: impl Into<String>) -> Self {
        Self {
            wallet_service_tag: wallet_service_tag.into(),
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}
