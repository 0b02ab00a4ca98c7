//! Currency descriptors
//!
//! A currency is either a bare ticker symbol or a structured token descriptor
//! (blockchain, contract address, NFT id). Descriptors can only be created
//! through [`CurrencyDescriptor::symbol`] or [`CurrencyBuilder`], so every
//! currency that reaches a transaction has been validated exactly once.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use super::result::{Error, Result};

/// ISO 4217 codes treated as fiat when no blockchain is attached
pub const FIAT_SYMBOLS: &[&str] = &[
    "AED", "ARS", "AUD", "BGN", "BRL", "CAD", "CHF", "CLP", "CNY", "COP", "CZK", "DKK", "EUR",
    "GBP", "HKD", "HUF", "IDR", "ILS", "INR", "ISK", "JPY", "KES", "KRW", "MXN", "MYR", "NGN",
    "NOK", "NZD", "PHP", "PKR", "PLN", "RON", "RUB", "SAR", "SEK", "SGD", "THB", "TRY", "TWD",
    "UAH", "USD", "VND", "ZAR",
];

/// A validated currency: bare symbol or structured token
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CurrencyDescriptor {
    Symbol(SymbolCurrency),
    Structured(TokenCurrency),
}

/// Bare ticker symbol, serialized as a plain string
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct SymbolCurrency {
    symbol: String,
}

/// Token identified by chain and contract
#[derive(Debug, Clone, Serialize)]
pub struct TokenCurrency {
    symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    blockchain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nft_token: Option<String>,
}

impl CurrencyDescriptor {
    /// Build a bare-symbol currency
    pub fn symbol(symbol: impl AsRef<str>) -> Result<Self> {
        CurrencyBuilder::new(symbol).build()
    }

    /// Start building a structured currency
    pub fn builder(symbol: impl AsRef<str>) -> CurrencyBuilder {
        CurrencyBuilder::new(symbol)
    }

    pub fn symbol_str(&self) -> &str {
        match self {
            Self::Symbol(s) => &s.symbol,
            Self::Structured(t) => &t.symbol,
        }
    }

    pub fn blockchain(&self) -> Option<&str> {
        match self {
            Self::Symbol(_) => None,
            Self::Structured(t) => t.blockchain.as_deref(),
        }
    }

    pub fn token_address(&self) -> Option<&str> {
        match self {
            Self::Symbol(_) => None,
            Self::Structured(t) => t.token_address.as_deref(),
        }
    }

    pub fn nft_token(&self) -> Option<&str> {
        match self {
            Self::Symbol(_) => None,
            Self::Structured(t) => t.nft_token.as_deref(),
        }
    }

    /// Fiat iff the symbol is a known fiat code and no chain is attached
    pub fn is_fiat(&self) -> bool {
        self.blockchain().is_none() && FIAT_SYMBOLS.contains(&self.symbol_str())
    }

    /// Stable sub-key used in transaction fingerprints.
    ///
    /// Tokens with a contract address are keyed by address (+ NFT id) so a
    /// renamed ticker still matches; everything else by symbol.
    pub fn fingerprint_key(&self) -> JsonValue {
        match self.token_address() {
            Some(address) => match self.nft_token() {
                Some(nft) => json!({ "address": address, "nft_token": nft }),
                None => json!({ "address": address }),
            },
            None => JsonValue::String(self.symbol_str().to_string()),
        }
    }
}

impl PartialEq for CurrencyDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.symbol_str() == other.symbol_str()
            && self.blockchain() == other.blockchain()
            && self.is_fiat() == other.is_fiat()
    }
}

impl Eq for CurrencyDescriptor {}

impl Hash for CurrencyDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol_str().hash(state);
        self.blockchain().hash(state);
    }
}

impl fmt::Display for CurrencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.blockchain() {
            Some(chain) => write!(f, "{} ({})", self.symbol_str(), chain),
            None => f.write_str(self.symbol_str()),
        }
    }
}

/// The only way to construct a [`CurrencyDescriptor`]
#[derive(Debug, Clone, Default)]
pub struct CurrencyBuilder {
    symbol: String,
    blockchain: Option<String>,
    token_address: Option<String>,
    nft_token: Option<String>,
}

impl CurrencyBuilder {
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self {
            symbol: symbol.as_ref().trim().to_string(),
            ..Default::default()
        }
    }

    pub fn blockchain(mut self, blockchain: impl AsRef<str>) -> Self {
        self.blockchain = non_blank(blockchain.as_ref()).map(|b| b.to_lowercase());
        self
    }

    pub fn token_address(mut self, address: impl AsRef<str>) -> Self {
        self.token_address = non_blank(address.as_ref());
        self
    }

    pub fn nft_token(mut self, nft: impl AsRef<str>) -> Self {
        self.nft_token = non_blank(nft.as_ref());
        self
    }

    pub fn build(self) -> Result<CurrencyDescriptor> {
        if self.symbol.is_empty() {
            return Err(Error::InvalidCurrency("currency symbol is blank".to_string()));
        }
        if self.nft_token.is_some() && self.token_address.is_none() {
            return Err(Error::InvalidCurrency(format!(
                "{}: nft_token requires a token_address",
                self.symbol
            )));
        }

        if self.blockchain.is_none() && self.token_address.is_none() {
            return Ok(CurrencyDescriptor::Symbol(SymbolCurrency { symbol: self.symbol }));
        }

        Ok(CurrencyDescriptor::Structured(TokenCurrency {
            symbol: self.symbol,
            blockchain: self.blockchain,
            token_address: self.token_address,
            nft_token: self.nft_token,
        }))
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_builder() {
        let btc = CurrencyDescriptor::symbol(" BTC ").unwrap();
        assert!(matches!(btc, CurrencyDescriptor::Symbol(_)));
        assert_eq!(btc.symbol_str(), "BTC");
        assert!(!btc.is_fiat());
        assert!(CurrencyDescriptor::symbol("USD").unwrap().is_fiat());
    }

    #[test]
    fn test_blank_symbol_rejected() {
        assert!(matches!(
            CurrencyDescriptor::symbol("  "),
            Err(Error::InvalidCurrency(_))
        ));
    }

    #[test]
    fn test_nft_requires_address() {
        let result = CurrencyDescriptor::builder("PUNK").nft_token("42").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_equality_uses_symbol_chain_and_class() {
        let usdc_eth = CurrencyDescriptor::builder("USDC")
            .blockchain("Ethereum")
            .token_address("0xa0b8")
            .build()
            .unwrap();
        let usdc_eth_other_addr = CurrencyDescriptor::builder("USDC")
            .blockchain("ethereum")
            .token_address("0xffff")
            .build()
            .unwrap();
        let usdc_sol = CurrencyDescriptor::builder("USDC").blockchain("solana").build().unwrap();
        let usdc = CurrencyDescriptor::symbol("USDC").unwrap();

        assert_eq!(usdc_eth, usdc_eth_other_addr);
        assert_ne!(usdc_eth, usdc_sol);
        assert_ne!(usdc_eth, usdc);
    }

    #[test]
    fn test_usd_on_chain_is_not_fiat() {
        let usd = CurrencyDescriptor::symbol("USD").unwrap();
        let chain_usd = CurrencyDescriptor::builder("USD").blockchain("tron").build().unwrap();
        assert!(usd.is_fiat());
        assert!(!chain_usd.is_fiat());
        assert_ne!(usd, chain_usd);
    }

    #[test]
    fn test_fingerprint_key() {
        let nft = CurrencyDescriptor::builder("PUNK")
            .blockchain("ethereum")
            .token_address("0xb47e")
            .nft_token("42")
            .build()
            .unwrap();
        assert_eq!(nft.fingerprint_key(), json!({ "address": "0xb47e", "nft_token": "42" }));

        let btc = CurrencyDescriptor::symbol("BTC").unwrap();
        assert_eq!(btc.fingerprint_key(), json!("BTC"));
    }

    #[test]
    fn test_serialization_shapes() {
        let btc = CurrencyDescriptor::symbol("BTC").unwrap();
        assert_eq!(serde_json::to_value(&btc).unwrap(), json!("BTC"));

        let token = CurrencyDescriptor::builder("UNI")
            .blockchain("ethereum")
            .token_address("0x1f98")
            .build()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&token).unwrap(),
            json!({ "symbol": "UNI", "blockchain": "ethereum", "token_address": "0x1f98" })
        );
    }
}
