//! Built-in format definitions
//!
//! Every importable layout is registered here, in one explicit list. Order
//! matters only for breaking display ties; detection ranks by score.

mod coinmetro;
mod coinsmart;
mod generic;

use crate::domain::MappingDefinition;

/// Wallet service tags
pub mod tag {
    pub const COIN_METRO: &str = "coin_metro";
    pub const COINSMART: &str = "coinsmart";
}

/// All built-in definitions, in registration order
pub fn all() -> Vec<MappingDefinition> {
    vec![
        coinmetro::TRANSACTIONS,
        coinmetro::BALANCES,
        coinsmart::TRANSACTIONS,
        generic::TRADES,
        generic::AMOUNTS,
        generic::SINGLE_CURRENCY,
    ]
}
