//! Demo API importer
//!
//! Produces a deterministic year of exchange activity so the API import
//! path can be exercised without credentials:
//! - monthly EUR deposits
//! - weekly BTC buys, with a fee
//! - quarterly ETH sells
//! - monthly ETH staking rewards
//! - one BTC withdrawal to cold storage

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};

use crate::domain::result::Result;
use crate::domain::{ApiBalance, CurrencyDescriptor, Label, TxnParams};
use crate::ports::ApiImporter;
use crate::services::{ImportPipeline, Side, TradeParams};

pub const DEMO_TAG: &str = "demo";

/// Bumped whenever the generated history changes shape
const SYNCDATA_VERSION: u32 = 1;

const DAYS: i64 = 364;

pub struct DemoImporter {
    anchor: DateTime<Utc>,
    balances: BTreeMap<String, Decimal>,
    imported: usize,
}

impl DemoImporter {
    /// History starts at 2023-01-02 00:00 UTC
    pub fn new() -> Self {
        Self::starting_at(Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).single().unwrap_or_default())
    }

    pub fn starting_at(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            balances: BTreeMap::new(),
            imported: 0,
        }
    }

    fn credit(&mut self, currency: &str, amount: Decimal) {
        *self.balances.entry(currency.to_string()).or_default() += amount;
    }

    fn at(&self, day: i64, hour: i64) -> DateTime<Utc> {
        self.anchor + Duration::days(day) + Duration::hours(hour)
    }

    fn record(&mut self, accepted: bool) {
        if accepted {
            self.imported += 1;
        }
    }
}

impl Default for DemoImporter {
    fn default() -> Self {
        Self::new()
    }
}

/// BTC/EUR price on `day`: a slow climb with a 91-day wobble
fn btc_price(day: i64) -> Decimal {
    let base = 20_000.0 + 40.0 * day as f64;
    let wobble = 1_500.0 * (day as f64 * std::f64::consts::TAU / 91.0).sin();
    Decimal::from_f64_retain(base + wobble)
        .unwrap_or_default()
        .round_dp(2)
}

fn eth_price(day: i64) -> Decimal {
    let base = 1_400.0 + 2.5 * day as f64;
    let wobble = 120.0 * (day as f64 * std::f64::consts::TAU / 63.0).cos();
    Decimal::from_f64_retain(base + wobble)
        .unwrap_or_default()
        .round_dp(2)
}

impl ApiImporter for DemoImporter {
    fn tag(&self) -> &str {
        DEMO_TAG
    }

    fn import(&mut self, pipeline: &mut ImportPipeline) -> Result<()> {
        let eur = CurrencyDescriptor::symbol("EUR")?;
        let btc = CurrencyDescriptor::symbol("BTC")?;
        let eth = CurrencyDescriptor::symbol("ETH")?;

        // starting ETH position
        let accepted = pipeline
            .sync_receive(
                TxnParams::new(self.at(0, 8))
                    .amount(Decimal::new(4, 0), eth.clone())
                    .external_id("demo-dep-eth-0")
                    .description("Transfer in"),
            )?
            .is_some();
        if accepted {
            self.credit("ETH", Decimal::new(4, 0));
        }
        self.record(accepted);

        for day in 0..=DAYS {
            if day % 30 == 0 {
                let amount = Decimal::new(1_500, 0);
                let accepted = pipeline
                    .sync_receive(
                        TxnParams::new(self.at(day, 9))
                            .amount(amount, eur.clone())
                            .external_id(format!("demo-dep-{}", day))
                            .description("SEPA deposit"),
                    )?
                    .is_some();
                if accepted {
                    self.credit("EUR", amount);
                }
                self.record(accepted);
            }

            if day % 7 == 3 {
                let spend = Decimal::new(250, 0);
                let btc_amount = (spend / btc_price(day)).round_dp(8);
                let fee = Decimal::new(125, 2);
                let accepted = pipeline
                    .sync_trade(TradeParams {
                        side: Side::Buy,
                        base_amount: btc_amount.into(),
                        base_currency: btc.clone(),
                        quote_amount: spend.into(),
                        quote_currency: eur.clone(),
                        order_id: Some(format!("demo-order-{}", day)),
                        trade_id: Some(format!("demo-trade-{}", day)),
                        txn: TxnParams::new(self.at(day, 14)).fee(fee, eur.clone()),
                    })?
                    .is_some();
                if accepted {
                    self.credit("EUR", -(spend + fee));
                    self.credit("BTC", btc_amount);
                }
                self.record(accepted);
            }

            if day % 91 == 45 {
                let sold = Decimal::new(5, 1);
                let proceeds = (sold * eth_price(day)).round_dp(2);
                let accepted = pipeline
                    .sync_trade(TradeParams {
                        side: Side::Sell,
                        base_amount: sold.into(),
                        base_currency: eth.clone(),
                        quote_amount: proceeds.into(),
                        quote_currency: eur.clone(),
                        order_id: Some(format!("demo-order-eth-{}", day)),
                        trade_id: Some(format!("demo-trade-eth-{}", day)),
                        txn: TxnParams::new(self.at(day, 16)),
                    })?
                    .is_some();
                if accepted {
                    self.credit("ETH", -sold);
                    self.credit("EUR", proceeds);
                }
                self.record(accepted);
            }

            if day % 30 == 29 {
                let reward = Decimal::new(1_25, 4);
                let accepted = pipeline
                    .sync_receive(
                        TxnParams::new(self.at(day, 0))
                            .amount(reward, eth.clone())
                            .label(Label::Reward)
                            .external_id(format!("demo-stake-{}", day)),
                    )?
                    .is_some();
                if accepted {
                    self.credit("ETH", reward);
                }
                self.record(accepted);
            }

            if day == 200 {
                let amount = Decimal::new(5, 2);
                let accepted = pipeline
                    .sync_send(
                        TxnParams::new(self.at(day, 11))
                            .amount(amount, btc.clone())
                            .txhash(format!("0x{:064x}", 0xdead_beef_u64))
                            .external_id("demo-wd-200")
                            .description("Withdrawal to cold storage"),
                    )?
                    .is_some();
                if accepted {
                    self.credit("BTC", -amount);
                }
                self.record(accepted);
            }
        }

        Ok(())
    }

    fn sync_balances(&mut self) -> Result<Vec<ApiBalance>> {
        self.balances
            .iter()
            .map(|(symbol, amount)| {
                Ok(ApiBalance {
                    currency: CurrencyDescriptor::symbol(symbol)?,
                    amount: amount.normalize(),
                })
            })
            .collect()
    }

    fn syncdata(&self) -> Option<JsonValue> {
        Some(json!({
            "version": SYNCDATA_VERSION,
            "anchor": self.anchor.to_rfc3339(),
            "imported": self.imported,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::normalizer::StandardNormalizer;
    use crate::domain::TransactionType;
    use crate::services::{PipelineOptions, RunTarget};
    use std::sync::Arc;

    fn pipeline(start_date: Option<DateTime<Utc>>) -> ImportPipeline {
        ImportPipeline::new(
            RunTarget::Wallet("demo-wallet".into()),
            PipelineOptions {
                request_id: "demo".into(),
                start_date,
                importer_tag: Some(DEMO_TAG.into()),
                ..Default::default()
            },
            Arc::new(StandardNormalizer::new()),
        )
    }

    #[test]
    fn test_demo_is_deterministic() {
        let mut first = DemoImporter::new();
        let mut p1 = pipeline(None);
        first.import(&mut p1).unwrap();

        let mut second = DemoImporter::new();
        let mut p2 = pipeline(None);
        second.import(&mut p2).unwrap();

        let h1: Vec<&str> = p1.pending().iter().map(|t| t.unique_hash()).collect();
        let h2: Vec<&str> = p2.pending().iter().map(|t| t.unique_hash()).collect();
        assert_eq!(h1, h2);
        assert_eq!(first.sync_balances().unwrap(), second.sync_balances().unwrap());
    }

    #[test]
    fn test_demo_covers_every_kind() {
        let mut importer = DemoImporter::new();
        let mut p = pipeline(None);
        importer.import(&mut p).unwrap();

        let kinds = |t: TransactionType| p.pending().iter().filter(|x| x.txn_type() == Some(t)).count();
        assert_eq!(kinds(TransactionType::Trade), 52 + 4);
        assert_eq!(kinds(TransactionType::Withdrawal), 1);
        assert!(kinds(TransactionType::Deposit) > 12);
        assert!(p.pending().iter().any(|t| t.label == Some(Label::Reward)));
        assert!(p.pending().iter().all(|t| t.synced));

        let syncdata = importer.syncdata().unwrap();
        assert_eq!(syncdata["version"], json!(1));
        assert_eq!(syncdata["imported"], json!(p.pending().len()));
    }

    #[test]
    fn test_balances_follow_accepted_txns() {
        let mut importer = DemoImporter::new();
        let cutoff = Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap();
        let mut p = pipeline(Some(cutoff));
        importer.import(&mut p).unwrap();

        let balances = importer.sync_balances().unwrap();
        let eur = balances.iter().find(|b| b.currency.symbol_str() == "EUR").unwrap();
        // after the cutoff only the day-360 deposit, four buys and one reward remain
        assert!(eur.amount > Decimal::ZERO);
        assert!(balances.iter().all(|b| b.currency.symbol_str() != "ETH"
            || b.amount < Decimal::new(1, 0)));
    }
}
