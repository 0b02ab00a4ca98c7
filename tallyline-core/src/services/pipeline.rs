//! Import pipeline
//!
//! One [`ImportPipeline`] per import run. It owns all per-run state: the
//! start-date cutoffs, the pending transactions and both duplicate guards.
//! Nothing here logs or touches the outside world; every decision is visible
//! only through return values and the final [`CommitPayload`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::result::{Error, Result};
use crate::domain::{
    ApiBalance, CommitPayload, CsvImportState, CurrencyDescriptor, ImportResults, Label,
    PayloadError, RawAmount, TransactionType, Txn, TxnParams,
};
use crate::ports::{AmountOptions, Normalizer};

use super::query::TxnQuery;

/// What to do when an external id repeats within a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// A repeated external id with a different payload is an integrity error
    Strict,
    /// Repeats are dropped silently
    #[default]
    Tolerant,
}

impl FromStr for DuplicatePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "tolerant" => Ok(Self::Tolerant),
            other => Err(Error::Config(format!("unknown duplicate policy: {}", other))),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Tolerant => f.write_str("tolerant"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub request_id: String,
    /// Hard cutoff; earlier transactions are always dropped
    pub start_date: Option<DateTime<Utc>>,
    /// Applied to receives that carry no label of their own
    pub deposit_label: Option<Label>,
    pub importer_tag: Option<String>,
    pub duplicate_policy: DuplicatePolicy,
}

/// Who the run reports to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTarget {
    /// API sync of a wallet; accepted transactions are marked synced
    Wallet(String),
    CsvImport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// A trade described by market side rather than by legs
#[derive(Debug, Clone)]
pub struct TradeParams {
    pub side: Side,
    pub base_amount: RawAmount,
    pub base_currency: CurrencyDescriptor,
    pub quote_amount: RawAmount,
    pub quote_currency: CurrencyDescriptor,
    /// Stored as the transaction hash
    pub order_id: Option<String>,
    /// Stored as the external id
    pub trade_id: Option<String>,
    /// Remaining attributes: date, fee, label, ...
    pub txn: TxnParams,
}

/// Terminal information for [`ImportPipeline::commit`]
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Api {
        syncdata: Option<JsonValue>,
        balances: Option<Vec<ApiBalance>>,
        error: Option<PayloadError>,
        config: Option<JsonValue>,
    },
    Csv {
        state: CsvImportState,
        error: Option<String>,
        required_options: Option<Vec<String>>,
        potential_mappers: Option<Vec<String>>,
        results: Option<ImportResults>,
        exception: Option<String>,
    },
}

impl RunOutcome {
    /// CSV outcome carrying only a state and an optional message
    pub fn csv(state: CsvImportState, error: Option<String>) -> Self {
        Self::Csv {
            state,
            error,
            required_options: None,
            potential_mappers: None,
            results: None,
            exception: None,
        }
    }
}

pub struct ImportPipeline {
    target: RunTarget,
    options: PipelineOptions,
    normalizer: Arc<dyn Normalizer>,
    started_at: DateTime<Utc>,
    soft_start_date: Option<DateTime<Utc>>,
    pending: Vec<Txn>,
    external_id_seen: HashMap<TransactionType, HashSet<String>>,
    content_hash_seen: HashMap<String, HashSet<String>>,
    initial_rows: Option<Vec<Vec<String>>>,
    mapping_id: Option<String>,
}

impl ImportPipeline {
    pub fn new(target: RunTarget, options: PipelineOptions, normalizer: Arc<dyn Normalizer>) -> Self {
        Self {
            target,
            options,
            normalizer,
            started_at: Utc::now(),
            soft_start_date: None,
            pending: Vec::new(),
            external_id_seen: HashMap::new(),
            content_hash_seen: HashMap::new(),
            initial_rows: None,
            mapping_id: None,
        }
    }

    /// The hard cutoff. Callers relying on the soft cutoff read it explicitly.
    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.options.start_date
    }

    pub fn soft_start_date(&self) -> Option<DateTime<Utc>> {
        self.soft_start_date
    }

    /// Default cutoff that individual calls may bypass
    pub fn set_soft_start_date(&mut self, date: Option<DateTime<Utc>>) {
        self.soft_start_date = date;
    }

    pub fn set_initial_rows(&mut self, rows: Vec<Vec<String>>) {
        self.initial_rows = Some(rows);
    }

    pub fn set_mapping_id(&mut self, mapping_id: impl Into<String>) {
        self.mapping_id = Some(mapping_id.into());
    }

    pub fn pending(&self) -> &[Txn] {
        &self.pending
    }

    pub fn normalizer(&self) -> &dyn Normalizer {
        self.normalizer.as_ref()
    }

    fn signed_amount(&self, params: &TxnParams) -> Option<Decimal> {
        let opts = AmountOptions {
            small_decimals: params.options.small_decimals,
            comma_as_decimal: params.options.comma_as_decimal,
            no_zero: false,
        };
        params
            .amount
            .as_ref()
            .and_then(|raw| self.normalizer.normalize_amount(raw, opts))
    }

    /// Dispatch on the sign of `amount`: positive receives, negative sends
    pub fn sync_amount(&mut self, params: TxnParams) -> Result<Option<&Txn>> {
        match self.signed_amount(&params) {
            Some(a) if a > Decimal::ZERO => self.sync_receive(params),
            Some(a) if a < Decimal::ZERO => self.sync_send(params),
            _ => Ok(None),
        }
    }

    /// Incoming `amount` of `currency`
    pub fn sync_receive(&mut self, mut params: TxnParams) -> Result<Option<&Txn>> {
        if self.signed_amount(&params).map_or(true, |a| a.is_zero()) {
            return Ok(None);
        }

        if params.currency.is_some() {
            params.to_amount = params.amount.take();
            params.to_currency = params.currency.take();
        }

        self.sync_txn(params)
    }

    /// Outgoing `amount` of `currency`
    pub fn sync_send(&mut self, mut params: TxnParams) -> Result<Option<&Txn>> {
        if self.signed_amount(&params).map_or(true, |a| a.is_zero()) {
            return Ok(None);
        }

        if params.currency.is_some() {
            params.from_amount = params.amount.take();
            params.from_currency = params.currency.take();
        }

        self.sync_txn(params)
    }

    /// A buy spends quote and receives base; a sell the reverse. Trades with
    /// a zero leg are dropped.
    pub fn sync_trade(&mut self, trade: TradeParams) -> Result<Option<&Txn>> {
        let TradeParams {
            side,
            base_amount,
            base_currency,
            quote_amount,
            quote_currency,
            order_id,
            trade_id,
            txn: mut params,
        } = trade;

        let opts = AmountOptions {
            small_decimals: params.options.small_decimals,
            comma_as_decimal: params.options.comma_as_decimal,
            no_zero: true,
        };
        let base = self.normalizer.normalize_amount(&base_amount, opts);
        let quote = self.normalizer.normalize_amount(&quote_amount, opts);
        let (Some(base), Some(quote)) = (base, quote) else {
            return Ok(None);
        };

        let ((from_amount, from_currency), (to_amount, to_currency)) = match side {
            Side::Sell => ((base, base_currency), (quote, quote_currency)),
            Side::Buy => ((quote, quote_currency), (base, base_currency)),
        };

        params.from_amount = Some(from_amount.into());
        params.from_currency = Some(from_currency);
        params.to_amount = Some(to_amount.into());
        params.to_currency = Some(to_currency);
        if order_id.is_some() {
            params.txhash = order_id;
        }
        if trade_id.is_some() {
            params.external_id = trade_id;
        }

        self.sync_txn(params)
    }

    /// Build, validate, deduplicate and accept one transaction.
    ///
    /// Returns `Ok(None)` when the transaction was dropped (zero amounts,
    /// before a cutoff, or a duplicate), a validation error when it breaks
    /// an entity invariant, and an integrity error when a strict run sees a
    /// conflicting external id.
    pub fn sync_txn(&mut self, mut params: TxnParams) -> Result<Option<&Txn>> {
        if self.all_legs_zero(&params) {
            return Ok(None);
        }

        let date = params
            .date
            .as_ref()
            .and_then(|d| self.normalizer.normalize_date(d, params.options.default_timezone));
        if let Some(date) = date {
            if self.before_cutoff(date, params.options.bypass_soft_start_date) {
                return Ok(None);
            }
        }

        if params.importer_tag.is_none() {
            params.importer_tag = self.options.importer_tag.clone();
        }
        // unlabelled deposits take the run's deposit label
        let deposit = params.to_currency.is_some() && params.from_currency.is_none();
        if deposit && params.label.is_none() {
            params.label = self.options.deposit_label;
        }

        let ignore_duplicate_external_id = params.options.ignore_duplicate_external_id;
        let unique = params.options.unique.clone();
        let seed = unique.as_ref().and_then(|u| u.seed.clone());

        let mut txn = Txn::build(params, self.normalizer.as_ref(), seed.as_deref())?;

        if let (Some(external_id), Some(txn_type)) = (txn.external_id.clone(), txn.txn_type()) {
            // self-trades can share a trade id across two orders, so trades
            // also key on the order hash
            let currency = txn
                .from_currency
                .as_ref()
                .or(txn.to_currency.as_ref())
                .map(|c| c.to_string())
                .unwrap_or_default();
            let order = if txn.is_trade() {
                txn.txhash.clone().unwrap_or_default()
            } else {
                String::new()
            };
            let key = [external_id.as_str(), currency.as_str(), order.as_str()].join("_");

            let seen = self.external_id_seen.entry(txn_type).or_default();
            if !seen.insert(key) {
                if self.options.duplicate_policy == DuplicatePolicy::Strict
                    && !ignore_duplicate_external_id
                {
                    let redelivery = self.pending.iter().any(|p| {
                        p.external_id == txn.external_id && p.external_data == txn.external_data
                    });
                    if !redelivery {
                        return Err(Error::integrity(format!(
                            "duplicate external_id detected - {}",
                            external_id
                        )));
                    }
                }
                return Ok(None);
            }
        }

        if let Some(check) = unique {
            let seen = self.content_hash_seen.entry(check.group).or_default();
            if !seen.insert(txn.unique_hash().to_string()) {
                return Ok(None);
            }
        }

        if matches!(self.target, RunTarget::Wallet(_)) {
            txn.synced = true;
        }
        self.pending.push(txn);
        Ok(self.pending.last())
    }

    /// True when every populated leg amount normalizes to zero
    fn all_legs_zero(&self, params: &TxnParams) -> bool {
        let opts = AmountOptions {
            small_decimals: params.options.small_decimals,
            comma_as_decimal: params.options.comma_as_decimal,
            no_zero: false,
        };
        let legs: Vec<Decimal> = [&params.from_amount, &params.to_amount]
            .into_iter()
            .flatten()
            .map(|raw| {
                self.normalizer
                    .normalize_amount(raw, opts)
                    .unwrap_or(Decimal::ZERO)
            })
            .collect();
        !legs.is_empty() && legs.iter().all(|a| a.is_zero())
    }

    fn before_cutoff(&self, date: DateTime<Utc>, bypass_soft: bool) -> bool {
        if self.options.start_date.is_some_and(|hard| hard > date) {
            return true;
        }
        !bypass_soft && self.soft_start_date.is_some_and(|soft| soft > date)
    }

    /// Drop everything accepted so far, e.g. before committing a failed run
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    /// Most recently accepted pending transaction matching `query`
    pub fn find_pending_txn(&self, query: &TxnQuery) -> Option<&Txn> {
        self.pending.iter().rev().find(|txn| query.matches(txn))
    }

    /// Assemble the terminal payload and clear the pending transactions
    pub fn commit(&mut self, outcome: RunOutcome) -> CommitPayload {
        let txns = std::mem::take(&mut self.pending);
        let (wallet_id, csv_import_id) = match &self.target {
            RunTarget::Wallet(id) => (Some(id.clone()), None),
            RunTarget::CsvImport(id) => (None, Some(id.clone())),
        };

        let mut payload = CommitPayload {
            id: self.options.request_id.clone(),
            wallet_id,
            csv_import_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            txns,
            error: None,
            state: None,
            initial_rows: None,
            required_options: None,
            potential_mappers: None,
            mapping_id: None,
            results: None,
            exception: None,
            api_syncdata: None,
            api_balances: None,
            version: None,
            config: None,
        };

        match outcome {
            RunOutcome::Api {
                syncdata,
                balances,
                error,
                config,
            } => {
                payload.version = syncdata.as_ref().and_then(|s| s.get("version")).cloned();
                payload.api_syncdata = syncdata;
                payload.api_balances = balances;
                payload.error = error;
                payload.config = Some(config.unwrap_or_else(|| JsonValue::Object(Default::default())));
            }
            RunOutcome::Csv {
                state,
                error,
                required_options,
                potential_mappers,
                results,
                exception,
            } => {
                payload.state = Some(state);
                payload.error = error.map(PayloadError::Message);
                payload.initial_rows = self.initial_rows.clone();
                payload.required_options = required_options;
                payload.potential_mappers = potential_mappers;
                payload.mapping_id = self.mapping_id.clone();
                payload.results = results;
                payload.exception = exception;
            }
        }

        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::normalizer::StandardNormalizer;
    use crate::domain::UniqueCheck;
    use crate::services::query::Attribute;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn cur(symbol: &str) -> CurrencyDescriptor {
        CurrencyDescriptor::symbol(symbol).unwrap()
    }

    fn pipeline_with(options: PipelineOptions) -> ImportPipeline {
        ImportPipeline::new(
            RunTarget::CsvImport("csv-1".into()),
            options,
            Arc::new(StandardNormalizer::new()),
        )
    }

    fn pipeline() -> ImportPipeline {
        pipeline_with(PipelineOptions {
            request_id: "req-1".into(),
            ..Default::default()
        })
    }

    fn strict() -> ImportPipeline {
        pipeline_with(PipelineOptions {
            request_id: "req-1".into(),
            duplicate_policy: DuplicatePolicy::Strict,
            ..Default::default()
        })
    }

    fn deposit(date: &str, amount: &str) -> TxnParams {
        TxnParams::new(date).to(amount, cur("BTC"))
    }

    #[test]
    fn test_sync_amount_dispatches_on_sign() {
        let mut p = pipeline();
        let t = p
            .sync_amount(TxnParams::new("2021-01-01").amount("-2", cur("ETH")))
            .unwrap()
            .unwrap();
        assert_eq!(t.txn_type(), Some(TransactionType::Withdrawal));
        assert_eq!(t.from_amount, dec!(2));

        let t = p
            .sync_amount(TxnParams::new("2021-01-02").amount("3", cur("ETH")))
            .unwrap()
            .unwrap();
        assert_eq!(t.txn_type(), Some(TransactionType::Deposit));

        assert!(p
            .sync_amount(TxnParams::new("2021-01-03").amount("0", cur("ETH")))
            .unwrap()
            .is_none());
        assert_eq!(p.pending().len(), 2);
    }

    #[test]
    fn test_receive_applies_deposit_label() {
        let mut p = pipeline_with(PipelineOptions {
            deposit_label: Some(Label::Reward),
            ..Default::default()
        });
        let t = p
            .sync_receive(TxnParams::new("2021-01-01").amount("1", cur("ETH")))
            .unwrap()
            .unwrap();
        assert_eq!(t.label, Some(Label::Reward));

        let t = p
            .sync_receive(
                TxnParams::new("2021-01-02")
                    .amount("1", cur("ETH"))
                    .label(Label::Airdrop),
            )
            .unwrap()
            .unwrap();
        assert_eq!(t.label, Some(Label::Airdrop));

        // sends never take the deposit label
        let t = p
            .sync_send(TxnParams::new("2021-01-03").amount("1", cur("ETH")))
            .unwrap()
            .unwrap();
        assert_eq!(t.label, None);

        // legs already split by the caller still count as a deposit
        let t = p.sync_txn(deposit("2021-01-04", "1")).unwrap().unwrap();
        assert_eq!(t.label, Some(Label::Reward));

        let t = p
            .sync_txn(TxnParams::new("2021-01-05").from("1", cur("ETH")).to("2000", cur("EUR")))
            .unwrap()
            .unwrap();
        assert_eq!(t.label, None);
    }

    #[test]
    fn test_zero_amounts_skipped() {
        let mut p = pipeline();
        assert!(p.sync_receive(TxnParams::new("2021-01-01").amount("0.00", cur("BTC"))).unwrap().is_none());
        assert!(p.sync_send(TxnParams::new("2021-01-01")).unwrap().is_none());
        assert!(p.sync_txn(deposit("2021-01-01", "0")).unwrap().is_none());
        assert!(p.pending().is_empty());
    }

    #[test]
    fn test_sync_trade_sides() {
        let mut p = pipeline();
        let sell = TradeParams {
            side: Side::Sell,
            base_amount: "0.5".into(),
            base_currency: cur("BTC"),
            quote_amount: "20000".into(),
            quote_currency: cur("USD"),
            order_id: Some("order-1".into()),
            trade_id: Some("trade-1".into()),
            txn: TxnParams::new("2021-01-01"),
        };
        let t = p.sync_trade(sell.clone()).unwrap().unwrap();
        assert_eq!(t.from_currency, Some(cur("BTC")));
        assert_eq!(t.to_amount, dec!(20000));
        assert_eq!(t.txhash.as_deref(), Some("order-1"));
        assert_eq!(t.external_id.as_deref(), Some("trade-1"));

        let buy = TradeParams {
            side: Side::Buy,
            order_id: Some("order-2".into()),
            ..sell.clone()
        };
        let t = p.sync_trade(buy).unwrap().unwrap();
        assert_eq!(t.from_currency, Some(cur("USD")));
        assert_eq!(t.to_currency, Some(cur("BTC")));

        let zero = TradeParams {
            quote_amount: "0".into(),
            trade_id: Some("trade-3".into()),
            ..sell
        };
        assert!(p.sync_trade(zero).unwrap().is_none());
        assert_eq!(p.pending().len(), 2);
    }

    #[test]
    fn test_hard_cutoff_always_applies() {
        let mut p = pipeline_with(PipelineOptions {
            start_date: Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        });
        let mut early = deposit("2020-12-31", "1");
        early.options.bypass_soft_start_date = true;
        assert!(p.sync_txn(early).unwrap().is_none());
        assert!(p.sync_txn(deposit("2021-01-01", "1")).unwrap().is_some());
    }

    #[test]
    fn test_soft_cutoff_bypassable() {
        let mut p = pipeline();
        p.set_soft_start_date(Some(Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap()));
        assert!(p.sync_txn(deposit("2021-05-01", "1")).unwrap().is_none());

        let mut bypass = deposit("2021-05-01", "1");
        bypass.options.bypass_soft_start_date = true;
        assert!(p.sync_txn(bypass).unwrap().is_some());
    }

    #[test]
    fn test_validation_error_propagates() {
        let mut p = pipeline();
        let err = p
            .sync_txn(TxnParams::new("2021-01-01").from("1", cur("BTC")).to("1", cur("BTC")).label(Label::Mining))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(!err.is_fatal());
        assert!(p.pending().is_empty());
    }

    #[test]
    fn test_identical_redelivery_is_idempotent() {
        let mut p = strict();
        let record = || {
            deposit("2021-01-01", "1")
                .external_id("D-1")
                .external_data(json!({ "id": "D-1", "amount": "1" }))
        };
        assert!(p.sync_txn(record()).unwrap().is_some());
        assert!(p.sync_txn(record()).unwrap().is_none());
        assert_eq!(p.pending().len(), 1);
    }

    #[test]
    fn test_conflicting_external_id_strict() {
        let mut p = strict();
        p.sync_txn(
            deposit("2021-01-01", "1")
                .external_id("D-1")
                .external_data(json!({ "amount": "1" })),
        )
        .unwrap();
        let err = p
            .sync_txn(
                deposit("2021-01-02", "2")
                    .external_id("D-1")
                    .external_data(json!({ "amount": "2" })),
            )
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Integrity error: duplicate external_id detected - D-1"
        );
    }

    #[test]
    fn test_conflicting_external_id_tolerant_or_ignored() {
        let mut p = pipeline();
        p.sync_txn(deposit("2021-01-01", "1").external_id("D-1")).unwrap();
        assert!(p
            .sync_txn(deposit("2021-01-02", "2").external_id("D-1"))
            .unwrap()
            .is_none());

        let mut p = strict();
        p.sync_txn(deposit("2021-01-01", "1").external_id("D-1")).unwrap();
        let mut second = deposit("2021-01-02", "2").external_id("D-1");
        second.options.ignore_duplicate_external_id = true;
        assert!(p.sync_txn(second).unwrap().is_none());
        assert_eq!(p.pending().len(), 1);
    }

    #[test]
    fn test_external_ids_scoped_by_type_and_currency() {
        let mut p = strict();
        p.sync_txn(deposit("2021-01-01", "1").external_id("X")).unwrap();
        // same id on a withdrawal is a different key space
        assert!(p
            .sync_txn(TxnParams::new("2021-01-01").from("1", cur("BTC")).external_id("X"))
            .unwrap()
            .is_some());
        // same id, other currency
        assert!(p
            .sync_txn(TxnParams::new("2021-01-01").to("1", cur("ETH")).external_id("X"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_self_trade_shares_trade_id() {
        let mut p = strict();
        let trade = |order: &str| {
            TxnParams::new("2021-01-01")
                .from("1", cur("BTC"))
                .to("20000", cur("USD"))
                .external_id("T-1")
                .txhash(order)
        };
        assert!(p.sync_txn(trade("order-a")).unwrap().is_some());
        assert!(p.sync_txn(trade("order-b")).unwrap().is_some());
    }

    #[test]
    fn test_content_hash_dedup_is_opt_in() {
        let mut p = pipeline();
        assert!(p.sync_txn(deposit("2021-01-01", "1")).unwrap().is_some());
        assert!(p.sync_txn(deposit("2021-01-01", "1")).unwrap().is_some());

        let mut p = pipeline();
        let unique = || deposit("2021-01-01", "1").unique(UniqueCheck::default());
        assert!(p.sync_txn(unique()).unwrap().is_some());
        assert!(p.sync_txn(unique()).unwrap().is_none());

        // other group, other seed
        let other_group = deposit("2021-01-01", "1").unique(UniqueCheck::default().in_group("fills"));
        assert!(p.sync_txn(other_group).unwrap().is_some());
        let seeded = deposit("2021-01-01", "1").unique(UniqueCheck::seeded("row-9"));
        assert!(p.sync_txn(seeded).unwrap().is_some());
    }

    #[test]
    fn test_find_pending_txn_scans_newest_first() {
        let mut p = pipeline();
        p.sync_txn(deposit("2021-01-01", "1").external_id("A")).unwrap();
        p.sync_txn(deposit("2021-01-02", "2").external_id("B")).unwrap();

        let q = TxnQuery::new().eq(Attribute::ToCurrency, cur("BTC"));
        assert_eq!(p.find_pending_txn(&q).unwrap().external_id.as_deref(), Some("B"));

        let q = TxnQuery::new().one_of(Attribute::ExternalId, ["A", "Z"]);
        assert_eq!(p.find_pending_txn(&q).unwrap().to_amount, dec!(1));

        let q = TxnQuery::new().within(Attribute::ToAmount, dec!(5), dec!(10));
        assert!(p.find_pending_txn(&q).is_none());
    }

    #[test]
    fn test_commit_clears_pending() {
        let mut p = pipeline();
        p.set_initial_rows(vec![vec!["Date".into()]]);
        p.set_mapping_id("generic-amounts");
        p.sync_txn(deposit("2021-01-01", "1")).unwrap();

        let payload = p.commit(RunOutcome::csv(CsvImportState::Completed, None));
        assert_eq!(payload.id, "req-1");
        assert_eq!(payload.csv_import_id.as_deref(), Some("csv-1"));
        assert_eq!(payload.txns.len(), 1);
        assert_eq!(payload.state, Some(CsvImportState::Completed));
        assert_eq!(payload.mapping_id.as_deref(), Some("generic-amounts"));
        assert!(!payload.txns[0].synced);
        assert!(p.pending().is_empty());

        let again = p.commit(RunOutcome::csv(CsvImportState::Completed, None));
        assert!(again.txns.is_empty());
    }

    #[test]
    fn test_wallet_runs_mark_synced() {
        let mut p = ImportPipeline::new(
            RunTarget::Wallet("w-1".into()),
            PipelineOptions {
                importer_tag: Some("demo".into()),
                ..Default::default()
            },
            Arc::new(StandardNormalizer::new()),
        );
        let t = p.sync_txn(deposit("2021-01-01", "1")).unwrap().unwrap();
        assert!(t.synced);
        assert_eq!(t.importer_tag.as_deref(), Some("demo"));

        let payload = p.commit(RunOutcome::Api {
            syncdata: Some(json!({ "version": 3, "cursor": "abc" })),
            balances: None,
            error: None,
            config: None,
        });
        assert_eq!(payload.wallet_id.as_deref(), Some("w-1"));
        assert_eq!(payload.version, Some(json!(3)));
        assert_eq!(payload.config, Some(json!({})));
        assert!(payload.state.is_none());
    }

    #[test]
    fn test_duplicate_policy_parse() {
        assert_eq!("STRICT".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Strict);
        assert_eq!(DuplicatePolicy::default(), DuplicatePolicy::Tolerant);
        assert!("lax".parse::<DuplicatePolicy>().is_err());
    }
}
