//! API import runs
//!
//! Drives one [`ApiImporter`] through a wallet-mode [`ImportPipeline`]:
//! option check, import, balances, commit. Importer failures never escape
//! as errors; they are folded into the payload's `error` object.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{CommitPayload, Label, PayloadError, SyncFailure};
use crate::ports::{ApiImporter, Normalizer, PayloadPublisher, API_IMPORT_FINISHED};

use super::pipeline::{DuplicatePolicy, ImportPipeline, PipelineOptions, RunOutcome, RunTarget};

/// Longest message forwarded from an importer failure
pub const MAX_SYNC_MESSAGE_LEN: usize = 300;

pub const GENERIC_SYNC_MESSAGE: &str =
    "Something went wrong while syncing, try again in a few minutes or contact support.";

#[derive(Debug, Clone, Default)]
pub struct ApiImportRequest {
    pub request_id: String,
    pub wallet_id: String,
    pub start_date: Option<DateTime<Utc>>,
    pub deposit_label: Option<Label>,
    /// Credentials and importer settings, checked against `required_options`
    pub api_options: BTreeMap<String, String>,
    /// Echoed back in the payload
    pub config: Option<JsonValue>,
}

pub struct ApiImportService {
    normalizer: Arc<dyn Normalizer>,
    publisher: Arc<dyn PayloadPublisher>,
    duplicate_policy: DuplicatePolicy,
}

impl ApiImportService {
    pub fn new(
        normalizer: Arc<dyn Normalizer>,
        publisher: Arc<dyn PayloadPublisher>,
        duplicate_policy: DuplicatePolicy,
    ) -> Self {
        Self {
            normalizer,
            publisher,
            duplicate_policy,
        }
    }

    /// Run `importer` for one wallet and publish the payload
    pub fn run(&self, request: ApiImportRequest, importer: &mut dyn ApiImporter) -> Result<CommitPayload> {
        let tag = importer.tag().to_string();
        let mut pipeline = ImportPipeline::new(
            RunTarget::Wallet(request.wallet_id.clone()),
            PipelineOptions {
                request_id: request.request_id.clone(),
                start_date: request.start_date,
                deposit_label: request.deposit_label,
                importer_tag: Some(tag.clone()),
                duplicate_policy: self.duplicate_policy,
            },
            Arc::clone(&self.normalizer),
        );

        info!(importer = %tag, wallet_id = %request.wallet_id, "api import started");

        let result = check_options(importer, &request.api_options)
            .and_then(|_| importer.import(&mut pipeline))
            .and_then(|_| importer.sync_balances());

        let outcome = match result {
            Ok(balances) => {
                info!(
                    importer = %tag,
                    txns = pipeline.pending().len(),
                    balances = balances.len(),
                    "api import completed"
                );
                RunOutcome::Api {
                    syncdata: importer.syncdata(),
                    balances: Some(balances),
                    error: None,
                    config: request.config,
                }
            }
            Err(e) => {
                // kept transactions keep the cursor that produced them
                let syncdata = if e.is_fatal() {
                    error!(importer = %tag, error = %e, "api import aborted");
                    pipeline.discard_pending();
                    None
                } else {
                    warn!(importer = %tag, error = %e, "api import failed");
                    importer.syncdata()
                };
                RunOutcome::Api {
                    syncdata,
                    balances: None,
                    error: Some(PayloadError::Sync(failure(&e))),
                    config: request.config,
                }
            }
        };

        let payload = pipeline.commit(outcome);
        self.publisher.publish(API_IMPORT_FINISHED, &payload)?;
        debug!(txns = payload.txns.len(), "api import payload published");
        Ok(payload)
    }
}

fn check_options(importer: &dyn ApiImporter, provided: &BTreeMap<String, String>) -> Result<()> {
    let missing: Vec<&str> = importer
        .required_options()
        .iter()
        .copied()
        .filter(|name| provided.get(*name).map_or(true, |v| v.trim().is_empty()))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::sync_auth(format!("missing required fields: {}", missing.join(", "))))
    }
}

/// Error object reported for a failed sync
fn failure(e: &Error) -> SyncFailure {
    match e {
        Error::Sync(message) | Error::SyncAuth(message) => SyncFailure {
            auth_failed: matches!(e, Error::SyncAuth(_)),
            message: truncate(message, MAX_SYNC_MESSAGE_LEN),
            internal_message: None,
            kind: e.kind().to_string(),
        },
        other => SyncFailure {
            auth_failed: false,
            message: GENERIC_SYNC_MESSAGE.to_string(),
            internal_message: Some(other.to_string()),
            kind: other.kind().to_string(),
        },
    }
}

fn truncate(message: &str, max: usize) -> String {
    message.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::normalizer::StandardNormalizer;
    use crate::adapters::publisher::MemoryPublisher;
    use crate::domain::{ApiBalance, CurrencyDescriptor, TxnParams};
    use rust_decimal_macros::dec;
    use serde_json::json;

    struct Scripted {
        fail_with: Option<fn() -> Error>,
        /// (external id, payload sequence number)
        records: Vec<(&'static str, u32)>,
    }

    impl ApiImporter for Scripted {
        fn tag(&self) -> &str {
            "scripted"
        }

        fn required_options(&self) -> &[&str] {
            &["api_key", "api_secret"]
        }

        fn import(&mut self, pipeline: &mut ImportPipeline) -> Result<()> {
            let btc = CurrencyDescriptor::symbol("BTC")?;
            for (id, seq) in &self.records {
                pipeline.sync_receive(
                    TxnParams::new("2021-03-01 10:00:00")
                        .amount("0.25", btc.clone())
                        .external_id(*id)
                        .external_data(json!({ "seq": seq })),
                )?;
            }
            match self.fail_with {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }

        fn sync_balances(&mut self) -> Result<Vec<ApiBalance>> {
            Ok(vec![ApiBalance {
                currency: CurrencyDescriptor::symbol("BTC")?,
                amount: dec!(0.25),
            }])
        }

        fn syncdata(&self) -> Option<JsonValue> {
            Some(json!({ "version": 2, "cursor": "abc" }))
        }
    }

    fn service(policy: DuplicatePolicy) -> (ApiImportService, Arc<MemoryPublisher>) {
        let publisher = Arc::new(MemoryPublisher::new());
        let service = ApiImportService::new(Arc::new(StandardNormalizer::new()), publisher.clone(), policy);
        (service, publisher)
    }

    fn request() -> ApiImportRequest {
        ApiImportRequest {
            request_id: "req-9".into(),
            wallet_id: "wallet-1".into(),
            api_options: [("api_key", "k"), ("api_secret", "s")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_successful_run() {
        let (service, publisher) = service(DuplicatePolicy::Tolerant);
        let mut importer = Scripted {
            fail_with: None,
            records: vec![("a", 1), ("b", 2)],
        };
        let payload = service.run(request(), &mut importer).unwrap();

        assert_eq!(payload.wallet_id.as_deref(), Some("wallet-1"));
        assert_eq!(payload.txns.len(), 2);
        assert!(payload.txns.iter().all(|t| t.synced));
        assert_eq!(payload.txns[0].importer_tag.as_deref(), Some("scripted"));
        assert_eq!(payload.version, Some(json!(2)));
        assert_eq!(payload.config, Some(json!({})));
        assert_eq!(payload.api_balances.unwrap()[0].amount, dec!(0.25));
        assert!(payload.error.is_none());
        assert_eq!(publisher.published()[0].0, API_IMPORT_FINISHED);
    }

    #[test]
    fn test_missing_options_is_auth_failure() {
        let (service, _) = service(DuplicatePolicy::Tolerant);
        let mut importer = Scripted {
            fail_with: None,
            records: vec![("a", 1)],
        };
        let mut req = request();
        req.api_options.remove("api_secret");
        req.api_options.insert("api_key".into(), "  ".into());

        let payload = service.run(req, &mut importer).unwrap();
        assert!(payload.txns.is_empty());
        match payload.error {
            Some(PayloadError::Sync(f)) => {
                assert!(f.auth_failed);
                assert_eq!(f.message, "missing required fields: api_key, api_secret");
                assert_eq!(f.kind, "SyncAuthError");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_sync_error_message_truncated() {
        let (service, _) = service(DuplicatePolicy::Tolerant);
        let mut importer = Scripted {
            fail_with: Some(|| Error::sync("x".repeat(400))),
            records: vec![("a", 1)],
        };
        let payload = service.run(request(), &mut importer).unwrap();
        // partial results survive a recoverable failure
        assert_eq!(payload.txns.len(), 1);
        assert_eq!(payload.api_syncdata, Some(json!({ "version": 2, "cursor": "abc" })));
        assert_eq!(payload.version, Some(json!(2)));
        match payload.error {
            Some(PayloadError::Sync(f)) => {
                assert!(!f.auth_failed);
                assert_eq!(f.message.len(), MAX_SYNC_MESSAGE_LEN);
                assert!(f.internal_message.is_none());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_error_uses_generic_message() {
        let (service, _) = service(DuplicatePolicy::Tolerant);
        let mut importer = Scripted {
            fail_with: Some(|| Error::Format("unexpected token".into())),
            records: vec![],
        };
        let payload = service.run(request(), &mut importer).unwrap();
        match payload.error {
            Some(PayloadError::Sync(f)) => {
                assert_eq!(f.message, GENERIC_SYNC_MESSAGE);
                assert_eq!(
                    f.internal_message.as_deref(),
                    Some("Format error: unexpected token")
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_redelivered_record_dropped() {
        let (service, _) = service(DuplicatePolicy::Strict);
        let mut importer = Scripted {
            fail_with: None,
            records: vec![("a", 1), ("b", 2), ("a", 1)],
        };
        let payload = service.run(request(), &mut importer).unwrap();
        assert_eq!(payload.txns.len(), 2);
        assert!(payload.error.is_none());
    }

    #[test]
    fn test_external_id_collision_discards_run() {
        let (service, _) = service(DuplicatePolicy::Strict);
        let mut importer = Scripted {
            fail_with: None,
            records: vec![("a", 1), ("b", 2), ("a", 3)],
        };
        let payload = service.run(request(), &mut importer).unwrap();
        assert!(payload.txns.is_empty());
        assert!(payload.api_syncdata.is_none());
        match payload.error {
            Some(PayloadError::Sync(f)) => {
                assert_eq!(f.kind, "IntegrityError");
                assert_eq!(f.message, GENERIC_SYNC_MESSAGE);
                assert_eq!(
                    f.internal_message.as_deref(),
                    Some("Integrity error: duplicate external_id detected - a")
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
