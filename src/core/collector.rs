//! Source collector seam and its timeout/failure boundary.
//!
//! Every data source implements [`Collector`]. The refresh cycle never calls
//! `fetch` directly: it goes through [`run_collector`], which bounds the call
//! with the collector's timeout and turns any failure into an empty
//! contribution plus a `warn!` line.

use std::future::Future;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::time::timeout;

use crate::core::models::{ProviderTotal, SourceHealth, UsageRecord};
use crate::error::{MeterError, Result};

/// Output of one collector call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collected {
    pub records: Vec<UsageRecord>,
    /// Running totals from vendors without per-event records.
    pub totals: Vec<ProviderTotal>,
}

impl Collected {
    #[must_use]
    pub const fn records(records: Vec<UsageRecord>) -> Self {
        Self {
            records,
            totals: Vec::new(),
        }
    }

    #[must_use]
    pub fn total(total: ProviderTotal) -> Self {
        Self {
            records: Vec::new(),
            totals: vec![total],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len() + self.totals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Union another collector's output into this one.
    pub fn extend(&mut self, other: Self) {
        self.records.extend(other.records);
        self.totals.extend(other.totals);
    }
}

/// A usage source.
pub trait Collector: Send + Sync {
    /// Stable name used in logs and source health.
    fn name(&self) -> &'static str;

    /// Upper bound for one `fetch` call.
    fn timeout(&self) -> Duration;

    fn fetch(&self) -> BoxFuture<'_, Result<Collected>>;
}

/// Value plus health of one guarded call.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: Option<T>,
    pub health: SourceHealth,
}

impl<T> Outcome<T> {
    /// Set the record count reported in source health.
    #[must_use]
    pub fn with_records(mut self, records: usize) -> Self {
        self.health.records = records;
        self
    }
}

/// Run a fallible source call under a timeout.
///
/// Never fails: errors and timeouts become `value: None` with unhealthy status.
pub async fn run_with_timeout<T, F>(name: &str, limit: Duration, fut: F) -> Outcome<T>
where
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(MeterError::Timeout {
            source_name: name.to_string(),
            seconds: limit.as_secs(),
        }),
    };
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(value) => {
            tracing::debug!(source = name, duration_ms, "source fetch succeeded");
            Outcome {
                value: Some(value),
                health: SourceHealth {
                    source: name.to_string(),
                    healthy: true,
                    records: 0,
                    duration_ms,
                    error: None,
                },
            }
        }
        Err(e) => {
            tracing::warn!(
                source = name,
                error = %e,
                code = e.error_code(),
                retryable = e.is_retryable(),
                duration_ms,
                "source fetch failed"
            );
            Outcome {
                value: None,
                health: SourceHealth {
                    source: name.to_string(),
                    healthy: false,
                    records: 0,
                    duration_ms,
                    error: Some(e.to_string()),
                },
            }
        }
    }
}

/// Run one collector through the timeout/failure boundary.
pub async fn run_collector(collector: &dyn Collector) -> (Collected, SourceHealth) {
    let outcome = run_with_timeout(collector.name(), collector.timeout(), collector.fetch()).await;
    let collected = outcome.value.unwrap_or_default();
    let mut health = outcome.health;
    health.records = collected.len();
    (collected, health)
}

/// Run collectors concurrently and wait for all of them.
pub async fn run_all(collectors: &[Box<dyn Collector>]) -> Vec<(Collected, SourceHealth)> {
    let futures: Vec<_> = collectors
        .iter()
        .map(|collector| run_collector(collector.as_ref()))
        .collect();

    futures::future::join_all(futures).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_record;

    struct Fixed(Result<Collected>);

    impl Collector for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }

        fn fetch(&self) -> BoxFuture<'_, Result<Collected>> {
            let result = match &self.0 {
                Ok(collected) => Ok(collected.clone()),
                Err(e) => Err(MeterError::Network(e.to_string())),
            };
            Box::pin(async move { result })
        }
    }

    struct Slow;

    impl Collector for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(20)
        }

        fn fetch(&self) -> BoxFuture<'_, Result<Collected>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Collected::default())
            })
        }
    }

    #[tokio::test]
    async fn healthy_collector_reports_record_count() {
        let collector = Fixed(Ok(Collected::records(vec![
            make_record("Main", 1.0),
            make_record("Main", 2.0),
        ])));
        let (collected, health) = run_collector(&collector).await;
        assert_eq!(collected.records.len(), 2);
        assert!(health.healthy);
        assert_eq!(health.records, 2);
    }

    #[tokio::test]
    async fn failure_degrades_to_empty() {
        let collector = Fixed(Err(MeterError::Network("connection refused".to_string())));
        let (collected, health) = run_collector(&collector).await;
        assert!(collected.is_empty());
        assert!(!health.healthy);
        assert!(health.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn timeout_degrades_to_empty() {
        let (collected, health) = run_collector(&Slow).await;
        assert!(collected.is_empty());
        assert!(!health.healthy);
        assert!(health.error.unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn run_all_keeps_healthy_output_next_to_failures() {
        let collectors: Vec<Box<dyn Collector>> = vec![
            Box::new(Fixed(Ok(Collected::records(vec![make_record("Main", 1.0)])))),
            Box::new(Slow),
        ];
        let outcomes = run_all(&collectors).await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].0.records.len(), 1);
        assert!(!outcomes[1].1.healthy);
    }

    #[test]
    fn guarded_call_passes_value_through() {
        let outcome = tokio_test::block_on(run_with_timeout("ok", Duration::from_secs(1), async {
            Ok::<_, MeterError>(7)
        }));
        assert_eq!(outcome.value, Some(7));
        assert!(outcome.health.healthy);
        assert_eq!(outcome.with_records(3).health.records, 3);
    }

    #[test]
    fn extend_unions_records_and_totals() {
        let mut union = Collected::records(vec![make_record("Main", 1.0)]);
        union.extend(Collected::total(ProviderTotal {
            provider: "OpenRouter".to_string(),
            total_cost: 2.0,
            remaining_credit: None,
        }));
        union.extend(Collected::records(vec![make_record("Helper", 0.5)]));

        assert_eq!(union.len(), 3);
        assert_eq!(union.records[1].agent, "Helper");
        assert_eq!(union.totals[0].provider, "OpenRouter");
    }
}
