use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::daily::DailySummary;

/// Persistence boundary the batch writes through. The engine never talks to
/// storage directly; retries and conflict handling live behind this trait.
#[async_trait]
pub trait SummarySink: Send + Sync {
    async fn save(&self, summary: DailySummary) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub processed_dates: usize,
    pub failures: Vec<BatchFailure>,
    pub duration_ms: u64,
}

/// Recomputes daily summaries for a set of historical dates, one
/// independent task per date.
///
/// Each date's computation is pure and owns no state shared with any other
/// date, so the whole batch fans out onto the runtime's worker threads. A
/// failing date is recorded and never aborts the rest of the batch.
pub struct BatchXirrRecalculator<C> {
    calculator: Arc<C>,
    sink: Arc<dyn SummarySink>,
}

impl<C> BatchXirrRecalculator<C>
where
    C: Fn(NaiveDate) -> anyhow::Result<DailySummary> + Send + Sync + 'static,
{
    pub fn new(calculator: C, sink: Arc<dyn SummarySink>) -> Self {
        Self {
            calculator: Arc::new(calculator),
            sink,
        }
    }

    pub async fn recompute(&self, dates: Vec<NaiveDate>) -> BatchOutcome {
        let started = Instant::now();
        let total = dates.len();
        tracing::info!(total, "starting batch summary recomputation");

        let mut tasks = JoinSet::new();
        for date in dates {
            let calculator = Arc::clone(&self.calculator);
            let sink = Arc::clone(&self.sink);
            tasks.spawn(async move {
                let result = match calculator(date) {
                    Ok(summary) => sink.save(summary).await,
                    Err(err) => Err(err),
                };
                (date, result.err().map(|e| e.to_string()))
            });
        }

        let mut processed_dates = 0;
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, None)) => processed_dates += 1,
                Ok((date, Some(message))) => {
                    tracing::warn!(%date, "summary recomputation failed: {message}");
                    failures.push(BatchFailure {
                        key: date.to_string(),
                        message,
                    });
                }
                Err(err) => {
                    tracing::error!("batch task panicked: {err}");
                    failures.push(BatchFailure {
                        key: "task".to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let outcome = BatchOutcome {
            processed_dates,
            failures,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            processed = outcome.processed_dates,
            failed = outcome.failures.len(),
            duration_ms = outcome.duration_ms,
            "✅ batch summary recomputation complete"
        );
        outcome
    }
}
