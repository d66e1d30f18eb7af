//! Bounded-concurrency batch evaluation.
//!
//! Every context is assessed on the blocking pool under a time limit. A
//! context that times out, panics or is skipped after cancellation becomes a
//! failure entry in the summary; it never aborts the batch.

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use vantage::data::{CalculationContext, DataError};
use vantage::metrics::MetricEngine;
use vantage::output::BatchSummary;
use vantage::valuation::ValuationDeriver;
use vantage::{Assessment, ValuationInputs, assess};

use crate::config::BatchConfig;

/// Assessments and summary of one batch.
#[derive(Debug)]
pub(crate) struct BatchReport {
    /// Successful assessments ordered by ticker then as-of date.
    pub assessments: Vec<Assessment>,
    /// Per-metric tallies and the contexts that were not evaluated.
    pub summary: BatchSummary,
}

type Outcome = (String, NaiveDate, Result<Assessment, String>);

/// Runs many contexts against one compiled catalog.
#[derive(Debug)]
pub(crate) struct BatchRunner {
    engine: MetricEngine,
    deriver: ValuationDeriver,
    inputs: Arc<ValuationInputs>,
    config: BatchConfig,
    cancel: Arc<AtomicBool>,
}

impl BatchRunner {
    pub(crate) fn new(
        engine: MetricEngine,
        deriver: ValuationDeriver,
        inputs: ValuationInputs,
        config: BatchConfig,
    ) -> Self {
        Self {
            engine,
            deriver,
            inputs: Arc::new(inputs),
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the batch from starting further contexts once set.
    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub(crate) async fn run(
        &self,
        contexts: Vec<CalculationContext>,
        progress: Option<&ProgressBar>,
    ) -> BatchReport {
        let concurrency = self.config.concurrency.max(1);
        let timeout = self.config.timeout();
        info!(contexts = contexts.len(), concurrency, timeout_ms = self.config.timeout_ms, "batch started");

        let mut outcomes: Vec<Outcome> = stream::iter(contexts)
            .map(|context| {
                let engine = self.engine.clone();
                let deriver = self.deriver.clone();
                let inputs = Arc::clone(&self.inputs);
                let cancel = Arc::clone(&self.cancel);
                async move {
                    let ticker = context.ticker.clone();
                    let as_of = context.as_of;
                    if cancel.load(Ordering::Relaxed) {
                        return (ticker, as_of, Err("cancelled".to_string()));
                    }
                    let task = tokio::task::spawn_blocking(move || {
                        let inputs = ValuationInputs::clone(&inputs).or_from_context(&context);
                        assess(&engine, &deriver, &context, &inputs)
                    });
                    let outcome = match tokio::time::timeout(timeout, task).await {
                        Ok(Ok(assessment)) => Ok(assessment),
                        Ok(Err(e)) => Err(format!("evaluation aborted: {e}")),
                        Err(_) => Err(format!("timed out after {} ms", timeout.as_millis())),
                    };
                    (ticker, as_of, outcome)
                }
            })
            .buffer_unordered(concurrency)
            .inspect(|(ticker, as_of, outcome)| {
                if let Err(reason) = outcome {
                    warn!(%ticker, %as_of, %reason, "context not evaluated");
                }
                if let Some(pb) = progress {
                    pb.inc(1);
                }
            })
            .collect()
            .await;

        outcomes.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));

        let mut summary = BatchSummary::new();
        let mut assessments = Vec::with_capacity(outcomes.len());
        for (ticker, as_of, outcome) in outcomes {
            match outcome {
                Ok(assessment) => {
                    summary.record(&assessment.evaluation);
                    assessments.push(assessment);
                }
                Err(reason) => summary.record_failure(ticker, as_of, reason),
            }
        }
        info!(%summary, "batch finished");

        BatchReport {
            assessments,
            summary,
        }
    }
}

/// Set `cancel` on Ctrl-C.
pub(crate) fn cancel_on_ctrl_c(cancel: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight contexts");
            cancel.store(true, Ordering::Relaxed);
        }
    });
}

/// Read contexts from a JSON file (one object or an array) or from every
/// `.json` file of a directory, in file name order.
pub(crate) fn load_contexts(path: &Path) -> Result<Vec<CalculationContext>, DataError> {
    if !path.is_dir() {
        return CalculationContext::many_from_json_str(&std::fs::read_to_string(path)?);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let file = entry?.path();
        if file.extension().is_some_and(|ext| ext == "json") {
            files.push(file);
        }
    }
    files.sort();

    let mut contexts = Vec::new();
    for file in files {
        contexts.extend(CalculationContext::many_from_json_str(&std::fs::read_to_string(&file)?)?);
    }
    Ok(contexts)
}
