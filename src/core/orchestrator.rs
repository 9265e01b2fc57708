// src/core/orchestrator.rs

//! Fans an audit out to its selected checks and streams results back.
//!
//! Every check runs on its own task under its own deadline. A check's result
//! is written to the run's aggregate and then emitted as an event, so the
//! first event never waits for the slowest check. Nothing a check does
//! (error, error-shaped payload, panic, timeout) reaches another check.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::aggregate::{RecordOutcome, ResultAggregate};
use crate::core::checks::{CheckAdapter, Progress};
use crate::core::envelope::with_timeout_else;
use crate::core::error::AuditError;
use crate::core::models::{AuditSnapshot, CheckEvent, CheckId, CheckResult};
use crate::core::registry::{resolve, CheckDescriptor, ScanRegistry};
use crate::core::target::{normalize_target, Target};

pub struct Orchestrator {
    registry: Arc<ScanRegistry>,
}

impl Orchestrator {
    pub fn new(registry: Arc<ScanRegistry>) -> Self {
        Self { registry }
    }

    /// Starts an audit of `raw_target` with the checks named in `selected`.
    ///
    /// Validation happens up front: an invalid target, an empty selection or
    /// an unknown id rejects the whole run before any check starts. After
    /// that the run cannot fail; every selected check produces exactly one
    /// event. Must be called from within a Tokio runtime.
    pub fn run_audit<S: AsRef<str>>(&self, raw_target: &str, selected: &[S]) -> Result<AuditRun, AuditError> {
        let target = normalize_target(raw_target)?;
        if selected.is_empty() {
            return Err(AuditError::InvalidInput("Select at least one scan.".to_string()));
        }

        let mut checks: Vec<(CheckDescriptor, Arc<dyn CheckAdapter>)> = Vec::new();
        let mut ids = BTreeSet::new();
        for name in selected {
            let descriptor = resolve(name.as_ref())?;
            if !ids.insert(descriptor.id) {
                debug!(check = %descriptor.id, "Check selected twice, running it once.");
                continue;
            }
            let adapter = self
                .registry
                .adapter(descriptor.id)
                .ok_or_else(|| AuditError::UnknownCheck(descriptor.id.to_string()))?;
            checks.push((descriptor, adapter));
        }

        info!(target = target.as_str(), checks = checks.len(), "Starting audit.");
        let aggregate = Arc::new(Mutex::new(ResultAggregate::new(ids.clone())));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        for (descriptor, adapter) in checks {
            let input = descriptor.input.derive(&target, self.registry.workspace());
            spawn_check(descriptor, adapter, input, aggregate.clone(), events_tx.clone());
        }

        Ok(AuditRun {
            target,
            selected: ids.into_iter().collect(),
            started_at: Utc::now(),
            aggregate,
            events: events_rx,
        })
    }
}

fn spawn_check(
    descriptor: CheckDescriptor,
    adapter: Arc<dyn CheckAdapter>,
    input: crate::core::checks::CheckInput,
    aggregate: Arc<Mutex<ResultAggregate>>,
    events: mpsc::UnboundedSender<CheckEvent>,
) {
    let id = descriptor.id;
    let progress = Progress::default();
    let partial = progress.clone();

    let operation = async move {
        match AssertUnwindSafe(adapter.run(input, progress)).catch_unwind().await {
            Ok(outcome) => CheckResult::from_adapter(outcome),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(check = %id, panic = %message, "Check panicked.");
                CheckResult::Failure(format!("check panicked: {message}"))
            }
        }
    };

    tokio::spawn(async move {
        let started = Instant::now();
        debug!(check = %id, budget_ms = descriptor.timeout.as_millis() as u64, "Check started.");
        let result = with_timeout_else(operation, descriptor.timeout, move || {
            CheckResult::TimedOut(partial.latest())
        })
        .await;

        info!(
            check = %id,
            status = result.status_label(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Check settled."
        );
        if aggregate.lock().record(id, result.clone()) == RecordOutcome::Recorded {
            // The receiver may already be gone if the run was discarded.
            let _ = events.send(CheckEvent { id, result });
        }
    });
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// One user-initiated audit. Dropping it discards the run; checks still in
/// flight finish in the background and their results are dropped.
pub struct AuditRun {
    target: Target,
    selected: Vec<CheckId>,
    started_at: DateTime<Utc>,
    aggregate: Arc<Mutex<ResultAggregate>>,
    events: mpsc::UnboundedReceiver<CheckEvent>,
}

impl AuditRun {
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn selected(&self) -> &[CheckId] {
        &self.selected
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn snapshot(&self) -> AuditSnapshot {
        let aggregate = self.aggregate.lock();
        AuditSnapshot {
            target: self.target.as_str().to_string(),
            started_at: self.started_at,
            selected: self.selected.clone(),
            results: aggregate.snapshot(),
            settled: aggregate.is_settled(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.aggregate.lock().is_settled()
    }

    /// The next settled check, or `None` once every selected check has reported.
    pub async fn next_event(&mut self) -> Option<CheckEvent> {
        self.events.recv().await
    }

    /// Non-blocking variant of [`AuditRun::next_event`], for render loops.
    pub fn try_next_event(&mut self) -> Option<CheckEvent> {
        self.events.try_recv().ok()
    }

    /// Drains the remaining events and returns the settled snapshot.
    pub async fn wait_settled(&mut self) -> AuditSnapshot {
        while self.next_event().await.is_some() {}
        self.snapshot()
    }
}
