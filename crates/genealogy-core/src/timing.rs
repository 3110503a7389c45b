//! Per-stage wall-clock timing for pipeline runs.
//!
//! Samples live in thread-local buffers. Scoped batch workers drain their own
//! buffer with [`take_samples`] and the coordinating thread merges them back
//! with [`absorb_samples`] so a single report covers the whole batch.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Environment variable that switches timing on.
pub const TIMING_ENV: &str = "GENEALOGY_TIMING";

/// One recorded stage execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSample {
    pub stage: &'static str,
    pub elapsed: Duration,
}

/// Summary for one stage across all of its samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTiming {
    pub stage: &'static str,
    pub runs: usize,
    #[serde(rename = "total_us", serialize_with = "as_micros")]
    pub total: Duration,
    #[serde(rename = "p50_us", serialize_with = "as_micros")]
    pub p50: Duration,
    #[serde(rename = "p95_us", serialize_with = "as_micros")]
    pub p95: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimingReport {
    pub stages: Vec<StageTiming>,
}

thread_local! {
    static SAMPLES: RefCell<Vec<StageSample>> = const { RefCell::new(Vec::new()) };
}

static ENABLED: AtomicBool = AtomicBool::new(false);

/// `GENEALOGY_TIMING` set to `1`, `true`, `yes` or `on`.
#[must_use]
pub fn enabled_from_env() -> bool {
    std::env::var(TIMING_ENV).is_ok_and(|value| {
        ["1", "true", "yes", "on"]
            .iter()
            .any(|truthy| value.trim().eq_ignore_ascii_case(truthy))
    })
}

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
    if !enabled {
        drop(take_samples());
    }
}

#[must_use]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Run `f`, recording its duration under `stage` when timing is on.
pub fn timed<R>(stage: &'static str, f: impl FnOnce() -> R) -> R {
    if !is_enabled() {
        return f();
    }
    let started = Instant::now();
    let out = f();
    let elapsed = started.elapsed();
    SAMPLES.with(|samples| samples.borrow_mut().push(StageSample { stage, elapsed }));
    out
}

/// Drain this thread's samples.
#[must_use = "drained samples are lost unless absorbed"]
pub fn take_samples() -> Vec<StageSample> {
    SAMPLES.with(|samples| std::mem::take(&mut *samples.borrow_mut()))
}

/// Append samples gathered on another thread to this thread's buffer.
pub fn absorb_samples(extra: Vec<StageSample>) {
    if extra.is_empty() {
        return;
    }
    SAMPLES.with(|samples| samples.borrow_mut().extend(extra));
}

/// Drain this thread's samples into a per-stage report, stages sorted by
/// name.
#[must_use]
pub fn collect_report() -> TimingReport {
    let mut by_stage: BTreeMap<&'static str, Vec<Duration>> = BTreeMap::new();
    for sample in take_samples() {
        by_stage.entry(sample.stage).or_default().push(sample.elapsed);
    }
    let stages = by_stage
        .into_iter()
        .map(|(stage, mut values)| {
            values.sort_unstable();
            StageTiming {
                stage,
                runs: values.len(),
                total: values.iter().sum(),
                p50: nearest_rank(&values, 50),
                p95: nearest_rank(&values, 95),
            }
        })
        .collect();
    TimingReport { stages }
}

impl TimingReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Fixed-width table for stderr.
    #[must_use]
    pub fn table(&self) -> String {
        if self.stages.is_empty() {
            return "no stage timings recorded\n".to_string();
        }
        let mut out = format!(
            "{:<14} {:>6} {:>10} {:>10} {:>10}\n",
            "stage", "runs", "total", "p50", "p95"
        );
        for st in &self.stages {
            let _ = writeln!(
                out,
                "{:<14} {:>6} {:>10} {:>10} {:>10}",
                st.stage,
                st.runs,
                human(st.total),
                human(st.p50),
                human(st.p95)
            );
        }
        out
    }
}

fn nearest_rank(sorted: &[Duration], pct: usize) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = (pct.min(100) * sorted.len()).div_ceil(100);
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

fn human(d: Duration) -> String {
    let us = d.as_micros();
    if us >= 1_000_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else if us >= 1_000 {
        format!("{}.{:03}ms", us / 1_000, us % 1_000)
    } else {
        format!("{us}µs")
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn as_micros<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
}
