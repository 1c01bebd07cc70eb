//! Wall-clock timing instrumentation.
//!
//! # Responsibility
//! - Record operation durations (milliseconds, `f64`) under string labels.
//! - Expose per-label aggregates: retained count, average, latest sample.
//!
//! # Invariants
//! - Each label keeps at most `window` samples; the oldest is dropped first.
//! - A `Timer` records exactly once: on `stop()`, or on drop if never stopped.
//! - Monitors are explicit instances shared by `Arc`; there is no global one.

use log::trace;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Samples retained per label unless configured otherwise.
pub const DEFAULT_METRICS_WINDOW: usize = 100;

/// Aggregate view of one label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    /// Mean of retained samples in milliseconds.
    pub average: f64,
    /// Number of retained samples, not total calls ever made.
    pub count: usize,
    /// Most recent sample in milliseconds.
    pub latest: f64,
}

/// In-memory store of recent durations per label.
#[derive(Debug)]
pub struct PerformanceMonitor {
    window: usize,
    samples: Mutex<HashMap<String, VecDeque<f64>>>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::with_window(DEFAULT_METRICS_WINDOW)
    }
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a monitor retaining `window` samples per label (minimum 1).
    pub fn with_window(window: usize) -> Self {
        Self {
            window: window.max(1),
            samples: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Starts timing one operation under `label`.
    pub fn start_timer(&self, label: impl Into<String>) -> Timer<'_> {
        Timer {
            monitor: self,
            label: label.into(),
            started_at: Instant::now(),
            finished: false,
        }
    }

    /// Appends one sample for `label`, trimming the history to the window.
    pub fn record(&self, label: &str, duration_ms: f64) {
        {
            let mut samples = self.samples.lock();
            let history = samples.entry(label.to_string()).or_default();
            history.push_back(duration_ms);
            while history.len() > self.window {
                history.pop_front();
            }
        }
        trace!("event=timer_sample module=perf label={label} duration_ms={duration_ms:.3}");
    }

    /// Mean of retained samples, or 0 when the label has none.
    pub fn average_time(&self, label: &str) -> f64 {
        self.samples.lock().get(label).map_or(0.0, mean)
    }

    /// Aggregates for every observed label.
    pub fn metrics(&self) -> BTreeMap<String, MetricSummary> {
        self.samples
            .lock()
            .iter()
            .map(|(label, history)| {
                let summary = MetricSummary {
                    average: mean(history),
                    count: history.len(),
                    latest: history.back().copied().unwrap_or(0.0),
                };
                (label.clone(), summary)
            })
            .collect()
    }

    /// Drops every label and sample.
    pub fn clear(&self) {
        self.samples.lock().clear();
    }

    /// Runs `operation` under a timer. The sample is recorded even if it panics.
    pub fn measure<R>(&self, label: impl Into<String>, operation: impl FnOnce() -> R) -> R {
        let _timer = self.start_timer(label);
        operation()
    }

    /// Awaits `future` under a timer started at first poll.
    ///
    /// Dropping the returned future mid-flight still records a sample.
    pub async fn measure_async<F: Future>(&self, label: impl Into<String>, future: F) -> F::Output {
        let _timer = self.start_timer(label);
        future.await
    }
}

fn mean(history: &VecDeque<f64>) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    history.iter().sum::<f64>() / history.len() as f64
}

/// Running measurement returned by [`PerformanceMonitor::start_timer`].
#[must_use = "dropping a timer immediately records a near-zero sample"]
pub struct Timer<'a> {
    monitor: &'a PerformanceMonitor,
    label: String,
    started_at: Instant,
    finished: bool,
}

impl Timer<'_> {
    /// Stops the timer and returns the recorded duration in milliseconds.
    pub fn stop(mut self) -> f64 {
        self.finish()
    }

    fn finish(&mut self) -> f64 {
        self.finished = true;
        let duration_ms = self.started_at.elapsed().as_secs_f64() * 1000.0;
        self.monitor.record(&self.label, duration_ms);
        duration_ms
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.finish();
        }
    }
}

/// Wraps a synchronous function so every call is timed under `label`.
///
/// Multi-argument functions take their arguments as a tuple.
pub fn measured<A, R, F>(
    monitor: Arc<PerformanceMonitor>,
    label: impl Into<String>,
    operation: F,
) -> impl Fn(A) -> R
where
    F: Fn(A) -> R,
{
    let label = label.into();
    move |args: A| monitor.measure(label.as_str(), || operation(args))
}

/// Boxed future returned by [`measured_async`] wrappers.
pub type MeasuredFuture<R> = Pin<Box<dyn Future<Output = R>>>;

/// Wraps an async function so every returned future is timed under `label`.
pub fn measured_async<A, R, F, Fut>(
    monitor: Arc<PerformanceMonitor>,
    label: impl Into<String>,
    operation: F,
) -> impl Fn(A) -> MeasuredFuture<R>
where
    F: Fn(A) -> Fut,
    Fut: Future<Output = R> + 'static,
    R: 'static,
{
    let label = label.into();
    move |args: A| -> MeasuredFuture<R> {
        let monitor = Arc::clone(&monitor);
        let label = label.clone();
        let future = operation(args);
        Box::pin(async move { monitor.measure_async(label, future).await })
    }
}

#[cfg(test)]
mod tests {
    use super::{measured, measured_async, PerformanceMonitor};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn unknown_label_has_zero_average_and_no_metrics() {
        let monitor = PerformanceMonitor::new();
        assert_eq!(monitor.average_time("never-started"), 0.0);
        assert!(!monitor.metrics().contains_key("never-started"));
    }

    #[test]
    fn timer_records_elapsed_time() {
        let monitor = PerformanceMonitor::new();
        let timer = monitor.start_timer("sleep");
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = timer.stop();

        let metrics = monitor.metrics();
        let summary = metrics.get("sleep").expect("label should be recorded");
        assert_eq!(summary.count, 1);
        assert!(elapsed >= 10.0);
        assert_eq!(summary.latest, elapsed);
        assert_eq!(summary.average, elapsed);
    }

    #[test]
    fn dropped_timer_records_once() {
        let monitor = PerformanceMonitor::new();
        {
            let _timer = monitor.start_timer("scoped");
        }
        assert_eq!(monitor.metrics()["scoped"].count, 1);
    }

    #[test]
    fn window_keeps_most_recent_samples() {
        let monitor = PerformanceMonitor::new();
        for value in 0..150 {
            monitor.record("query", f64::from(value));
        }

        let summary = monitor.metrics()["query"];
        assert_eq!(summary.count, 100);
        assert_eq!(summary.latest, 149.0);
        // Samples 50..=149 remain.
        assert_eq!(monitor.average_time("query"), 99.5);
    }

    #[test]
    fn count_matches_calls_below_window() {
        let monitor = Arc::new(PerformanceMonitor::new());
        let add = measured(Arc::clone(&monitor), "add", |(a, b): (i32, i32)| a + b);
        for _ in 0..42 {
            assert_eq!(add((2, 3)), 5);
        }
        assert_eq!(monitor.metrics()["add"].count, 42);
    }

    #[test]
    fn custom_window_is_respected() {
        let monitor = PerformanceMonitor::with_window(3);
        for value in [1.0, 2.0, 3.0, 4.0] {
            monitor.record("small", value);
        }
        assert_eq!(monitor.metrics()["small"].count, 3);
        assert_eq!(monitor.average_time("small"), 3.0);
    }

    #[test]
    fn failing_operation_propagates_error_and_records_sample() {
        let monitor = Arc::new(PerformanceMonitor::new());
        let parse = measured(Arc::clone(&monitor), "parse", |raw: &str| {
            raw.parse::<u32>()
        });

        assert!(parse("nope").is_err());
        assert_eq!(parse("7"), Ok(7));
        assert_eq!(monitor.metrics()["parse"].count, 2);
    }

    #[test]
    fn panicking_operation_still_records_sample() {
        let monitor = PerformanceMonitor::new();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            monitor.measure("explode", || panic!("boom"))
        }));
        assert!(outcome.is_err());
        assert_eq!(monitor.metrics()["explode"].count, 1);
    }

    #[test]
    fn clear_resets_all_labels() {
        let monitor = PerformanceMonitor::new();
        monitor.record("a", 1.0);
        monitor.record("b", 2.0);
        monitor.clear();
        assert!(monitor.metrics().is_empty());
        assert_eq!(monitor.average_time("a"), 0.0);
    }

    #[tokio::test]
    async fn async_wrapper_times_each_call() {
        let monitor = Arc::new(PerformanceMonitor::new());
        let add = measured_async(Arc::clone(&monitor), "async-add", |(a, b): (u32, u32)| async move {
            tokio::task::yield_now().await;
            a + b
        });

        assert_eq!(add((2, 3)).await, 5);
        assert_eq!(add((4, 5)).await, 9);
        assert_eq!(monitor.metrics()["async-add"].count, 2);
    }

    #[tokio::test]
    async fn async_error_propagates_and_records_sample() {
        let monitor = PerformanceMonitor::new();
        let result: Result<(), String> = monitor
            .measure_async("async-fail", async { Err("store down".to_string()) })
            .await;

        assert_eq!(result, Err("store down".to_string()));
        assert_eq!(monitor.metrics()["async-fail"].count, 1);
    }
}
