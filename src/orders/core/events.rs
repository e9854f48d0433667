//! Pipeline events and the sinks that receive them.
//!
//! Every stage reports progress through an injected [`EventSink`] instead of
//! a global logger. [`TracingSink`] forwards events to `tracing`,
//! [`MemorySink`] keeps them for inspection in tests, and [`NoopSink`]
//! discards them.
use std::{fmt, sync::Mutex};

use chrono::NaiveDate;

/// Something a pipeline stage wants recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastEvent {
    /// Growth fit about to start from the given initial guess.
    FitStarted { a_init: f64, b_init: f64 },
    /// Growth fit finished with the given parameters.
    FitEnded { a: f64, b: f64 },
    /// Additive model fitted.
    AdditiveFitted { rows: usize, regressors: usize },
    /// One partition evaluated.
    PartitionEvaluated { target_date: NaiveDate, error: f64 },
    /// Forecast generated over `[start, end]`.
    ForecastGenerated { start: NaiveDate, end: NaiveDate, points: usize },
}

impl ForecastEvent {
    /// Short machine-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            ForecastEvent::FitStarted { .. } => "fit_started",
            ForecastEvent::FitEnded { .. } => "fit_ended",
            ForecastEvent::AdditiveFitted { .. } => "additive_fitted",
            ForecastEvent::PartitionEvaluated { .. } => "partition_evaluated",
            ForecastEvent::ForecastGenerated { .. } => "forecast_generated",
        }
    }
}

impl fmt::Display for ForecastEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastEvent::FitStarted { a_init, b_init } => {
                write!(f, "Starting with: {a_init} and {b_init}")
            }
            ForecastEvent::FitEnded { a, b } => write!(f, "Ended with: {a} and {b}"),
            ForecastEvent::AdditiveFitted { rows, regressors } => {
                write!(f, "Fitted additive model on {rows} rows with {regressors} regressors")
            }
            ForecastEvent::PartitionEvaluated { target_date, error } => {
                write!(f, "Error for {target_date}: {error}")
            }
            ForecastEvent::ForecastGenerated { start, end, points } => {
                write!(f, "Predicted {points} days from {start} to {end}")
            }
        }
    }
}

/// Receiver of pipeline events. Shared across rayon workers.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ForecastEvent);
}

/// Forwards events to `tracing` at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ForecastEvent) {
        tracing::info!(event = event.name(), "{}", event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: ForecastEvent) {}
}

/// Append-only in-memory sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ForecastEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far, in arrival order.
    pub fn events(&self) -> Vec<ForecastEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Rendered messages, in arrival order.
    pub fn messages(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: ForecastEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_render_in_log_format() {
        let sink = MemorySink::new();
        sink.emit(ForecastEvent::FitStarted { a_init: 4.0, b_init: 2.0 });
        sink.emit(ForecastEvent::FitEnded { a: 3.5, b: 1.25 });
        sink.emit(ForecastEvent::PartitionEvaluated {
            target_date: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            error: -12.5,
        });

        assert_eq!(
            sink.messages(),
            vec!["Starting with: 4 and 2", "Ended with: 3.5 and 1.25", "Error for 2023-03-01: -12.5"]
        );
    }

    #[test]
    fn sinks_are_usable_as_trait_objects() {
        let sinks: Vec<Box<dyn EventSink>> = vec![Box::new(NoopSink), Box::new(TracingSink)];
        for sink in &sinks {
            sink.emit(ForecastEvent::FitEnded { a: 1.0, b: 0.0 });
        }
    }
}
