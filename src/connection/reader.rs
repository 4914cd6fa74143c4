//! Background reader loop
//!
//! Runs on the blocking pool, owns its transport, and exits on cancellation,
//! the first read error, or end of stream. It never retries.

use super::state::SharedState;
use crate::metrics::Metrics;
use crate::reading::parse_line;
use crate::transport::{LineRead, Transport, TransportError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, trace, warn};

/// Longest prefix of a discarded line that gets logged
const LOG_LINE_LIMIT: usize = 80;

/// Everything a reader task owns
pub(crate) struct ReaderContext {
    pub transport: Box<dyn Transport>,
    pub state: Arc<SharedState>,
    pub metrics: Arc<Metrics>,
    pub cancel: Arc<AtomicBool>,
    pub generation: u64,
    pub read_timeout: Duration,
    pub session_id: String,
}

enum ReaderExit {
    Cancelled,
    Failed(TransportError),
}

pub(crate) fn run(ctx: ReaderContext) {
    let ReaderContext {
        mut transport,
        state,
        metrics,
        cancel,
        generation,
        read_timeout,
        session_id,
    } = ctx;

    let endpoint = transport.endpoint().to_string();
    let span = info_span!("reader", session_id = %session_id, endpoint = %endpoint);
    let _enter = span.enter();

    info!(?read_timeout, "Reader started");

    let exit = loop {
        if cancel.load(Ordering::SeqCst) {
            break ReaderExit::Cancelled;
        }

        let line = match transport.read_line(read_timeout) {
            Ok(LineRead::Line(line)) => line,
            Ok(LineRead::Timeout) => {
                trace!("Read timed out, checking for cancellation");
                continue;
            }
            Err(e) => break ReaderExit::Failed(e),
        };

        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line) {
            Some(record) => {
                if state.publish(generation, &record) {
                    metrics.record_line_received();
                    metrics.record_reading_published();
                    trace!(?record, "Published reading");
                } else {
                    debug!("Session superseded, dropping reading");
                }
            }
            None => {
                let current = state.with_session(generation, |s| {
                    s.lines_received += 1;
                    s.lines_discarded += 1;
                });
                if current {
                    metrics.record_line_received();
                    metrics.record_line_discarded();
                }
                debug!(line = %truncate(&line), "Discarded non-record line");
            }
        }
    };

    match exit {
        ReaderExit::Cancelled => {
            info!("Reader cancelled");
        }
        ReaderExit::Failed(e) => {
            let message = format!("read error on {}: {}", endpoint, e);
            let current = state.with_session(generation, |s| {
                s.connected = false;
                s.endpoint_id = None;
                s.session_id = None;
                s.last_error = Some(message);
            });
            if current {
                metrics.record_read_error();
                metrics.set_connected(false);
                warn!(error = %e, "Transport read failed, link closed");
            } else {
                debug!(error = %e, "Superseded reader hit a read error");
            }
        }
    }

    if let Err(e) = transport.close() {
        warn!(error = %e, "Failed to close transport");
    }
    debug!("Reader exited");
}

fn truncate(line: &str) -> &str {
    match line.char_indices().nth(LOG_LINE_LIMIT) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockBehavior, MockTransportFactory, TransportFactory};

    fn context(factory: &MockTransportFactory, state: &Arc<SharedState>) -> ReaderContext {
        let generation = state.begin_session("mock0", "test");
        ReaderContext {
            transport: factory.open("mock0", 9600).unwrap(),
            state: Arc::clone(state),
            metrics: Arc::new(Metrics::new()),
            cancel: Arc::new(AtomicBool::new(false)),
            generation,
            read_timeout: Duration::from_millis(20),
            session_id: "test".to_string(),
        }
    }

    #[test]
    fn test_noise_yields_single_update() {
        let factory = MockTransportFactory::new();
        factory.set_behavior(
            "mock0",
            MockBehavior::LinesThenEof(vec![
                r#"{"temperature":20.5,"gas":900,"moisture":41.0}"#.to_string(),
                "".to_string(),
                "BOOT v1.2".to_string(),
                r#"{"temperature":33.09}"#.to_string(),
            ]),
        );
        let state = Arc::new(SharedState::new());

        run(context(&factory, &state));

        let snapshot = state.snapshot();
        let reading = snapshot.last_reading.unwrap();
        assert_eq!(reading.temperature, Some(33.09));
        assert_eq!(reading.gas, Some(900.0));
        assert_eq!(reading.moisture, Some(41.0));
        assert_eq!(snapshot.readings_published, 2);
        assert_eq!(snapshot.lines_discarded, 1);
        assert_eq!(factory.released(), 1);
    }

    #[test]
    fn test_read_error_records_and_exits() {
        let factory = MockTransportFactory::new();
        factory.set_behavior("mock0", MockBehavior::LinesThenError(vec![]));
        let state = Arc::new(SharedState::new());

        run(context(&factory, &state));

        let snapshot = state.snapshot();
        assert!(!snapshot.connected);
        assert!(snapshot.endpoint_id.is_none());
        assert!(snapshot.last_error.unwrap().contains("device unplugged"));
        assert_eq!(factory.released(), 1);
    }

    #[test]
    fn test_cancelled_before_read_leaves_error_untouched() {
        let factory = MockTransportFactory::new();
        let state = Arc::new(SharedState::new());
        let ctx = context(&factory, &state);
        ctx.cancel.store(true, Ordering::SeqCst);

        run(ctx);

        assert!(state.snapshot().last_error.is_none());
        assert_eq!(factory.released(), 1);
    }

    #[test]
    fn test_superseded_reader_records_no_metrics() {
        let factory = MockTransportFactory::new();
        factory.set_behavior(
            "mock0",
            MockBehavior::LinesThenError(vec![
                r#"{"temperature":20.5,"gas":900,"moisture":41.0}"#.to_string(),
                "BOOT v1.2".to_string(),
            ]),
        );
        let state = Arc::new(SharedState::new());
        let ctx = context(&factory, &state);
        let metrics = Arc::clone(&ctx.metrics);
        state.retire_session();

        run(ctx);

        let output = metrics.export_prometheus();
        assert!(output.contains("sensorlink_lines_received_total 0"));
        assert!(output.contains("sensorlink_read_errors_total 0"));
        assert_eq!(metrics.get_readings_published(), 0);
        assert_eq!(metrics.get_lines_discarded(), 0);
        assert!(state.snapshot().last_error.is_none());
        assert_eq!(factory.released(), 1);
    }

    #[test]
    fn test_truncate_long_lines() {
        let line = "x".repeat(200);
        assert_eq!(truncate(&line).len(), LOG_LINE_LIMIT);
        assert_eq!(truncate("short"), "short");
    }
}
