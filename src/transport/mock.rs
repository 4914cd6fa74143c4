//! In-memory transport used by tests and local demos.
//!
//! Every opened handle reads from its own queue of scripted events. Lines can
//! be pushed into the currently open handle of an endpoint at any time, and
//! the factory keeps counters of how many handles were opened and released.

use super::{EndpointInfo, EndpointKind, LineRead, Transport, TransportError, TransportFactory};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// What an opened mock handle does
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Emit the lines, then stay silent until more are pushed
    Lines(Vec<String>),
    /// Emit the lines, then fail with an I/O error
    LinesThenError(Vec<String>),
    /// Emit the lines, then report end of stream
    LinesThenEof(Vec<String>),
    /// Refuse to open with this message
    FailOpen(String),
}

impl Default for MockBehavior {
    fn default() -> Self {
        MockBehavior::Lines(Vec::new())
    }
}

#[derive(Debug)]
enum MockEvent {
    Line(String),
    Error(String),
    Eof,
}

#[derive(Debug, Default)]
struct MockQueue {
    events: Mutex<VecDeque<MockEvent>>,
    ready: Condvar,
}

impl MockQueue {
    fn lock(&self) -> MutexGuard<'_, VecDeque<MockEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: MockEvent) {
        self.lock().push_back(event);
        self.ready.notify_all();
    }
}

#[derive(Debug, Default)]
struct MockShared {
    available: bool,
    behaviors: Mutex<HashMap<String, MockBehavior>>,
    queues: Mutex<HashMap<String, Arc<MockQueue>>>,
    opened: AtomicUsize,
    released: AtomicUsize,
    /// Reads currently blocked waiting for data
    waiting: AtomicUsize,
    fail_close: AtomicBool,
}

/// Factory producing in-memory transports
#[derive(Debug, Clone)]
pub struct MockTransportFactory {
    shared: Arc<MockShared>,
}

impl Default for MockTransportFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransportFactory {
    /// An available factory whose endpoints open silent handles by default
    pub fn new() -> Self {
        Self {
            shared: Arc::new(MockShared {
                available: true,
                ..Default::default()
            }),
        }
    }

    /// A factory reporting the transport subsystem as absent
    pub fn unavailable() -> Self {
        Self {
            shared: Arc::new(MockShared::default()),
        }
    }

    /// Set what the next handles opened on `endpoint` do
    pub fn set_behavior(&self, endpoint: &str, behavior: MockBehavior) {
        self.shared
            .behaviors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint.to_string(), behavior);
    }

    /// Make every subsequent `close` report a failure
    pub fn fail_close(&self, fail: bool) {
        self.shared.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Push a line into the most recently opened handle for `endpoint`.
    ///
    /// Returns false if nothing was ever opened on that endpoint.
    pub fn push_line(&self, endpoint: &str, line: impl Into<String>) -> bool {
        self.with_queue(endpoint, |queue| queue.push(MockEvent::Line(line.into())))
    }

    /// Make the most recently opened handle for `endpoint` fail its next read
    pub fn push_error(&self, endpoint: &str, message: impl Into<String>) -> bool {
        self.with_queue(endpoint, |queue| queue.push(MockEvent::Error(message.into())))
    }

    /// Number of handles opened so far
    pub fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    /// Number of handles released so far, by `close` or by drop
    pub fn released(&self) -> usize {
        self.shared.released.load(Ordering::SeqCst)
    }

    /// Handles currently held open
    pub fn open_handles(&self) -> usize {
        self.opened().saturating_sub(self.released())
    }

    /// Reads currently blocked in `read_line` with nothing to return
    pub fn waiting_reads(&self) -> usize {
        self.shared.waiting.load(Ordering::SeqCst)
    }

    fn with_queue(&self, endpoint: &str, f: impl FnOnce(&MockQueue)) -> bool {
        let queue = self
            .shared
            .queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(endpoint)
            .cloned();
        match queue {
            Some(queue) => {
                f(&queue);
                true
            }
            None => false,
        }
    }
}

impl TransportFactory for MockTransportFactory {
    fn is_available(&self) -> bool {
        self.shared.available
    }

    fn open(&self, endpoint: &str, _baud_rate: u32) -> Result<Box<dyn Transport>, TransportError> {
        if !self.shared.available {
            return Err(TransportError::Unavailable);
        }

        let behavior = self
            .shared
            .behaviors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(endpoint)
            .cloned()
            .unwrap_or_default();

        let queue = Arc::new(MockQueue::default());
        {
            let mut events = queue.lock();
            match behavior {
                MockBehavior::FailOpen(message) => {
                    return Err(TransportError::Open {
                        endpoint: endpoint.to_string(),
                        message,
                    });
                }
                MockBehavior::Lines(lines) => {
                    events.extend(lines.into_iter().map(MockEvent::Line));
                }
                MockBehavior::LinesThenError(lines) => {
                    events.extend(lines.into_iter().map(MockEvent::Line));
                    events.push_back(MockEvent::Error("device unplugged".to_string()));
                }
                MockBehavior::LinesThenEof(lines) => {
                    events.extend(lines.into_iter().map(MockEvent::Line));
                    events.push_back(MockEvent::Eof);
                }
            }
        }

        self.shared
            .queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint.to_string(), Arc::clone(&queue));
        self.shared.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockTransport {
            endpoint: endpoint.to_string(),
            queue,
            shared: Arc::clone(&self.shared),
            released: false,
        }))
    }

    fn available_endpoints(&self) -> Result<Vec<EndpointInfo>, TransportError> {
        if !self.shared.available {
            return Err(TransportError::Unavailable);
        }

        let mut names: Vec<String> = self
            .shared
            .behaviors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| EndpointInfo::named(name, EndpointKind::Virtual))
            .collect())
    }
}

/// Handle returned by [`MockTransportFactory`]
#[derive(Debug)]
pub struct MockTransport {
    endpoint: String,
    queue: Arc<MockQueue>,
    shared: Arc<MockShared>,
    released: bool,
}

impl MockTransport {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.shared.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Transport for MockTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn read_line(&mut self, timeout: Duration) -> Result<LineRead, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut events = self.queue.lock();

        loop {
            match events.pop_front() {
                Some(MockEvent::Line(line)) => return Ok(LineRead::Line(line)),
                Some(MockEvent::Error(message)) => {
                    return Err(TransportError::Io(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        message,
                    )));
                }
                Some(MockEvent::Eof) => return Err(TransportError::Closed),
                None => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(LineRead::Timeout);
            }

            self.shared.waiting.fetch_add(1, Ordering::SeqCst);
            events = self
                .queue
                .ready
                .wait_timeout(events, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
            self.shared.waiting.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn close(mut self: Box<Self>) -> Result<(), TransportError> {
        self.release();
        if self.shared.fail_close.load(Ordering::SeqCst) {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::Other,
                "mock close failure",
            )));
        }
        Ok(())
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.release();
    }
}
