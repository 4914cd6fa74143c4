//! Shared connection state

use crate::reading::{SensorReading, SensorRecord};
use serde::Serialize;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

/// Point-in-time view of the sensor link
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionState {
    pub connected: bool,
    pub endpoint_id: Option<String>,
    pub session_id: Option<String>,
    pub last_reading: Option<SensorReading>,
    pub last_update: Option<SystemTime>,
    pub last_error: Option<String>,
    pub lines_received: u64,
    pub readings_published: u64,
    pub lines_discarded: u64,
}

#[derive(Debug, Default)]
struct Inner {
    /// Session number of the only reader allowed to write
    generation: u64,
    state: ConnectionState,
}

/// The one lock every reader and writer of the link state goes through.
///
/// Reader tasks write through [`SharedState::with_session`], which silently
/// drops writes from a task whose session has been superseded.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    inner: RwLock<Inner>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn snapshot(&self) -> ConnectionState {
        self.read().state.clone()
    }

    /// Unconditional update from the lifecycle side
    pub(crate) fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut ConnectionState),
    {
        f(&mut self.write().state);
    }

    /// Retire the current session so its reader can no longer write
    pub(crate) fn retire_session(&self) {
        let mut inner = self.write();
        inner.generation += 1;
        inner.state.connected = false;
    }

    /// Mark a freshly opened transport as the current session
    pub(crate) fn begin_session(&self, endpoint: &str, session_id: &str) -> u64 {
        let mut inner = self.write();
        inner.generation += 1;
        inner.state.connected = true;
        inner.state.endpoint_id = Some(endpoint.to_string());
        inner.state.session_id = Some(session_id.to_string());
        inner.state.last_error = None;
        inner.state.lines_received = 0;
        inner.state.readings_published = 0;
        inner.state.lines_discarded = 0;
        inner.generation
    }

    /// Apply `f` only if `generation` is still the current session
    pub(crate) fn with_session<F>(&self, generation: u64, f: F) -> bool
    where
        F: FnOnce(&mut ConnectionState),
    {
        let mut inner = self.write();
        if inner.generation != generation {
            return false;
        }
        f(&mut inner.state);
        true
    }

    /// Merge a parsed record and stamp it, as one update
    pub(crate) fn publish(&self, generation: u64, record: &SensorRecord) -> bool {
        self.with_session(generation, |state| {
            state
                .last_reading
                .get_or_insert_with(SensorReading::default)
                .merge(record);
            state.last_update = Some(SystemTime::now());
            state.lines_received += 1;
            state.readings_published += 1;
        })
    }
}
