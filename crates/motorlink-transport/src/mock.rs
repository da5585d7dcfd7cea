//! Scriptable in-memory device for tests and dry runs.
//!
//! Clones share state, so a test keeps one handle to script responses and
//! inspect traffic while the channel owns another.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use motorlink_protocol::RequestCode;

use crate::error::{TransportError, TransportResult};
use crate::transport::{ControlSetup, ControlTransport};

#[derive(Default)]
struct MockState {
    /// Persistent responses keyed by `(request, value)`.
    responses: HashMap<(u8, u16), Vec<u8>>,
    /// One-shot responses served before the persistent one.
    queued: HashMap<(u8, u16), VecDeque<Vec<u8>>>,
    /// One-shot failures keyed by request code, for either direction.
    failures: HashMap<u8, VecDeque<TransportError>>,
    /// Request codes that always fail.
    broken: HashMap<u8, TransportError>,
    reads: Vec<ControlSetup>,
    writes: Vec<ControlSetup>,
    disconnected: bool,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Answer every read of `request` (value field 0) with `bytes`.
    pub fn set_response(&self, request: u8, bytes: Vec<u8>) {
        self.with_state(|s| {
            s.responses.insert((request, 0), bytes);
        });
    }

    /// Answer every register read of `address` through `request`.
    pub fn set_register_response(&self, request: u8, address: u16, bytes: Vec<u8>) {
        self.with_state(|s| {
            s.responses.insert((request, address), bytes);
        });
    }

    /// Answer the next read of `request` with `bytes`, once.
    pub fn queue_response(&self, request: u8, bytes: Vec<u8>) {
        self.with_state(|s| {
            s.queued.entry((request, 0)).or_default().push_back(bytes);
        });
    }

    /// Fail the next transaction that uses `request`, once.
    pub fn fail_next(&self, request: u8, error: TransportError) {
        self.with_state(|s| {
            s.failures.entry(request).or_default().push_back(error);
        });
    }

    /// Fail every transaction that uses `request` until [`MockTransport::repair`].
    pub fn fail_always(&self, request: u8, error: TransportError) {
        self.with_state(|s| {
            s.broken.insert(request, error);
        });
    }

    pub fn repair(&self, request: u8) {
        self.with_state(|s| {
            s.broken.remove(&request);
        });
    }

    pub fn disconnect(&self) {
        self.with_state(|s| s.disconnected = true);
    }

    pub fn reconnect(&self) {
        self.with_state(|s| s.disconnected = false);
    }

    /// Every read attempted so far, including failed ones.
    pub fn reads(&self) -> Vec<ControlSetup> {
        self.with_state(|s| s.reads.clone())
    }

    /// Every write attempted so far, including failed ones.
    pub fn writes(&self) -> Vec<ControlSetup> {
        self.with_state(|s| s.writes.clone())
    }

    pub fn clear_history(&self) {
        self.with_state(|s| {
            s.reads.clear();
            s.writes.clear();
        });
    }
}

impl MockState {
    fn check_failure(&mut self, request: RequestCode) -> TransportResult<()> {
        if self.disconnected {
            return Err(TransportError::Disconnected);
        }
        if let Some(error) = self
            .failures
            .get_mut(&request.0)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        if let Some(error) = self.broken.get(&request.0) {
            return Err(error.clone());
        }
        Ok(())
    }
}

impl ControlTransport for MockTransport {
    fn control_in(&mut self, setup: ControlSetup, length: usize) -> TransportResult<Vec<u8>> {
        self.with_state(|s| {
            s.reads.push(setup);
            s.check_failure(setup.request)?;

            let key = (setup.request.0, setup.value);
            let bytes = s
                .queued
                .get_mut(&key)
                .and_then(VecDeque::pop_front)
                .or_else(|| s.responses.get(&key).cloned())
                .ok_or(TransportError::Stall)?;

            // A real device never returns more than the host asked for.
            Ok(bytes.into_iter().take(length).collect())
        })
    }

    fn control_out(&mut self, setup: ControlSetup, _data: &[u8]) -> TransportResult<()> {
        self.with_state(|s| {
            s.writes.push(setup);
            s.check_failure(setup.request)
        })
    }
}
