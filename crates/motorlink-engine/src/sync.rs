//! Pushes tunable parameters to the device, writing only what changed.

use motorlink_protocol::{ParameterSpec, RequestCode, encode_parameter};
use motorlink_transport::{ControlChannel, ControlTransport};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::surface::Observed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncState {
    /// The device may not hold `value`; the next observation is written.
    Unsynced,
    /// The device acknowledged `value`.
    Synced,
}

/// One parameter slot and the last value known to be on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub index: u8,
    pub value: u8,
    pub max: u8,
    pub state: SyncState,
    #[serde(skip)]
    last_rejected: Option<i64>,
}

impl Parameter {
    fn from_spec(spec: &ParameterSpec) -> Self {
        Self {
            name: spec.name.clone(),
            index: spec.index,
            value: spec.initial,
            max: spec.max,
            state: SyncState::Unsynced,
            last_rejected: None,
        }
    }
}

/// What one sync pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Write attempts, successful or not.
    pub writes: usize,
    /// Parameters the device acknowledged, in declared order.
    pub written: Vec<String>,
    /// Parameters whose write failed and stay unsynced.
    pub failed: Vec<String>,
    /// Observations outside the parameter's range.
    pub rejected: usize,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.written.len()
    }

    pub fn failures(&self) -> usize {
        self.failed.len()
    }
}

pub struct ParameterSync {
    request: RequestCode,
    parameters: Vec<Parameter>,
}

impl ParameterSync {
    /// Build the table and write every parameter's initial value once, in
    /// declared order. A parameter whose write fails stays unsynced.
    pub fn new<T: ControlTransport>(
        specs: &[ParameterSpec],
        request: RequestCode,
        channel: &mut ControlChannel<T>,
    ) -> Self {
        let mut sync = Self {
            request,
            parameters: specs.iter().map(Parameter::from_spec).collect(),
        };
        let report = sync.cold_start(channel);
        info!(
            "Cold start wrote {}/{} parameter(s)",
            report.succeeded(),
            sync.parameters.len()
        );
        sync
    }

    fn cold_start<T: ControlTransport>(&mut self, channel: &mut ControlChannel<T>) -> SyncReport {
        let mut report = SyncReport::default();
        for param in &mut self.parameters {
            report.writes = report.writes.saturating_add(1);
            let word = encode_parameter(param.value, param.index);
            match channel.write(self.request, word, 0) {
                Ok(()) => {
                    param.state = SyncState::Synced;
                    report.written.push(param.name.clone());
                }
                Err(e) => {
                    report.failed.push(param.name.clone());
                    warn!("Cold start write of {} failed: {e}", param.name);
                }
            }
        }
        report
    }

    /// Write every parameter whose observed value differs from the stored
    /// one, or that is still unsynced. At most one write per parameter.
    pub fn tick<T: ControlTransport>(
        &mut self,
        channel: &mut ControlChannel<T>,
        observed: &Observed,
    ) -> SyncReport {
        let mut report = SyncReport::default();

        for param in &mut self.parameters {
            let Some(&wanted) = observed.get(&param.name) else {
                continue;
            };

            let value = match u8::try_from(wanted) {
                Ok(v) if v <= param.max => v,
                _ => {
                    report.rejected = report.rejected.saturating_add(1);
                    if param.last_rejected != Some(wanted) {
                        warn!(
                            "Ignoring {}={wanted}: outside 0..={}",
                            param.name, param.max
                        );
                        param.last_rejected = Some(wanted);
                    }
                    continue;
                }
            };
            param.last_rejected = None;

            if param.state == SyncState::Synced && param.value == value {
                continue;
            }

            report.writes = report.writes.saturating_add(1);
            match channel.write(self.request, encode_parameter(value, param.index), 0) {
                Ok(()) => {
                    debug!("{} -> {value}", param.name);
                    param.value = value;
                    param.state = SyncState::Synced;
                    report.written.push(param.name.clone());
                }
                Err(e) => {
                    report.failed.push(param.name.clone());
                    debug!("Write of {}={value} failed, retrying next tick: {e}", param.name);
                }
            }
        }

        report
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn unsynced(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.state == SyncState::Unsynced)
            .count()
    }

    pub fn request(&self) -> RequestCode {
        self.request
    }
}
