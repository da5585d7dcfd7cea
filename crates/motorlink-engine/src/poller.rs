//! Reads every channel of a profile once and assembles a [`Reading`].

use std::time::Instant;

use motorlink_protocol::{
    Channel, DecodedSample, DerivedField, DeviceProfile, ProtocolResult, direction_sign,
};
use motorlink_recorder::Reading;
use motorlink_transport::{ControlChannel, ControlSetup, ControlTransport};
use tracing::trace;

use crate::error::PollError;

/// One tick's reading plus how many reads it took to get it.
#[derive(Debug, Clone, PartialEq)]
pub struct Poll {
    pub reading: Reading,
    pub attempted: usize,
    pub failed: usize,
}

impl Poll {
    /// Every read this tick failed.
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failed == self.attempted
    }
}

pub struct TelemetryPoller {
    profile: DeviceProfile,
    session_start: Instant,
}

impl TelemetryPoller {
    /// # Errors
    ///
    /// Returns the profile's validation error.
    pub fn new(profile: DeviceProfile) -> ProtocolResult<Self> {
        Self::with_start(profile, Instant::now())
    }

    /// Poller whose timestamps count from `session_start`.
    ///
    /// # Errors
    ///
    /// Returns the profile's validation error.
    pub fn with_start(profile: DeviceProfile, session_start: Instant) -> ProtocolResult<Self> {
        profile.validate()?;
        Ok(Self {
            profile,
            session_start,
        })
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn session_start(&self) -> Instant {
        self.session_start
    }

    /// Names of the fields every reading carries, in order.
    pub fn field_names(&self) -> Vec<String> {
        self.profile.field_names()
    }

    /// Read each channel once, in declared order.
    ///
    /// A channel whose read fails is absent from this reading; the rest are
    /// still filled in.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Malformed`] if a payload does not fit its
    /// channel, which means the channel table is wrong.
    pub fn poll<T: ControlTransport>(
        &mut self,
        channel: &mut ControlChannel<T>,
    ) -> Result<Poll, PollError> {
        let time = self.session_start.elapsed().as_secs_f64();
        let mut samples: Vec<(&Channel, Option<DecodedSample>)> =
            Vec::with_capacity(self.profile.channels.len());
        let mut failed = 0usize;

        for ch in &self.profile.channels {
            let setup = ControlSetup::new(ch.request, ch.value, ch.index);
            let sample = match channel.read_setup(setup, ch.length) {
                Ok(payload) => {
                    let decoded =
                        ch.decode(payload.as_bytes())
                            .map_err(|source| PollError::Malformed {
                                channel: ch.name.clone(),
                                source,
                            })?;
                    Some(decoded)
                }
                Err(e) => {
                    trace!("{} absent this tick: {e}", ch.name);
                    failed = failed.saturating_add(1);
                    None
                }
            };
            samples.push((ch, sample));
        }

        let mut reading = Reading::new(time);
        for (ch, sample) in samples.iter().filter(|(ch, _)| !ch.hidden) {
            reading.push(ch.name.clone(), sample.map(|s| s.value));
        }
        for field in &self.profile.derived {
            reading.push(field.name(), derive(field, &samples));
        }

        Ok(Poll {
            reading,
            attempted: samples.len(),
            failed,
        })
    }
}

fn sample_of(samples: &[(&Channel, Option<DecodedSample>)], name: &str) -> Option<DecodedSample> {
    samples
        .iter()
        .find(|(ch, _)| ch.name == name)
        .and_then(|(_, s)| *s)
}

fn derive(field: &DerivedField, samples: &[(&Channel, Option<DecodedSample>)]) -> Option<f64> {
    match field {
        DerivedField::SignedSpeed {
            speed,
            direction,
            zero_is_positive,
            ..
        } => {
            let speed = sample_of(samples, speed)?;
            let direction = sample_of(samples, direction)?;
            let sign = f64::from(direction_sign(direction.word));
            let sign = if *zero_is_positive { sign } else { -sign };
            Some(speed.value * sign)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motorlink_protocol::load_builtin_profiles;
    use motorlink_transport::TransportError;
    use motorlink_transport::mock::MockTransport;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn joystick() -> Result<DeviceProfile, Box<dyn std::error::Error>> {
        Ok(load_builtin_profiles()?.get("joystick")?.clone())
    }

    fn scripted() -> MockTransport {
        let mock = MockTransport::new();
        mock.set_response(1, vec![0xFF, 0xFF]); // Current -1
        mock.set_response(2, vec![0x00, 0x80]); // Angle -32768
        mock.set_response(3, vec![0x10, 0x00]); // Velocity 16
        mock.set_response(4, vec![0xE8, 0x03]); // speed 1000
        mock.set_response(5, vec![0x01]); // direction: negative
        mock
    }

    #[test]
    fn test_poll_joystick() -> TestResult {
        let mock = scripted();
        let mut channel = ControlChannel::new(mock.clone());
        let mut poller = TelemetryPoller::new(joystick()?)?;

        let poll = poller.poll(&mut channel)?;
        assert_eq!(poll.attempted, 5);
        assert_eq!(poll.failed, 0);
        assert_eq!(
            poll.reading.field_names().collect::<Vec<_>>(),
            vec!["Current", "Angle", "Velocity", "Motor_velocity"]
        );
        assert_eq!(poll.reading.value("Current"), Some(-1.0));
        assert_eq!(poll.reading.value("Angle"), Some(-32768.0));
        assert_eq!(poll.reading.value("Velocity"), Some(16.0));
        assert_eq!(poll.reading.value("Motor_velocity"), Some(-1000.0));

        let requests: Vec<u8> = mock.reads().iter().map(|s| s.request.0).collect();
        assert_eq!(requests, vec![1, 2, 3, 4, 5]);
        Ok(())
    }

    #[test]
    fn test_direction_zero_is_positive() -> TestResult {
        let mock = scripted();
        mock.set_response(5, vec![0x00]);
        let mut channel = ControlChannel::new(mock);
        let mut poller = TelemetryPoller::new(joystick()?)?;

        let poll = poller.poll(&mut channel)?;
        assert_eq!(poll.reading.value("Motor_velocity"), Some(1000.0));
        Ok(())
    }

    #[test]
    fn test_control_test_direction_polarity() -> TestResult {
        let profile = load_builtin_profiles()?.get("control-test")?.clone();
        let mock = MockTransport::new();
        mock.set_response(1, vec![0x00, 0x00]);
        mock.set_response(2, vec![0x00, 0x00]);
        mock.set_response(3, vec![0xFF, 0xFF]); // speed 1.0
        mock.set_response(4, vec![0x00]); // direction: reverse
        let mut channel = ControlChannel::new(mock.clone());
        let mut poller = TelemetryPoller::new(profile)?;

        let poll = poller.poll(&mut channel)?;
        assert_eq!(
            poll.reading.field_names().collect::<Vec<_>>(),
            vec!["Current", "Angle", "Motor_velocity"]
        );
        assert_eq!(poll.reading.value("Motor_velocity"), Some(-1.0));

        mock.set_response(4, vec![0x01]); // direction: forward
        let poll = poller.poll(&mut channel)?;
        assert_eq!(poll.reading.value("Motor_velocity"), Some(1.0));
        Ok(())
    }

    #[test]
    fn test_failed_read_marks_only_that_field_absent() -> TestResult {
        let mock = scripted();
        mock.fail_next(2, TransportError::Timeout);
        let mut channel = ControlChannel::new(mock);
        let mut poller = TelemetryPoller::new(joystick()?)?;

        let poll = poller.poll(&mut channel)?;
        assert_eq!(poll.failed, 1);
        assert!(poll.reading.has_field("Angle"));
        assert_eq!(poll.reading.value("Angle"), None);
        assert_eq!(poll.reading.value("Current"), Some(-1.0));
        assert_eq!(poll.reading.value("Velocity"), Some(16.0));
        assert_eq!(poll.reading.absent_count(), 1);
        Ok(())
    }

    #[test]
    fn test_derived_absent_when_input_missing() -> TestResult {
        let mock = scripted();
        mock.fail_next(5, TransportError::Stall);
        let mut channel = ControlChannel::new(mock);
        let mut poller = TelemetryPoller::new(joystick()?)?;

        let poll = poller.poll(&mut channel)?;
        assert_eq!(poll.reading.value("Motor_velocity"), None);
        assert!(poll.reading.has_field("Motor_velocity"));
        Ok(())
    }

    #[test]
    fn test_all_failed() -> TestResult {
        let mock = scripted();
        mock.disconnect();
        let mut channel = ControlChannel::new(mock);
        let mut poller = TelemetryPoller::new(joystick()?)?;

        let poll = poller.poll(&mut channel)?;
        assert!(poll.all_failed());
        assert_eq!(poll.reading.absent_count(), 4);
        Ok(())
    }

    #[test]
    fn test_oversized_payload_is_fatal() -> TestResult {
        struct Chatty;
        impl ControlTransport for Chatty {
            fn control_in(
                &mut self,
                _setup: ControlSetup,
                _length: usize,
            ) -> motorlink_transport::TransportResult<Vec<u8>> {
                Ok(vec![0; 8])
            }
            fn control_out(
                &mut self,
                _setup: ControlSetup,
                _data: &[u8],
            ) -> motorlink_transport::TransportResult<()> {
                Ok(())
            }
        }

        let mut channel = ControlChannel::new(Chatty);
        let mut poller = TelemetryPoller::new(joystick()?)?;
        assert!(matches!(
            poller.poll(&mut channel),
            Err(PollError::Malformed { .. })
        ));
        Ok(())
    }
}
