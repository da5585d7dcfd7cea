//! Property tests for change-only parameter writes.

use motorlink_engine::{Observed, ParameterSync, SyncState};
use motorlink_protocol::{ParameterSpec, RequestCode, decode_parameter};
use motorlink_transport::ControlChannel;
use motorlink_transport::mock::MockTransport;
use proptest::prelude::*;

const NAMES: [&str; 4] = ["K_spring", "K_damper", "K_texture", "K_wall"];

fn specs() -> Vec<ParameterSpec> {
    NAMES
        .iter()
        .zip(0u8..)
        .map(|(name, index)| ParameterSpec {
            name: (*name).to_string(),
            index,
            initial: 2,
            max: 3,
        })
        .collect()
}

fn observation(values: &[i64]) -> Observed {
    NAMES
        .iter()
        .zip(values)
        .map(|(n, v)| ((*n).to_string(), *v))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_writes_equal_changes(frames in prop::collection::vec(prop::collection::vec(0i64..=3, 4), 1..30)) {
        let mock = MockTransport::new();
        let mut channel = ControlChannel::new(mock.clone());
        let mut sync = ParameterSync::new(&specs(), RequestCode(6), &mut channel);
        mock.clear_history();

        let mut last = vec![2i64; 4];
        for frame in &frames {
            let changed = frame.iter().zip(&last).filter(|(a, b)| a != b).count();
            let report = sync.tick(&mut channel, &observation(frame));
            prop_assert_eq!(report.writes, changed);
            let expected: Vec<String> = NAMES
                .iter()
                .zip(frame.iter().zip(&last))
                .filter(|(_, (a, b))| a != b)
                .map(|(n, _)| (*n).to_string())
                .collect();
            prop_assert_eq!(&report.written, &expected);
            last.clone_from(frame);
        }

        let total: usize = frames
            .iter()
            .scan(vec![2i64; 4], |prev, frame| {
                let n = frame.iter().zip(prev.iter()).filter(|(a, b)| a != b).count();
                prev.clone_from(frame);
                Some(n)
            })
            .sum();
        prop_assert_eq!(mock.writes().len(), total);

        for param in sync.parameters() {
            prop_assert_eq!(param.state, SyncState::Synced);
        }
    }

    #[test]
    fn prop_write_carries_value_and_index(slot in 0usize..4, value in 0i64..=3) {
        prop_assume!(value != 2);
        let mock = MockTransport::new();
        let mut channel = ControlChannel::new(mock.clone());
        let mut sync = ParameterSync::new(&specs(), RequestCode(6), &mut channel);
        mock.clear_history();

        let mut frame = vec![2i64; 4];
        if let Some(v) = frame.get_mut(slot) {
            *v = value;
        }
        let report = sync.tick(&mut channel, &observation(&frame));
        let name = NAMES.get(slot).ok_or_else(|| TestCaseError::fail("slot out of range"))?;
        prop_assert_eq!(report.written, vec![(*name).to_string()]);
        prop_assert!(report.failed.is_empty());

        let writes = mock.writes();
        prop_assert_eq!(writes.len(), 1);
        let setup = writes.first().copied().ok_or_else(|| TestCaseError::fail("no write"))?;
        prop_assert_eq!(setup.request, RequestCode(6));
        prop_assert_eq!(setup.index, 0);
        let (sent_value, sent_index) = decode_parameter(setup.value);
        prop_assert_eq!(i64::from(sent_value), value);
        prop_assert_eq!(usize::from(sent_index), slot);
    }
}
