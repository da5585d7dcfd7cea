//! End-to-end sessions against a scripted device.

use motorlink_engine::prelude::*;
use motorlink_engine::TickReport;
use motorlink_protocol::{DeviceProfile, load_builtin_profiles};
use motorlink_transport::TransportError;
use motorlink_transport::mock::MockTransport;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const SET_PARAMETER: u8 = 6;

fn joystick() -> Result<DeviceProfile, Box<dyn std::error::Error>> {
    Ok(load_builtin_profiles()?.get("joystick")?.clone())
}

fn scripted_joystick() -> MockTransport {
    let mock = MockTransport::new();
    mock.set_response(1, vec![0x0A, 0x00]);
    mock.set_response(2, vec![0xF6, 0xFF]);
    mock.set_response(3, vec![0x00, 0x00]);
    mock.set_response(4, vec![0x64, 0x00]);
    mock.set_response(5, vec![0x00]);
    mock
}

fn fast(batch_size: usize) -> LoopConfig {
    LoopConfig {
        batch_size,
        max_rate_hz: None,
        ..LoopConfig::default()
    }
}

fn session(
    mock: &MockTransport,
    surface: StaticSurface,
    recorder: BufferedRecorder,
    config: LoopConfig,
) -> Result<SampleLoop<MockTransport, StaticSurface>, Box<dyn std::error::Error>> {
    Ok(SampleLoop::new(
        ControlChannel::new(mock.clone()),
        joystick()?,
        surface,
        recorder,
        config,
    )?)
}

#[test]
fn cold_start_then_no_writes_while_unchanged() -> TestResult {
    let mock = scripted_joystick();
    let profile = joystick()?;
    let surface = StaticSurface::from_initial(&profile.parameters);
    let mut session = session(&mock, surface, BufferedRecorder::disabled(), fast(50))?;

    let cold: Vec<(u8, u16)> = mock
        .writes()
        .iter()
        .map(|s| (s.request.0, s.value))
        .collect();
    assert_eq!(
        cold,
        vec![
            (SET_PARAMETER, 0x0002),
            (SET_PARAMETER, 0x0102),
            (SET_PARAMETER, 0x0202),
            (SET_PARAMETER, 0x0302),
            (SET_PARAMETER, 0x0400),
        ]
    );

    for _ in 0..10 {
        session.tick()?;
    }
    assert_eq!(mock.writes().len(), 5);
    assert_eq!(mock.reads().len(), 50);
    Ok(())
}

#[test]
fn surface_change_writes_once() -> TestResult {
    let mock = scripted_joystick();
    let profile = joystick()?;
    let mut surface = StaticSurface::from_initial(&profile.parameters);
    surface.set("K_wall", 0);
    let mut session = session(&mock, surface, BufferedRecorder::disabled(), fast(50))?;
    mock.clear_history();

    let report = session.tick()?;
    assert_eq!(report.sync.writes, 1);
    let writes = mock.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes.first().map(|s| s.value), Some(0x0300));

    session.tick()?;
    assert_eq!(mock.writes().len(), 1);
    Ok(())
}

#[test]
fn run_flushes_per_batch_and_at_stop() -> TestResult {
    let mock = scripted_joystick();
    let sink = MemorySink::new();
    let config = LoopConfig {
        max_ticks: Some(7),
        ..fast(3)
    };
    let mut session = session(
        &mock,
        StaticSurface::default(),
        BufferedRecorder::new(sink.clone()),
        config,
    )?;

    let summary = session.run(&StopToken::new())?;
    assert_eq!(summary.ticks, 7);
    assert_eq!(summary.readings, 7);
    assert_eq!(summary.flushes, 3);
    assert_eq!(summary.rows_written, 7);
    assert_eq!(sink.batches(), 3);

    let rows = sink.rows();
    assert_eq!(rows.len(), 7);
    assert!(rows.windows(2).all(|w| match w {
        [a, b] => a.time <= b.time,
        _ => false,
    }));
    let first = rows.first().ok_or("no rows")?;
    assert_eq!(first.value("Current"), Some(10.0));
    assert_eq!(first.value("Angle"), Some(-10.0));
    assert_eq!(first.value("Motor_velocity"), Some(100.0));
    Ok(())
}

#[test]
fn stop_before_first_tick() -> TestResult {
    let mock = scripted_joystick();
    let stop = StopToken::new();
    stop.stop();
    let mut session = session(&mock, StaticSurface::default(), BufferedRecorder::disabled(), fast(50))?;
    mock.clear_history();

    let summary = session.run(&stop)?;
    assert_eq!(summary.ticks, 0);
    assert!(mock.reads().is_empty());
    Ok(())
}

#[test]
fn transient_read_failure_keeps_session_alive() -> TestResult {
    let mock = scripted_joystick();
    let sink = MemorySink::new();
    let mut session = session(
        &mock,
        StaticSurface::default(),
        BufferedRecorder::new(sink.clone()),
        fast(2),
    )?;

    mock.fail_next(3, TransportError::Timeout);
    let report: TickReport = session.tick()?;
    assert_eq!(report.read_failures, 1);
    assert!(!report.dead);
    session.tick()?;

    let rows = sink.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.first().and_then(|r| r.value("Velocity")), None);
    assert_eq!(rows.get(1).and_then(|r| r.value("Velocity")), Some(0.0));
    Ok(())
}

#[test]
fn dead_ticks_escalate() -> TestResult {
    let mock = scripted_joystick();
    let config = LoopConfig {
        max_dead_ticks: 3,
        ..fast(50)
    };
    let sink = MemorySink::new();
    let mut session = session(
        &mock,
        StaticSurface::default(),
        BufferedRecorder::new(sink.clone()),
        config,
    )?;
    mock.disconnect();

    assert!(session.tick()?.dead);
    assert!(session.tick()?.dead);
    assert!(matches!(
        session.tick(),
        Err(LoopError::DeviceUnresponsive { dead_ticks: 3 })
    ));
    Ok(())
}

#[test]
fn run_flushes_before_reporting_unresponsive_device() -> TestResult {
    let mock = scripted_joystick();
    let config = LoopConfig {
        max_dead_ticks: 2,
        ..fast(50)
    };
    let sink = MemorySink::new();
    let mut session = session(
        &mock,
        StaticSurface::default(),
        BufferedRecorder::new(sink.clone()),
        config,
    )?;
    mock.disconnect();

    let result = session.run(&StopToken::new());
    assert!(matches!(
        result,
        Err(LoopError::DeviceUnresponsive { dead_ticks: 2 })
    ));
    let rows = sink.rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.absent_count() == 4));
    Ok(())
}

#[test]
fn recovery_resets_dead_tick_count() -> TestResult {
    let mock = scripted_joystick();
    let config = LoopConfig {
        max_dead_ticks: 2,
        ..fast(50)
    };
    let mut session = session(&mock, StaticSurface::default(), BufferedRecorder::disabled(), config)?;

    for _ in 0..5 {
        mock.disconnect();
        assert!(session.tick()?.dead);
        mock.reconnect();
        assert!(!session.tick()?.dead);
    }
    Ok(())
}

#[test]
fn zero_max_dead_ticks_never_gives_up() -> TestResult {
    let mock = scripted_joystick();
    let config = LoopConfig {
        max_dead_ticks: 0,
        ..fast(50)
    };
    let mut session = session(&mock, StaticSurface::default(), BufferedRecorder::disabled(), config)?;
    mock.disconnect();
    for _ in 0..100 {
        session.tick()?;
    }
    assert_eq!(session.summary().transport_failures, 500);
    Ok(())
}

#[test]
fn persistence_failure_is_retried() -> TestResult {
    let mock = scripted_joystick();
    let sink = MemorySink::new();
    let mut session = session(
        &mock,
        StaticSurface::default(),
        BufferedRecorder::new(sink.clone()),
        fast(2),
    )?;

    sink.set_failing(true);
    session.tick()?;
    let report = session.tick()?;
    assert!(report.persistence_failed);
    assert_eq!(session.recorder().len(), 2);

    sink.set_failing(false);
    let report = session.tick()?;
    assert_eq!(report.flushed, Some(3));
    assert_eq!(sink.rows().len(), 3);
    assert_eq!(session.summary().persistence_failures, 1);
    Ok(())
}

#[test]
fn failed_final_flush_is_reported() -> TestResult {
    let mock = scripted_joystick();
    let sink = MemorySink::new();
    let config = LoopConfig {
        max_ticks: Some(1),
        ..fast(50)
    };
    let mut session = session(
        &mock,
        StaticSurface::default(),
        BufferedRecorder::new(sink.clone()),
        config,
    )?;
    sink.set_failing(true);

    assert!(matches!(
        session.run(&StopToken::new()),
        Err(LoopError::FinalFlush { pending: 1, .. })
    ));
    Ok(())
}

#[test]
fn profile_without_parameters_never_writes() -> TestResult {
    let mock = MockTransport::new();
    mock.set_response(1, vec![0xFF, 0x7F]);
    mock.set_response(2, vec![0x00, 0x80]);
    let profile = load_builtin_profiles()?.get("current-test")?.clone();

    let mut session = SampleLoop::new(
        ControlChannel::new(mock.clone()),
        profile,
        StaticSurface::default(),
        BufferedRecorder::disabled(),
        fast(50),
    )?;
    assert!(session.parameters().is_none());

    let report = session.tick()?;
    assert_eq!(report.reads, 2);
    assert!(mock.writes().is_empty());
    Ok(())
}
