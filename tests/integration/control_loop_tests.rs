//! Control loop tests: `ControlService` driven through mock ports.

use std::sync::Arc;

use star::app::commands::AppCommand;
use star::app::events::AppEvent;
use star::app::service::ControlService;
use star::app::status::StatusBoard;
use star::config::SystemConfig;
use star::counting::PulseCounter;
use star::error::{Error, Fault, SensorError};
use star::fsm::StateId;

use crate::mock_hw::{pulse, EventLog, MemRecords, MockHardware};

struct Rig {
    svc: ControlService,
    hw: MockHardware,
    records: MemRecords,
    events: EventLog,
    counter: Arc<PulseCounter>,
    status: Arc<StatusBoard>,
    second: i64,
}

impl Rig {
    fn new(config: SystemConfig) -> Self {
        let counter = Arc::new(PulseCounter::new(
            config.dead_time_ceiling_ns(),
            config.indicator_flash_ms,
        ));
        let status = Arc::new(StatusBoard::new());
        let svc = ControlService::new(config, Arc::clone(&counter), Arc::clone(&status));
        Self {
            svc,
            hw: MockHardware::new(),
            records: MemRecords::default(),
            events: EventLog::default(),
            counter,
            status,
            second: 0,
        }
    }

    fn started(config: SystemConfig) -> Self {
        let mut rig = Self::new(config);
        rig.svc
            .startup(&mut rig.hw, &mut rig.records, &mut rig.events)
            .unwrap();
        rig
    }

    fn tick(&mut self, altitude: Option<f64>) {
        self.hw.script(&[altitude]);
        self.second += 1;
        self.svc
            .tick(self.second, &mut self.hw, &mut self.records, &mut self.events)
            .unwrap();
    }
}

fn gate(self_test: bool) -> SystemConfig {
    SystemConfig {
        hv_threshold_m: 100.0,
        hv_deadband_m: 10.0,
        self_test_enabled: self_test,
        self_test_duration_secs: 10,
        altitude_hold_secs: 3,
        ..SystemConfig::default()
    }
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn startup_reaches_armed_with_hv_off() {
    let rig = Rig::started(gate(false));
    assert_eq!(rig.svc.state(), StateId::Armed);
    assert!(!rig.hw.hv_on);
    assert_eq!(rig.hw.hv_writes, vec![false]);
    assert_eq!(rig.hw.qff_calls, 1);
    assert!(rig.records.header);
    assert!(rig.events.contains(&AppEvent::SensorInit { crc_valid: true }));
    assert!(rig.events.contains(&AppEvent::StateChanged {
        from: StateId::Startup,
        to: StateId::Armed,
    }));
    assert_eq!(rig.status.snapshot().state, StateId::Armed);
    assert!(rig.counter.is_enabled());
}

#[test]
fn sensor_failure_at_startup_is_fatal() {
    let mut rig = Rig::new(gate(false));
    rig.hw.init_fails = true;
    let res = rig.svc.startup(&mut rig.hw, &mut rig.records, &mut rig.events);
    assert!(matches!(res, Err(Error::Sensor(SensorError::Transport(_)))));
    assert!(!rig.hw.hv_on);
    assert!(!rig.records.header);
}

#[test]
fn qff_failure_at_startup_is_fatal() {
    let mut rig = Rig::new(gate(false));
    rig.hw.qff_fails = true;
    assert!(rig.svc.startup(&mut rig.hw, &mut rig.records, &mut rig.events).is_err());
    assert_eq!(rig.svc.state(), StateId::Startup);
}

#[test]
fn crc_mismatch_warns_by_default() {
    let mut rig = Rig::new(gate(false));
    rig.hw.crc_valid = false;
    rig.svc
        .startup(&mut rig.hw, &mut rig.records, &mut rig.events)
        .unwrap();
    assert_eq!(rig.svc.state(), StateId::Armed);
    assert_eq!(rig.svc.fault_flags(), Fault::CalibrationCrc.mask());
    assert!(rig.events.contains(&AppEvent::SensorInit { crc_valid: false }));
}

#[test]
fn crc_mismatch_aborts_when_configured() {
    let mut rig = Rig::new(SystemConfig {
        abort_on_crc_mismatch: true,
        ..gate(false)
    });
    rig.hw.crc_valid = false;
    let res = rig.svc.startup(&mut rig.hw, &mut rig.records, &mut rig.events);
    assert!(matches!(
        res,
        Err(Error::Sensor(SensorError::CrcMismatch { .. }))
    ));
}

// ── Altitude gate ─────────────────────────────────────────────

#[test]
fn hysteresis_scenario() {
    let mut rig = Rig::started(gate(false));
    let altitudes = [50.0, 95.0, 101.0, 150.0, 105.0, 95.0, 88.0, 70.0];
    let expected = [false, false, true, true, true, true, false, false];

    let mut hv = Vec::new();
    for alt in altitudes {
        rig.tick(Some(alt));
        hv.push(rig.hw.hv_on);
    }
    assert_eq!(hv, expected);
    assert_eq!(rig.hw.hv_writes, vec![false, true, false]);
}

#[test]
fn noise_inside_deadband_never_toggles() {
    let mut rig = Rig::started(gate(false));
    rig.tick(Some(120.0));
    for k in 0..50 {
        let alt = if k % 2 == 0 { 91.0 } else { 109.0 };
        rig.tick(Some(alt));
        assert!(rig.hw.hv_on);
    }
    assert_eq!(rig.hw.hv_rising(), 1);
}

#[test]
fn self_test_runs_once_without_output_rows() {
    let mut rig = Rig::started(gate(true));
    for _ in 0..15 {
        rig.tick(Some(20.0));
    }
    assert!(rig.svc.self_test_done());
    assert_eq!(rig.svc.state(), StateId::Armed);
    assert!(!rig.hw.hv_on);
    assert_eq!(rig.hw.hv_writes, vec![false, true, false]);
    // SelfTest ends on tick 11; that second is not logged.
    assert_eq!(rig.records.rows.len(), 4);
    assert_eq!(rig.records.rows[0].elapsed_s, 12);
    assert!(rig.events.contains(&AppEvent::StateChanged {
        from: StateId::Armed,
        to: StateId::SelfTest,
    }));
}

#[test]
fn self_test_pulses_never_reach_ring_or_log() {
    let mut rig = Rig::started(gate(true));
    rig.tick(Some(20.0));
    assert_eq!(rig.svc.state(), StateId::SelfTest);
    assert!(!rig.counter.is_enabled());

    while rig.svc.state() == StateId::SelfTest {
        pulse(&rig.counter, (rig.second + 1) * 1_000_000_000);
        rig.tick(Some(20.0));
    }
    assert_eq!(rig.svc.state(), StateId::Armed);
    assert_eq!(rig.second, 11);
    assert!(rig.records.rows.is_empty());
    assert_eq!(rig.counter.with_buffer(|b| b.sum_counts(60)), 0);
    assert_eq!(rig.svc.heartbeat(rig.second).dose_usv_h, 0.0);

    rig.tick(Some(20.0));
    let first = rig.records.rows[0];
    assert_eq!(first.elapsed_s, 12);
    assert_eq!(first.slot.counts, 0);

    pulse(&rig.counter, 12_500_000_000);
    rig.tick(Some(20.0));
    assert_eq!(rig.records.rows[1].slot.counts, 1, "Armed counting resumed");
}

// ── Counting ──────────────────────────────────────────────────

#[test]
fn rows_carry_completed_second_counts() {
    let mut rig = Rig::started(gate(false));
    for k in 0..5 {
        pulse(&rig.counter, 1_000_000 + k * 1_000_000);
    }
    rig.tick(Some(50.0));
    let row = rig.records.rows[0];
    assert_eq!(row.elapsed_s, 1);
    assert_eq!(row.slot.counts, 5);
    assert_eq!(row.slot.dead_time_events, 5);
    assert_eq!(row.slot.dead_time_ns, 5 * 200_000);
    assert!(row.altimeter.is_some());
}

#[test]
fn entering_active_resets_counting_state() {
    let mut rig = Rig::started(gate(false));
    for k in 0..4 {
        pulse(&rig.counter, k * 1_000_000);
    }
    rig.tick(Some(50.0));
    for k in 0..3 {
        pulse(&rig.counter, 10_000_000 + k * 1_000_000);
    }
    rig.tick(Some(150.0));
    assert_eq!(rig.svc.state(), StateId::Active);
    assert_eq!(rig.records.rows.last().map(|r| r.slot.counts), Some(3));
    assert_eq!(rig.counter.with_buffer(|b| b.sum_counts(60)), 0);

    for k in 0..2 {
        pulse(&rig.counter, 20_000_000 + k * 1_000_000);
    }
    rig.tick(Some(150.0));
    assert_eq!(rig.records.rows.last().map(|r| r.slot.counts), Some(2));
}

#[test]
fn dropping_to_armed_keeps_counts() {
    let mut rig = Rig::started(gate(false));
    rig.tick(Some(150.0));
    pulse(&rig.counter, 1_000);
    rig.tick(Some(150.0));
    rig.tick(Some(50.0));
    assert_eq!(rig.svc.state(), StateId::Armed);
    assert_eq!(rig.counter.with_buffer(|b| b.sum_counts(60)), 1);
}

#[test]
fn edge_anomalies_are_reported_from_the_tick() {
    let mut rig = Rig::started(gate(false));
    rig.counter.on_edge(5_000_000);
    rig.counter.on_edge(4_000_000);
    rig.tick(Some(50.0));
    assert!(rig.events.contains(&AppEvent::EdgeAnomalies(1)));
    rig.tick(Some(50.0));
    assert_eq!(rig.events.count(|e| matches!(e, AppEvent::EdgeAnomalies(_))), 1);
}

// ── Altimeter dropout ─────────────────────────────────────────

#[test]
fn dropout_holds_hv_then_marks_altitude_unknown() {
    let mut rig = Rig::started(gate(false));
    rig.tick(Some(150.0));
    assert!(rig.hw.hv_on);

    for k in 1..=10 {
        rig.tick(None);
        assert!(rig.hw.hv_on, "HV dropped on failed read {k}");
        assert_eq!(rig.svc.state(), StateId::Active);
        if k <= 3 {
            assert_eq!(rig.svc.altitude(), Some(150.0));
        } else {
            assert_eq!(rig.svc.altitude(), None);
        }
    }
    assert_eq!(rig.svc.fault_flags(), Fault::AltimeterLost.mask());
    assert!(rig
        .events
        .contains(&AppEvent::FaultDetected(Fault::AltimeterLost.mask())));

    // Rows keep coming with blank altimeter columns.
    assert!(rig.records.rows.last().is_some_and(|r| r.altimeter.is_none()));

    rig.tick(Some(60.0));
    assert_eq!(rig.svc.state(), StateId::Armed);
    assert!(!rig.hw.hv_on);
    assert!(rig.events.contains(&AppEvent::FaultCleared));
}

#[test]
fn single_bad_read_below_band_does_not_switch() {
    let mut rig = Rig::started(gate(false));
    rig.tick(Some(150.0));
    rig.tick(None);
    rig.tick(Some(150.0));
    assert_eq!(rig.hw.hv_writes, vec![false, true]);
}

// ── Actuator failures ─────────────────────────────────────────

#[test]
fn failed_hv_write_is_retried_next_tick() {
    let mut rig = Rig::started(gate(false));
    rig.hw.fail_hv_writes = 1;
    rig.hw.script(&[Some(150.0)]);
    let res = rig
        .svc
        .tick(1, &mut rig.hw, &mut rig.records, &mut rig.events);
    assert!(res.is_err());
    assert!(!rig.hw.hv_on);
    assert!(rig.svc.hv_commanded());
    assert!(!rig.status.snapshot().hv_on, "board shows the gate, not the request");
    assert!(!rig.svc.heartbeat(1).hv_on);

    rig.second = 1;
    rig.tick(Some(150.0));
    assert!(rig.hw.hv_on);
    assert!(rig.status.snapshot().hv_on);
}

// ── Heartbeat and flush ───────────────────────────────────────

#[test]
fn heartbeat_and_flush_follow_intervals() {
    let mut rig = Rig::started(SystemConfig {
        heartbeat_interval_secs: 5,
        flush_interval_secs: 10,
        ..gate(false)
    });
    for _ in 0..20 {
        rig.tick(Some(50.0));
    }
    let beats = rig.events.count(|e| matches!(e, AppEvent::Heartbeat(_)));
    assert_eq!(beats, 4);
    assert_eq!(rig.records.flushes, 2);
}

#[test]
fn repeated_second_is_skipped() {
    let mut rig = Rig::started(gate(false));
    rig.tick(Some(50.0));
    rig.hw.script(&[Some(150.0)]);
    rig.svc
        .tick(1, &mut rig.hw, &mut rig.records, &mut rig.events)
        .unwrap();
    assert_eq!(rig.svc.tick_count(), 1);
    assert_eq!(rig.records.rows.len(), 1);
    assert_eq!(rig.svc.state(), StateId::Armed);
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn shutdown_turns_everything_off_and_is_terminal() {
    let mut rig = Rig::started(gate(false));
    rig.tick(Some(150.0));
    assert!(rig.hw.hv_on);

    rig.svc
        .handle_command(AppCommand::Shutdown, &mut rig.hw, &mut rig.records, &mut rig.events)
        .unwrap();
    assert_eq!(rig.svc.state(), StateId::Shutdown);
    assert!(!rig.hw.hv_on);
    assert!(!rig.counter.is_enabled());
    assert_eq!(rig.records.flushes, 1);
    assert!(rig.events.contains(&AppEvent::ShutdownComplete));
    assert!(!rig.status.hv_on());

    let rows = rig.records.rows.len();
    rig.tick(Some(500.0));
    assert!(!rig.hw.hv_on);
    assert_eq!(rig.records.rows.len(), rows);

    // A second shutdown is a no-op.
    rig.svc
        .shutdown(&mut rig.hw, &mut rig.records, &mut rig.events)
        .unwrap();
    assert_eq!(rig.records.flushes, 1);
}

#[test]
fn recalibrate_command_replaces_qff() {
    let mut rig = Rig::started(gate(false));
    rig.svc
        .handle_command(
            AppCommand::RecalibrateQff,
            &mut rig.hw,
            &mut rig.records,
            &mut rig.events,
        )
        .unwrap();
    assert_eq!(rig.hw.recalibrations, 1);
    assert!(rig.events.contains(&AppEvent::QffCalibrated {
        qff_mbar: 1009.5,
        recalibrated: true,
    }));
}
