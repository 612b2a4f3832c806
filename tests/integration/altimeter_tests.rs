//! Altimeter driver and hardware adapter against the simulated MS5607 bus.

use std::sync::Arc;

use star::adapters::hardware::HardwareAdapter;
use star::app::ports::{ActuatorPort, SensorPort};
use star::app::service::ControlService;
use star::app::status::StatusBoard;
use star::config::SystemConfig;
use star::counting::PulseCounter;
use star::drivers::hv_gate::HvGate;
use star::error::{Error, SensorError};
use star::fsm::StateId;
use star::sensors::Altimeter;

use crate::mock_hw::{prom, EventLog, MemRecords, Ms5607Sim, RecordingPin, DATASHEET_D1};

fn adapter(valid_crc: bool, config: &SystemConfig) -> (HardwareAdapter<Ms5607Sim, RecordingPin>, Ms5607Sim, RecordingPin) {
    let sim = Ms5607Sim::new(prom(valid_crc));
    let pin = RecordingPin::default();
    let hv = HvGate::new(pin.clone()).unwrap();
    let hw = HardwareAdapter::new(Altimeter::new(sim.clone(), config), hv);
    (hw, sim, pin)
}

#[test]
fn init_resets_and_validates_prom() {
    let (mut hw, sim, _) = adapter(true, &SystemConfig::default());
    let status = hw.init_altimeter().unwrap();
    assert!(status.is_valid());
    assert_eq!(sim.state.borrow().resets, 1);
}

#[test]
fn corrupted_prom_is_detected() {
    let (mut hw, _, _) = adapter(false, &SystemConfig::default());
    let status = hw.init_altimeter().unwrap();
    assert!(!status.is_valid());
    assert_ne!(status.stored_crc, status.computed_crc);
}

#[test]
fn reading_matches_datasheet_example() {
    let (mut hw, sim, _) = adapter(true, &SystemConfig::default());
    hw.init_altimeter().unwrap();
    let r = hw.read_altimeter().unwrap();
    assert_eq!(r.raw.pressure_raw, DATASHEET_D1);
    assert!((r.sample.temperature_c - 20.0).abs() < 0.01);
    assert!((r.sample.pressure_mbar - 1100.03).abs() < 0.01);
    assert_eq!(r.sample.pressure_first_mbar, r.sample.pressure_mbar);
    assert!(r.sample.altitude_m.is_none(), "no QFF yet");
    assert_eq!(sim.state.borrow().conversions, 2);
}

#[test]
fn altitude_after_calibration_is_site_height() {
    let config = SystemConfig::default();
    let (mut hw, _, _) = adapter(true, &config);
    hw.init_altimeter().unwrap();
    let qff = hw.calibrate_qff(&config.launch_site()).unwrap();
    assert!(qff > 1100.03);

    let alt = hw.read_altimeter().unwrap().sample.altitude_m.unwrap();
    let expected = f64::from(config.site_elevation_m + config.instrument_height_m);
    assert!((alt - expected).abs() < 2.0, "altitude {alt}");
}

#[test]
fn lower_pressure_reads_higher() {
    let config = SystemConfig::default();
    let (mut hw, sim, _) = adapter(true, &config);
    hw.init_altimeter().unwrap();
    hw.calibrate_qff(&config.launch_site()).unwrap();
    let ground = hw.read_altimeter().unwrap().sample.altitude_m.unwrap();

    sim.set_d1(DATASHEET_D1 - 60_000);
    let up = hw.read_altimeter().unwrap().sample.altitude_m.unwrap();
    assert!(up - ground > 150.0, "climb {}", up - ground);
}

#[test]
fn second_implicit_calibration_is_refused() {
    let config = SystemConfig::default();
    let (mut hw, _, _) = adapter(true, &config);
    hw.init_altimeter().unwrap();
    hw.calibrate_qff(&config.launch_site()).unwrap();
    assert_eq!(
        hw.calibrate_qff(&config.launch_site()),
        Err(SensorError::AlreadyCalibrated.into())
    );
    assert!(hw.recalibrate_qff(&config.launch_site()).is_ok());
}

#[test]
fn transient_bus_errors_are_retried() {
    let config = SystemConfig {
        altimeter_retries: 3,
        ..SystemConfig::default()
    };
    let (mut hw, sim, _) = adapter(true, &config);
    hw.init_altimeter().unwrap();
    sim.fail_next(2);
    assert!(hw.read_altimeter().is_ok());

    sim.fail_next(100);
    assert!(matches!(
        hw.read_altimeter(),
        Err(Error::Sensor(SensorError::Transport(_)))
    ));
}

#[test]
fn hv_gate_follows_port() {
    let (mut hw, _, pin) = adapter(true, &SystemConfig::default());
    assert_eq!(pin.level(), Some(false));
    hw.set_hv(true).unwrap();
    assert!(hw.is_hv_on());
    assert_eq!(pin.level(), Some(true));
    hw.set_hv(false).unwrap();
    assert_eq!(*pin.levels.borrow(), vec![false, true, false]);
}

#[test]
fn simulated_flight_switches_hv_on_the_climb() {
    let config = SystemConfig {
        self_test_enabled: false,
        ..SystemConfig::default()
    };
    let (mut hw, sim, pin) = adapter(true, &config);
    let counter = Arc::new(PulseCounter::new(
        config.dead_time_ceiling_ns(),
        config.indicator_flash_ms,
    ));
    let mut svc = ControlService::new(config, counter, Arc::new(StatusBoard::new()));
    let mut records = MemRecords::default();
    let mut events = EventLog::default();
    svc.startup(&mut hw, &mut records, &mut events).unwrap();

    svc.tick(1, &mut hw, &mut records, &mut events).unwrap();
    assert_eq!(svc.state(), StateId::Armed);
    assert_eq!(pin.level(), Some(false));

    sim.set_d1(DATASHEET_D1 - 60_000);
    svc.tick(2, &mut hw, &mut records, &mut events).unwrap();
    assert_eq!(svc.state(), StateId::Active);
    assert_eq!(pin.level(), Some(true));

    sim.set_d1(DATASHEET_D1);
    svc.tick(3, &mut hw, &mut records, &mut events).unwrap();
    assert_eq!(svc.state(), StateId::Armed);
    assert_eq!(pin.level(), Some(false));
    assert_eq!(records.rows.len(), 3);
    assert!(records.rows.iter().all(|r| r.altimeter.is_some()));
}
