//! Control service: the hexagonal core.
//!
//! [`ControlService`] owns the FSM, the altitude supervisor and the
//! counting handles.  All I/O flows through port traits injected at call
//! sites, so the whole loop runs against mock adapters in tests.
//!
//! ```text
//!  SensorPort ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!                 │       ControlService         │
//! ActuatorPort ◀──│  FSM · Supervisor · Counter  │ ──▶ RecordSink
//!                 └─────────────────────────────┘
//! ```
//!
//! ## Tick order
//!
//! 1. roll the ring over to the new second and take the completed slot
//! 2. read the altimeter (adapter retries internally)
//! 3. supervisor turns the read into the altitude the FSM sees
//! 4. FSM tick
//! 5. apply HV and counter commands
//! 6. append the output row, heartbeat, periodic flush

use std::sync::Arc;

use log::{error, info, warn};

use crate::config::SystemConfig;
use crate::counting::{PulseCounter, RadiationAggregator};
use crate::error::{Fault, Result};
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::safety::AltitudeSupervisor;
use crate::sensors::AltimeterReading;
use crate::sensors::compensation::LaunchSite;

use super::commands::AppCommand;
use super::events::{AppEvent, HeartbeatData};
use super::ports::{ActuatorPort, EventSink, RecordSink, SensorPort};
use super::record::OutputRecord;
use super::status::{StatusBoard, StatusSnapshot};

// ───────────────────────────────────────────────────────────────
// ControlService
// ───────────────────────────────────────────────────────────────

/// The power-control loop.
pub struct ControlService {
    fsm: Fsm,
    ctx: FsmContext,
    supervisor: AltitudeSupervisor,
    counter: Arc<PulseCounter>,
    aggregator: RadiationAggregator,
    status: Arc<StatusBoard>,
    site: LaunchSite,
    /// Reading taken during the last tick, `None` if that read failed.
    last_reading: Option<AltimeterReading>,
    /// Level the HV gate actually holds after the last write attempt.
    hv_level: bool,
    anomalies_reported: u32,
    tick_count: u64,
}

impl ControlService {
    /// Construct the service.  Does **not** touch hardware; call
    /// [`startup`](Self::startup) next.
    pub fn new(config: SystemConfig, counter: Arc<PulseCounter>, status: Arc<StatusBoard>) -> Self {
        let supervisor = AltitudeSupervisor::new(&config);
        let aggregator = RadiationAggregator::new(Arc::clone(&counter), config.usv_per_cpm);
        let site = config.launch_site();
        let ctx = FsmContext::new(config);
        let fsm = Fsm::new(build_state_table(), StateId::Startup);

        Self {
            fsm,
            ctx,
            supervisor,
            counter,
            aggregator,
            status,
            site,
            last_reading: None,
            hv_level: false,
            anomalies_reported: 0,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring the system from power-on to `Armed`.
    ///
    /// HV is forced off, the altimeter is reset and its PROM checked, QFF
    /// is calibrated and the output header written.  Any error here is
    /// fatal and returned to the caller.
    pub fn startup(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        records: &mut impl RecordSink,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(StateId::Startup));
        hw.set_hv(false)?;

        let calibration = hw.init_altimeter()?;
        sink.emit(&AppEvent::SensorInit {
            crc_valid: calibration.is_valid(),
        });
        if !calibration.is_valid() {
            if self.ctx.config.abort_on_crc_mismatch {
                error!(
                    "Altimeter PROM CRC mismatch (stored {:#x}, computed {:#x}), aborting",
                    calibration.stored_crc, calibration.computed_crc
                );
                calibration.check()?;
            }
            warn!(
                "Altimeter PROM CRC mismatch (stored {:#x}, computed {:#x}), continuing",
                calibration.stored_crc, calibration.computed_crc
            );
            self.supervisor.raise(Fault::CalibrationCrc);
            sink.emit(&AppEvent::FaultDetected(self.supervisor.faults()));
        }

        let qff_mbar = hw.calibrate_qff(&self.site)?;
        sink.emit(&AppEvent::QffCalibrated {
            qff_mbar,
            recalibrated: false,
        });

        records.write_header()?;

        self.transition_to(StateId::Armed, sink);
        self.apply_commands(hw, sink)?;
        self.publish_status();
        info!("ControlService started, QFF {:.2} mbar", qff_mbar);
        Ok(())
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle for wall-clock `second` (seconds since start).
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`]; this avoids a double mutable borrow while keeping
    /// the port boundary explicit.  A returned error is an HV write
    /// failure; the next tick retries it.
    pub fn tick(
        &mut self,
        second: i64,
        hw: &mut (impl SensorPort + ActuatorPort),
        records: &mut impl RecordSink,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if self.fsm.current_state() == StateId::Shutdown {
            return Ok(());
        }

        // 1. Second rollover
        let Some(completed) = self.counter.roll_over(second) else {
            warn!("Tick for second {} did not advance, skipped", second);
            return Ok(());
        };
        self.tick_count += 1;
        self.report_anomalies(sink);

        // 2–3. Altitude
        self.last_reading = match hw.read_altimeter() {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!("Altimeter read failed: {}", e);
                None
            }
        };
        let measured = self
            .last_reading
            .and_then(|r| r.sample.altitude_m)
            .map(|a| a as f32);
        let faults_before = self.supervisor.faults();
        self.ctx.altitude_m = self.supervisor.evaluate(measured);
        self.report_faults(faults_before, sink);

        // 4. FSM
        let prev = self.fsm.current_state();
        self.fsm.tick(&mut self.ctx);
        let state = self.fsm.current_state();
        if state != prev {
            sink.emit(&AppEvent::StateChanged { from: prev, to: state });
        }

        // 5. Actuators
        let applied = self.apply_commands(hw, sink);

        // 6. Output.  The second that just ended belonged to the self-test
        // if the FSM was still in it, so it is not logged.
        if self.ctx.commands.logging && state.records_output() && prev != StateId::SelfTest {
            let record = OutputRecord {
                elapsed_s: second,
                slot: completed,
                altimeter: self.last_reading,
            };
            if let Err(e) = records.append(&record) {
                warn!("Output row for second {} lost: {}", second, e);
            }
        }
        if every(second, self.ctx.config.heartbeat_interval_secs) {
            sink.emit(&AppEvent::Heartbeat(self.heartbeat(second)));
        }
        if every(second, self.ctx.config.flush_interval_secs) {
            if let Err(e) = records.flush() {
                warn!("Output flush failed: {}", e);
            }
        }

        self.publish_status();
        applied
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command between ticks.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        hw: &mut (impl SensorPort + ActuatorPort),
        records: &mut impl RecordSink,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            AppCommand::Shutdown => self.shutdown(hw, records, sink),
            AppCommand::RecalibrateQff => {
                let qff_mbar = hw.recalibrate_qff(&self.site)?;
                info!("QFF recalibrated to {:.2} mbar", qff_mbar);
                sink.emit(&AppEvent::QffCalibrated {
                    qff_mbar,
                    recalibrated: true,
                });
                Ok(())
            }
        }
    }

    /// Drive the Shutdown path: HV off, counting stopped, output flushed.
    /// Calling it again is a no-op.
    pub fn shutdown(
        &mut self,
        hw: &mut impl ActuatorPort,
        records: &mut impl RecordSink,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if self.fsm.current_state() == StateId::Shutdown {
            return Ok(());
        }
        self.ctx.shutdown_requested = true;
        self.transition_to(StateId::Shutdown, sink);
        let applied = self.apply_commands(hw, sink);
        let flushed = records.flush();
        self.publish_status();
        sink.emit(&AppEvent::ShutdownComplete);
        applied.and(flushed)
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// HV level the FSM asked for.
    pub fn hv_commanded(&self) -> bool {
        self.ctx.commands.hv_on
    }

    pub fn self_test_done(&self) -> bool {
        self.ctx.self_test_done
    }

    /// Altitude the FSM acted on during the last tick.
    pub fn altitude(&self) -> Option<f32> {
        self.ctx.altitude_m
    }

    /// Current fault bitmask (0 = no faults).
    pub fn fault_flags(&self) -> u8 {
        self.supervisor.faults()
    }

    /// Control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Live configuration.
    pub fn config(&self) -> &SystemConfig {
        &self.ctx.config
    }

    /// Build a heartbeat snapshot for `second`.
    pub fn heartbeat(&self, second: i64) -> HeartbeatData {
        let window = usize::from(self.ctx.config.dose_window_secs);
        HeartbeatData {
            elapsed_s: second,
            state: self.fsm.current_state(),
            hv_on: self.hv_level,
            altitude_m: self.ctx.altitude_m,
            temperature_c: self.last_reading.map(|r| r.sample.temperature_c),
            pressure_mbar: self.last_reading.map(|r| r.sample.pressure_mbar),
            dose_usv_h: self.aggregator.dose_rate(window),
            corrected_cps: self.aggregator.dead_time_corrected_cps(window),
            fault_flags: self.supervisor.faults(),
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn transition_to(&mut self, next: StateId, sink: &mut impl EventSink) {
        let prev = self.fsm.current_state();
        self.fsm.force_transition(next, &mut self.ctx);
        if prev != next {
            sink.emit(&AppEvent::StateChanged { from: prev, to: next });
        }
    }

    /// Translate FSM commands into counter and port calls.  The counter is
    /// reset before HV comes on so the first Active second starts clean.
    fn apply_commands(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) -> Result<()> {
        if self.ctx.commands.reset_counting {
            self.counter.reset();
            self.ctx.commands.reset_counting = false;
        }
        if self.counter.is_enabled() != self.ctx.commands.counting {
            self.counter.set_enabled(self.ctx.commands.counting);
        }

        let want = self.ctx.commands.hv_on;
        let switched = if hw.is_hv_on() == want {
            Ok(())
        } else {
            hw.set_hv(want)
                .map(|()| sink.emit(&AppEvent::HvSwitched(want)))
        };
        self.hv_level = hw.is_hv_on();
        switched
    }

    fn report_anomalies(&mut self, sink: &mut impl EventSink) {
        let total = self.counter.anomaly_count();
        let new = total.wrapping_sub(self.anomalies_reported);
        if new > 0 {
            self.anomalies_reported = total;
            sink.emit(&AppEvent::EdgeAnomalies(new));
        }
    }

    fn report_faults(&self, before: u8, sink: &mut impl EventSink) {
        let after = self.supervisor.faults();
        if after == before {
            return;
        }
        if after & !before != 0 {
            sink.emit(&AppEvent::FaultDetected(after));
        } else if after == 0 {
            sink.emit(&AppEvent::FaultCleared);
        }
    }

    fn publish_status(&self) {
        self.status.publish(StatusSnapshot {
            state: self.fsm.current_state(),
            hv_on: self.hv_level,
            self_test_done: self.ctx.self_test_done,
            altitude_m: self.ctx.altitude_m,
            fault_flags: self.supervisor.faults(),
        });
    }
}

/// `second` falls on a multiple of `interval` (0 disables).
fn every(second: i64, interval: u32) -> bool {
    interval != 0 && second > 0 && second % i64::from(interval) == 0
}
