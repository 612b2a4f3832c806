//! STAR firmware entry point.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                     │
//! │                                                               │
//! │  HardwareAdapter    LogEventSink   CsvRecordLog  JsonConfig   │
//! │  (Sensor+Actuator)  (EventSink)    (RecordSink)  (ConfigPort) │
//! │                                                               │
//! │  ──────────────── Port Trait Boundary ──────────────────      │
//! │                                                               │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │            ControlService (pure logic)                  │  │
//! │  │  FSM · AltitudeSupervisor · PulseCounter                │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! │                                                               │
//! │  Edge ISR → PulseCounter ← Indicator worker · SecondTicker    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::fs::File;
use std::io::{BufRead, BufWriter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};

use anyhow::{Context, Result};
use esp_idf_hal::gpio::{Pin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::spi::config::{Config as SpiConfig, MODE_3};
use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriver, SpiDriverConfig};
use esp_idf_hal::units::Hertz;
use log::{error, info, warn};

use star::adapters::config_file::JsonConfigFile;
use star::adapters::hardware::HardwareAdapter;
use star::adapters::log_sink::LogEventSink;
use star::adapters::record_log::CsvRecordLog;
use star::app::commands::AppCommand;
use star::app::ports::ConfigPort;
use star::app::service::ControlService;
use star::app::status::StatusBoard;
use star::config::FlightPreset;
use star::counting::PulseCounter;
use star::drivers::edge_isr::EdgeInput;
use star::drivers::hv_gate::HvGate;
use star::drivers::indicator::Indicator;
use star::drivers::task_pin::{spawn_on_core, Core};
use star::drivers::tick::SecondTicker;
use star::pins;
use star::sensors::Altimeter;

const STORAGE_BASE: &str = "/spiffs\0";
const CONFIG_PATH: &str = "/spiffs/star.json";
const OUTPUT_PATH: &str = "/spiffs/star_out.csv";

// ── Storage ───────────────────────────────────────────────────

fn mount_storage() -> Result<()> {
    use esp_idf_svc::sys::*;

    let conf = esp_vfs_spiffs_conf_t {
        base_path: STORAGE_BASE.as_ptr().cast(),
        partition_label: core::ptr::null(),
        max_files: 4,
        format_if_mount_failed: true,
    };
    // SAFETY: `conf` points at 'static NUL-terminated strings.
    let ret = unsafe { esp_vfs_spiffs_register(&conf) };
    if ret != ESP_OK as i32 {
        anyhow::bail!("SPIFFS mount failed (rc={ret})");
    }
    info!("Storage mounted at {}", STORAGE_BASE.trim_end_matches('\0'));
    Ok(())
}

// ── Pin map ───────────────────────────────────────────────────

/// Refuse to start when the typed peripheral handed to a driver is not the
/// one `pins` documents for it.
fn check_wiring(role: &str, pin: &impl Pin, wired: i32) -> Result<()> {
    let actual = i32::from(pin.pin());
    if actual != wired {
        anyhow::bail!("{role} is on GPIO{actual}, board wiring says GPIO{wired}");
    }
    Ok(())
}

// ── Console ───────────────────────────────────────────────────

/// `stop` requests shutdown, `qff` recalibrates the sea-level reference.
fn console_loop(tx: Sender<AppCommand>) {
    for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        let cmd = match line.trim() {
            "stop" => AppCommand::Shutdown,
            "qff" => AppCommand::RecalibrateQff,
            "" => continue,
            other => {
                warn!("Console: unknown command '{}'", other);
                continue;
            }
        };
        if tx.send(cmd).is_err() {
            break;
        }
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  STAR monitor v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let preset: FlightPreset = option_env!("STAR_PRESET").unwrap_or("launch-day").parse()?;
    mount_storage()?;
    let config = JsonConfigFile::new(CONFIG_PATH, preset).load()?;
    info!(
        "Preset {:?}: HV on above {:.1} m, off below {:.1} m",
        preset,
        config.hv_threshold_m,
        config.hv_off_below_m()
    );

    // ── 3. Shared state ───────────────────────────────────────
    let counter = Arc::new(PulseCounter::new(
        config.dead_time_ceiling_ns(),
        config.indicator_flash_ms,
    ));
    let status = Arc::new(StatusBoard::new());
    let running = Arc::new(AtomicBool::new(true));

    // ── 4. Peripherals ────────────────────────────────────────
    let p = Peripherals::take()?;
    check_wiring("SPI SCLK", &p.pins.gpio12, pins::ALTIMETER_SCLK_GPIO)?;
    check_wiring("SPI MOSI", &p.pins.gpio11, pins::ALTIMETER_MOSI_GPIO)?;
    check_wiring("SPI MISO", &p.pins.gpio13, pins::ALTIMETER_MISO_GPIO)?;
    check_wiring("SPI CS", &p.pins.gpio10, pins::ALTIMETER_CS_GPIO)?;
    check_wiring("HV gate", &p.pins.gpio5, pins::HV_GATE_GPIO)?;
    check_wiring("Indicator LED", &p.pins.gpio6, pins::INDICATOR_LED_GPIO)?;
    let spi_bus = SpiDriver::new(
        p.spi2,
        p.pins.gpio12,
        p.pins.gpio11,
        Some(p.pins.gpio13),
        &SpiDriverConfig::new(),
    )?;
    let spi = SpiDeviceDriver::new(
        spi_bus,
        Some(p.pins.gpio10),
        &SpiConfig::new()
            .baudrate(Hertz(config.spi_clock_hz))
            .data_mode(MODE_3),
    )?;
    let hv = HvGate::new(PinDriver::output(p.pins.gpio5)?)?;
    let led = PinDriver::output(p.pins.gpio6)?;
    let mut hw = HardwareAdapter::new(Altimeter::new(spi, &config), hv);

    // ── 5. Output log ─────────────────────────────────────────
    let file = File::create(OUTPUT_PATH).with_context(|| format!("creating {OUTPUT_PATH}"))?;
    let mut records = CsvRecordLog::new(BufWriter::new(file));
    let mut sink = LogEventSink::new();

    // ── 6. Startup: sensor init, CRC, QFF → Armed ─────────────
    let mut service = ControlService::new(config, Arc::clone(&counter), Arc::clone(&status));
    service.startup(&mut hw, &mut records, &mut sink)?;

    // ── 7. Edge ISR and workers ───────────────────────────────
    let edges = EdgeInput::attach(pins::GEIGER_PULSE_GPIO, Arc::clone(&counter))?;

    let indicator = {
        let running = Arc::clone(&running);
        let counter = Arc::clone(&counter);
        spawn_on_core(Core::Pro, 3, 4, "indicator\0", move || {
            Indicator::new(led, counter).run(&running);
        })?
    };

    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_on_core(Core::Pro, 2, 4, "console\0", move || console_loop(cmd_tx))?;

    // ── 8. Control loop ───────────────────────────────────────
    let mut ticker = SecondTicker::new(Arc::clone(&running));
    while let Some(second) = ticker.next() {
        while let Ok(cmd) = cmd_rx.try_recv() {
            if let Err(e) = service.handle_command(cmd, &mut hw, &mut records, &mut sink) {
                error!("Command {:?} failed: {}", cmd, e);
            }
            if cmd == AppCommand::Shutdown {
                running.store(false, Ordering::Release);
            }
        }
        if let Err(e) = service.tick(second, &mut hw, &mut records, &mut sink) {
            error!("Tick {}: {}", second, e);
        }
    }

    // ── 9. Teardown ───────────────────────────────────────────
    running.store(false, Ordering::Release);
    if let Err(e) = service.shutdown(&mut hw, &mut records, &mut sink) {
        error!("Shutdown: {}", e);
    }
    drop(edges);
    if indicator.join().is_err() {
        warn!("Indicator worker panicked");
    }
    info!("Halted: HV {}", if status.hv_on() { "ON" } else { "off" });
    Ok(())
}
