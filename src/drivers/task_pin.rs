//! Core-pinned thread spawning for the ESP32-S3.
//!
//! ESP-IDF implements `std::thread` on pthreads over FreeRTOS tasks.
//! `esp_pthread_set_cfg()` applies to the *next* `pthread_create()` from
//! the calling thread, so configure-then-spawn must not interleave with
//! other thread creation on that thread.

use std::io;
use std::thread::JoinHandle;

/// CPU core identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0: ESP-IDF system tasks and the indicator worker.
    Pro = 0,
    /// Core 1: the control loop and the GPIO ISR it registers.
    App = 1,
}

/// Spawn `f` pinned to `core` with the given priority and stack.
/// `name` must be NUL-terminated (e.g. `"control\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_on_core<F>(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    // SAFETY: the config struct is fully initialised by the IDF default
    // and `name` is a 'static NUL-terminated string.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = i32::from(priority);
        cfg.stack_size = (stack_kb * 1024) as _;
        cfg.thread_name = name.as_ptr().cast();
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        core,
        priority,
        stack_kb
    );
    std::thread::Builder::new().name(display_name.into()).spawn(f)
}

/// Host fallback: no pinning or priority, only the stack size applies.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core<F>(
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let display_name = name.trim_end_matches('\0');
    log::info!("Spawning '{}' (sim, stack={}KB)", display_name, stack_kb);
    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
}
