//! Geiger pulse input: GPIO any-edge interrupt feeding [`PulseCounter`].
//!
//! The handler timestamps the edge with the high-resolution timer and
//! calls [`PulseCounter::on_edge`].  That is all it does: no logging, no
//! allocation, one short critical section.
//!
//! The counter is handed to the ISR as a raw `Arc` pointer that
//! [`EdgeInput`] reclaims when dropped, after the handler is removed.

use std::sync::Arc;

use crate::counting::PulseCounter;
#[cfg(not(target_os = "espidf"))]
use crate::counting::detector::EdgeOutcome;
use crate::error::Result;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Registered edge interrupt.  Dropping it detaches the handler.
pub struct EdgeInput {
    gpio: i32,
    #[cfg(target_os = "espidf")]
    counter: *const PulseCounter,
    #[cfg(not(target_os = "espidf"))]
    counter: Arc<PulseCounter>,
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn geiger_edge_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the pointer produced by `Arc::into_raw` in `attach`
    // and stays valid until `Drop` removes this handler.
    let counter = unsafe { &*(arg as *const PulseCounter) };
    let now_ns = unsafe { esp_timer_get_time() } * 1_000;
    counter.on_edge(now_ns);
}

impl EdgeInput {
    /// Configure `gpio` as a pulled-up input and route both edges to the
    /// counter.
    #[cfg(target_os = "espidf")]
    pub fn attach(gpio: i32, counter: Arc<PulseCounter>) -> Result<Self> {
        use crate::error::Error;

        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << gpio,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
        };
        // SAFETY: plain FFI calls on a pin this module owns.  ESP_ERR_INVALID_STATE
        // from the ISR service install means it is already installed.
        unsafe {
            if gpio_config(&cfg) != ESP_OK as i32 {
                return Err(Error::Init("geiger input gpio_config"));
            }
            let ret = gpio_install_isr_service(0);
            if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
                return Err(Error::Init("gpio ISR service install"));
            }
        }

        let raw = Arc::into_raw(counter);
        // SAFETY: `raw` outlives the handler; see `Drop`.
        let ret = unsafe {
            gpio_isr_handler_add(gpio, Some(geiger_edge_isr), raw as *mut core::ffi::c_void)
        };
        if ret != ESP_OK as i32 {
            // SAFETY: the handler was not installed, so this is the only owner.
            drop(unsafe { Arc::from_raw(raw) });
            return Err(Error::Init("geiger ISR handler add"));
        }
        unsafe {
            gpio_intr_enable(gpio);
        }
        log::info!("Geiger edge ISR attached on GPIO{}", gpio);
        Ok(Self { gpio, counter: raw })
    }

    /// Host build: no interrupt, edges are fed with [`inject`](Self::inject).
    #[cfg(not(target_os = "espidf"))]
    pub fn attach(gpio: i32, counter: Arc<PulseCounter>) -> Result<Self> {
        log::info!("Geiger edge input (sim) on GPIO{}", gpio);
        Ok(Self { gpio, counter })
    }

    /// Deliver one simulated edge at `now_ns`.
    #[cfg(not(target_os = "espidf"))]
    pub fn inject(&self, now_ns: i64) -> EdgeOutcome {
        self.counter.on_edge(now_ns)
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }
}

#[cfg(target_os = "espidf")]
impl Drop for EdgeInput {
    fn drop(&mut self) {
        // SAFETY: after the handler is removed nothing else holds `counter`.
        unsafe {
            gpio_intr_disable(self.gpio);
            gpio_isr_handler_remove(self.gpio);
            drop(Arc::from_raw(self.counter));
        }
    }
}
