//! Concrete state handler functions and table builder.
//!
//! ```text
//!  STARTUP ──▶ ARMED ──[alt > threshold]──────────────▶ ACTIVE
//!               │ ▲                                      │
//!  [no self-test yet,          ◀──[alt < threshold − deadband]
//!   alt < threshold − deadband]                          ▲
//!               ▼ │[duration elapsed]                    │
//!             SELF-TEST ──────────[alt > threshold]──────┘
//!
//!  Any state ──[shutdown requested]──▶ SHUTDOWN (terminal)
//! ```
//!
//! An unknown altitude never causes a transition.

use super::context::FsmContext;
use super::{StateDescriptor, StateId};
use log::info;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Startup,
            name: "Startup",
            on_enter: Some(startup_enter),
            on_exit: None,
            on_update: startup_update,
        },
        StateDescriptor {
            id: StateId::Armed,
            name: "Armed",
            on_enter: Some(armed_enter),
            on_exit: None,
            on_update: armed_update,
        },
        StateDescriptor {
            id: StateId::SelfTest,
            name: "SelfTest",
            on_enter: Some(self_test_enter),
            on_exit: Some(self_test_exit),
            on_update: self_test_update,
        },
        StateDescriptor {
            id: StateId::Active,
            name: "Active",
            on_enter: Some(active_enter),
            on_exit: Some(active_exit),
            on_update: active_update,
        },
        StateDescriptor {
            id: StateId::Shutdown,
            name: "Shutdown",
            on_enter: Some(shutdown_enter),
            on_exit: None,
            on_update: shutdown_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  STARTUP: sensors initialised and QFF set by the service before the
//  first tick
// ═══════════════════════════════════════════════════════════════════════════

fn startup_enter(ctx: &mut FsmContext) {
    ctx.commands = super::context::ControlCommands::all_off();
}

fn startup_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.shutdown_requested {
        return Some(StateId::Shutdown);
    }
    Some(StateId::Armed)
}

// ═══════════════════════════════════════════════════════════════════════════
//  ARMED: HV off, waiting for altitude
// ═══════════════════════════════════════════════════════════════════════════

fn armed_enter(ctx: &mut FsmContext) {
    ctx.commands.hv_on = false;
    ctx.commands.counting = true;
    ctx.commands.logging = true;
    info!(
        "ARMED: HV off, gate at {:.1} m (off below {:.1} m)",
        ctx.config.hv_threshold_m,
        ctx.config.hv_off_below_m()
    );
}

fn armed_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.shutdown_requested {
        return Some(StateId::Shutdown);
    }
    if ctx.above_threshold() {
        return Some(StateId::Active);
    }
    if !ctx.self_test_done && ctx.below_band() {
        return Some(StateId::SelfTest);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  SELF-TEST: tube energised briefly, nothing counted or logged
// ═══════════════════════════════════════════════════════════════════════════

fn self_test_enter(ctx: &mut FsmContext) {
    ctx.commands.hv_on = true;
    ctx.commands.counting = false;
    ctx.commands.logging = false;
    info!(
        "SELF-TEST: HV on for {}s",
        ctx.config.self_test_duration_secs
    );
}

fn self_test_exit(ctx: &mut FsmContext) {
    ctx.commands.hv_on = false;
    // Nothing from the test window may reach the ring or the output log.
    ctx.commands.reset_counting = true;
    ctx.self_test_done = true;
    info!("SELF-TEST: complete");
}

fn self_test_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.shutdown_requested {
        return Some(StateId::Shutdown);
    }
    if ctx.above_threshold() {
        return Some(StateId::Active);
    }
    if ctx.secs_in_state() >= f32::from(ctx.config.self_test_duration_secs) {
        return Some(StateId::Armed);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTIVE: HV on, counting and logging
// ═══════════════════════════════════════════════════════════════════════════

fn active_enter(ctx: &mut FsmContext) {
    ctx.commands.hv_on = true;
    ctx.commands.reset_counting = true;
    ctx.commands.counting = true;
    ctx.commands.logging = true;
    info!(
        "ACTIVE: HV on at {:.1} m",
        ctx.altitude_m.unwrap_or(f32::NAN)
    );
}

fn active_exit(ctx: &mut FsmContext) {
    ctx.commands.hv_on = false;
}

fn active_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.shutdown_requested {
        return Some(StateId::Shutdown);
    }
    // Counts are kept across a drop back to Armed.
    if ctx.below_band() {
        info!(
            "ACTIVE: altitude {:.1} m below {:.1} m, HV off",
            ctx.altitude_m.unwrap_or(f32::NAN),
            ctx.config.hv_off_below_m()
        );
        return Some(StateId::Armed);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  SHUTDOWN: terminal
// ═══════════════════════════════════════════════════════════════════════════

fn shutdown_enter(ctx: &mut FsmContext) {
    ctx.commands = super::context::ControlCommands::all_off();
    info!("SHUTDOWN: HV off, counting stopped");
}

fn shutdown_update(_ctx: &mut FsmContext) -> Option<StateId> {
    None
}
