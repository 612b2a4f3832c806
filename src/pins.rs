//! GPIO / peripheral pin assignments for the STAR monitor board.
//!
//! Single source of truth for the board wiring.  The edge ISR takes its
//! GPIO number from here; `main` checks every typed peripheral it hands to
//! a driver against these constants before startup.

// ---------------------------------------------------------------------------
// Geiger tube
// ---------------------------------------------------------------------------

/// Digital input from the tube's pulse-shaping stage.  Both edges of every
/// pulse raise an interrupt; the falling edge marks the pulse start.
pub const GEIGER_PULSE_GPIO: i32 = 4;

/// Digital output: enables the tube's high-voltage supply (active HIGH).
pub const HV_GATE_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Status indicator
// ---------------------------------------------------------------------------

/// Discrete LED flashed once per detected pulse.
pub const INDICATOR_LED_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// Altimeter (MS5607 on SPI2)
// ---------------------------------------------------------------------------

pub const ALTIMETER_SCLK_GPIO: i32 = 12;
pub const ALTIMETER_MOSI_GPIO: i32 = 11;
pub const ALTIMETER_MISO_GPIO: i32 = 13;
pub const ALTIMETER_CS_GPIO: i32 = 10;
