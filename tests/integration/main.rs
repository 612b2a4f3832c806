//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a subsystem against mock
//! adapters.  All tests run on the host (x86_64) with no real hardware.

mod altimeter_tests;
mod control_loop_tests;
mod mock_hw;
