//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the task set against
//! mock adapters.  All tests run on the host (x86_64) with no real
//! hardware required.

#![cfg(not(target_os = "espidf"))]

mod comm_tests;
mod mock_hw;
mod rig;
mod scenario_tests;
mod task_set_tests;
