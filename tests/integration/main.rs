//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one subsystem of the
//! monitor against the mock gateways.  Nothing here touches the network.

mod mock_gateways;
mod scheduler_tests;
mod service_tests;
mod watchdog_tests;
