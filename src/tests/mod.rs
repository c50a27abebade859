// Test modules for evco-http crate
//
// Each source module has a corresponding test file focused on the business
// rules it enforces. HTTP round-trips live in the crate's tests/ directory.

// Shared fixtures
pub mod helpers;

pub mod logging;
pub mod refresh;
