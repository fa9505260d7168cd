//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one part of the link
//! against the mock transport. All tests run on the host with no radio
//! required.

mod mock_transport;
mod session_tests;
