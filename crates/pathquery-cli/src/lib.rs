//! Library side of the `pq` binary, shared with its integration tests.

pub mod cli;
pub mod commands;

/// Exit status for requests the user has to fix
pub const EXIT_CLIENT_ERROR: u8 = 2;
/// Exit status for failures on the service side
pub const EXIT_SERVICE_ERROR: u8 = 3;
