// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod cadence;
pub mod config;
pub mod error;
pub mod geo;
pub mod leaderboard;
pub mod profile;
pub mod runtime;
pub mod sensor;
pub mod session;
pub mod sources;
pub mod util;
