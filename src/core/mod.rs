//! Process state shared across the build and watch paths.

mod state;

pub use state::{is_shutdown, register_shutdown, setup_shutdown_handler};
