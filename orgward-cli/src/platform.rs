//! Platform wiring for CLI commands that talk to the forge.
//!
//! The concrete forge adapter is provided outside this workspace behind the
//! [`orgward_forge::ForgePort`] contract; this wiring runs commands against
//! the in-process forge, which is what local development and the test suite
//! exercise. `--dry-run` swaps the port for its read-only wrap, so reported
//! counts reflect what would have been written.

use std::sync::Arc;

use orgward_engine::{Config, Platform};
use orgward_forge::mock::InMemoryForge;

pub fn connect(dry_run: bool) -> Platform {
    let config = Config {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ..Config::default()
    };

    let forge = Arc::new(InMemoryForge::new("local"));
    if dry_run {
        Platform::read_only(config, forge)
    } else {
        Platform::new(config, forge)
    }
}
