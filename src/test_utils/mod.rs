//! Test doubles and fixtures.
//!
//! - [`FakeTransport`] serves canned catalog responses and records every URL
//!   requested, so tests can assert on (the absence of) network traffic.
//! - [`fixtures`] builds source tarballs and isolated install environments.
//!
//! ```rust,no_run
//! use pget_cli::test_utils::{FakeTransport, TestEnv};
//!
//! let env = TestEnv::new().unwrap();
//! let transport = FakeTransport::new()
//!     .with_json(&env.api("repos/pynosaur/foo"), serde_json::json!({"name": "foo"}));
//! ```

pub mod fake_transport;
pub mod fixtures;

pub use fake_transport::FakeTransport;
pub use fixtures::{TestEnv, source_tarball};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Install a test-writer subscriber once per process.
///
/// With `None`, logging is enabled only when `RUST_LOG` is set.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
