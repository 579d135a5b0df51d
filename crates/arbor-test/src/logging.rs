//! Test logging utilities for Arbor forms
//!
//! Form trees log through `tracing`; tests opt into seeing those events.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize logging for tests (call once)
///
/// Installs a `tracing-subscriber` formatter writing through the test
/// harness capture. The filter comes from `RUST_LOG` and defaults to
/// `arbor_forms=debug`.
///
/// # Examples
///
/// ```
/// use arbor_test::logging::init_test_logging;
///
/// init_test_logging();
/// init_test_logging();
/// ```
pub fn init_test_logging() {
	INIT.call_once(|| {
		let filter =
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("arbor_forms=debug"));
		let _ = tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_test_writer()
			.try_init();
	});
}
