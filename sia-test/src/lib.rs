//! Shared test bootstrap for the workspace.
//!
//! Every test calls [`init`] first; repeated calls are free. It installs a
//! tracing subscriber that honors `RUST_LOG` and routes captured spans into
//! color-eyre's panic and error reports, so a failing consensus test prints
//! the chain of events that led to the failure.

use once_cell::sync::OnceCell;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

/// Initialize global test state: tracing with env filtering, and color-eyre
/// report hooks. Idempotent.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_test_writer())
            .with(filter)
            .with(ErrorLayer::default())
            .try_init();

        let _ = color_eyre::install();
    });
}

/// Common imports for integration tests.
pub mod prelude {
    pub use color_eyre::eyre::{bail, ensure, eyre, Report};
    pub type Result<T = (), E = Report> = std::result::Result<T, E>;
}
