//! Process-wide logging setup.

pub mod subscriber;

pub use subscriber::{LogFormat, LogSettings};

/// Initialize logging from `RUST_LOG` / `LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init(LogSettings::from_env());
}
