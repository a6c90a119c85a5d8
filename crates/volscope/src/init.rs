//! Process-level setup.

/// Installs `env_logger` as the `log` backend.
///
/// Honors `RUST_LOG`. Calling it again, or after another logger was
/// installed, does nothing.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Like [`init_logging`], with a default filter used when `RUST_LOG` is unset.
pub fn init_logging_with_default(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}
