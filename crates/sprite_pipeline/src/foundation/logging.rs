//! Logging initialisation for binaries built on the pipeline

/// Initialize the logging system with a fallback filter.
///
/// `RUST_LOG` still wins when set; otherwise `default_level` (e.g. `"info"`,
/// `"sprite_pipeline=debug"`) is used. Calling this twice is harmless.
pub fn init_with_level(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .try_init();
}
