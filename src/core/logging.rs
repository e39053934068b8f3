//! Logging initialization

/// Initialize logging with the default `info` filter.
///
/// Override with the RUST_LOG environment variable.
///
/// # Example
/// ```
/// blockworld::core::logging::init();
/// log::info!("World streaming started");
/// ```
pub fn init() {
    init_with_filter("info");
}

/// Initialize logging with `filter` as the default when RUST_LOG is unset.
///
/// Later calls are ignored.
pub fn init_with_filter(filter: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp_millis()
        .try_init();
}
