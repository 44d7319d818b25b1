/// Installs `env_logger` for the current test binary
///
/// Log output is captured by the test harness, and can be enabled via `RUST_LOG`,
/// e.g. `RUST_LOG=alder_runtime=trace`. Calling this more than once has no effect.
pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .try_init();
}
