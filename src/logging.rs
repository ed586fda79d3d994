//! env_logger setup; RUST_LOG overrides the default `info` filter.

pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
