//! Logging initialization for embedders and tests.

/// Initialize logging.
#[cfg(not(target_arch = "wasm32"))]
pub fn init() {
    use std::env;
    if env::var("RUST_LOG").is_err() {
        env::set_var(
            "RUST_LOG",
            if cfg!(debug_assertions) {
                "crtsim=debug"
            } else {
                "crtsim=info"
            },
        );
    }

    let _ = pretty_env_logger::try_init_timed();
}

/// Initialize logging.
#[cfg(target_arch = "wasm32")]
pub fn init() {}
