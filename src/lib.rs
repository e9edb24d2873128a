pub mod config;
pub mod cpt;
pub mod error;
pub mod model;
pub mod network;
pub mod node;
pub mod pipeline;

/// trait for random generation, mainly (strictly?) for testing
pub trait Arbitrary {
    fn random() -> Self;
}

/// initialize terminal logging, respecting `RUST_LOG`
#[cfg(feature = "cli")]
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
