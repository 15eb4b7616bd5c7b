#![allow(dead_code, unused_imports)]

pub mod kube;

use tracing_subscriber::EnvFilter;

/// Installs a log subscriber which honors `RUST_LOG`.
///
/// Every test binary calls this several times, so only the first call
/// takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
