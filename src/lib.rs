//! # ppe-plot
//!
//! Plotting tooling for the privacy-preserving-encoding benchmarks. It reads
//! the processing-time CSV produced by the benchmark harness and renders
//! latency charts with mean +/- standard-deviation bands.

use env_logger::Env;
use std::sync::Once;

pub mod env;
pub mod tasks;

static INIT: Once = Once::new();

pub fn init_logging(is_test: bool) {
    INIT.call_once(|| {
        let default_filter = if is_test {
            "info,ppe_plot=debug"
        } else {
            "info"
        };

        let _ = env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
            .is_test(is_test)
            .try_init();
    });
}
