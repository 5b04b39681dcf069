//! Integration tests for the PureStream order sync engine.
//!
//! Every test lives under `tests/` and drives the public API of
//! `purestream-sync` end to end over in-memory sources, so no network
//! or disk is required.

/// Install a tracing subscriber for test runs.
///
/// Safe to call from every test; repeated calls are no-ops. Set
/// `RUST_LOG` to see engine logs while debugging a failure.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
