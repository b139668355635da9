/// Re-export `Config` from `leadpulse-core`; environment parsing lives there
/// so integration tests can build one without the server.
pub use leadpulse_core::config::Config;
