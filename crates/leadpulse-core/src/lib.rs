pub mod aggregate;
pub mod config;
pub mod error;
pub mod flow;
pub mod recorder;
pub mod session;
pub mod store;
pub mod validate;
