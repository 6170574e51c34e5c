pub mod channel;
pub mod client;
pub mod commands;
pub mod config;
pub mod registry;
pub mod resync;
pub mod server;
pub mod store;
pub mod sync;
