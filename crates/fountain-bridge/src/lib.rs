pub mod aggregator;
pub mod ble_session;
pub mod config;
pub mod dispatcher;
pub mod network_session;
pub mod registry;
pub mod router;
pub mod server;
pub mod state;
