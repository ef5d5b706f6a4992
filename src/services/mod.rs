pub mod aggregate;
pub mod poller;
pub mod sink;
pub mod status_client;
