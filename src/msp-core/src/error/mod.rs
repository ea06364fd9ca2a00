pub mod ca;
pub mod config;
pub mod crypto;
pub mod endpoint;
pub mod fs;
pub mod identity;
pub mod store;
pub mod transport;
