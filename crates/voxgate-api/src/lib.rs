// voxgate-api: Async Rust client for the Akuvox SmartPlus cloud API.

mod app;
mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod region;
pub mod session;
pub mod transport;

pub use client::CloudClient;
pub use error::Error;
pub use region::CloudRegion;
pub use session::{DeploymentVariant, Session, obfuscate_phone_number};
pub use transport::TransportConfig;
