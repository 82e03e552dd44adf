//! Remote recipe service: error kinds, wire bodies and the HTTP client.

mod api;
mod client;
mod error;
pub mod wire;

pub use api::{Connector, RecipeApi};
pub use client::{HttpConnector, RemoteClient, DEFAULT_TIMEOUT};
pub use error::{ApiResult, NetworkError};
