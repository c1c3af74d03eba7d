mod client;
mod error;
pub mod memory;

pub use client::*;
pub use error::ClientError;
pub use memory::MemoryClusterClient;

pub use tenant_model as model;

pub type SharedClient<C> = std::sync::Arc<C>;
