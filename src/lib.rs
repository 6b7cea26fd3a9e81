// ribpath - multi-vendor RIB normalization and topology pathfinding

pub mod addr;
pub mod config;
pub mod device;
pub mod error;
pub mod identity;
pub mod interfaces;
pub mod routes;
pub mod store;
pub mod topology;
pub mod vendor;

pub use error::{AppError, AppResult};
