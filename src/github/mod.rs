//! Remote platform access
//!
//! - **client**: rate-limit-evading request client
//! - **rotation**: network identity rotation strategies
//! - **discovery**: contributor, user-repository and random-seed expansion

mod client;
mod discovery;
mod rotation;

pub use client::{ApiClient, ApiConfig, DEFAULT_API_URL, DEFAULT_PER_PAGE, Endpoint};
pub use discovery::{DEFAULT_MAX_LISTING_ID, Discovery, GithubDiscovery};
pub use rotation::{BackoffRotator, CommandRotator, IdentityRotator, RotationConfig, Rotator};
