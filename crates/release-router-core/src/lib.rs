//! Core primitives for routing edge requests to a release prefix in the origin bucket.

pub mod cache;
pub mod clock;
pub mod config;
pub mod cookie;
pub mod error;
pub mod event;
pub mod parameter;
pub mod release;
pub mod resolver;
pub mod rewrite;
pub mod router;

pub use error::ReleaseError;
pub use event::{CfRequest, CloudFrontEvent};
pub use release::ReleaseId;
pub use resolver::{CachedResolver, CookieResolver, ReleaseResolver, Resolution, ReleaseSource};
pub use router::ReleaseRouter;
