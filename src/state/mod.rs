//! Local state: well-known paths and the rendered config cache

pub mod cache;
pub mod paths;

pub use cache::ConfigCache;
pub use paths::IgnitionPaths;
