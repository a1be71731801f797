//! Independent, filtered snapshots of a codebase

pub mod docs;
pub mod engine;
pub mod scope;

#[cfg(test)]
pub mod tests;

pub use docs::reverted_documentation;
pub use engine::{snapshot_api, SnapshotEngine};
pub use scope::TypeParameterScope;
