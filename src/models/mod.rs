//! Core data models for the proximity analysis.

pub mod classified;
pub mod site;

pub use classified::ClassifiedStation;
pub use site::{Site, SiteCollection, SiteLayer};
