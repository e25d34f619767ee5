//! File boundary: loading input point layers and exporting results.

pub mod export;
pub mod loader;

pub use export::export_all;
pub use loader::{load_sites, LoadOptions};
