// Document-to-paginated-image publishing pipeline and the page-flip reader
// runtime that consumes it.

pub mod analytics;
pub mod cache;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod publish;
pub mod range_reader;
pub mod raster;
pub mod resilience;
pub mod settings;
pub mod store;
pub mod viewer;

pub mod test_utils;

pub use manifest::{Manifest, load_manifest, load_page_urls};
pub use publish::{PublishOptions, PublishProgress, PublishStage, Publisher};
pub use viewer::Viewer;
