//! Repository content acquisition.
//!
//! Two interchangeable [`ContentAcquirer`] implementations:
//! - [`ApiTreeDownloader`]: no clone; metadata, recursive tree listing and blob
//!   fetches against the hosting REST API. Files carry raw content.
//! - [`CloneDownloader`]: shallow `git clone` into a [`ScratchDir`], then walk the
//!   checkout and run the extractor over every supported file.
//!
//! The strategy is picked once from [`AnalyzerConfig`] by [`acquirer_for`].

pub mod api_tree;
pub mod clone_walk;
pub mod scratch;

use std::sync::Arc;

use tracing::info;

pub use api_tree::{ApiTreeDownloader, MAX_API_FILES};
pub use clone_walk::CloneDownloader;
pub use scratch::ScratchDir;

use crate::config::{AcquisitionStrategy, AnalyzerConfig};
use crate::contract::ContentAcquirer;

pub fn acquirer_for(config: &AnalyzerConfig) -> Arc<dyn ContentAcquirer> {
    let acquirer: Arc<dyn ContentAcquirer> = match config.strategy {
        AcquisitionStrategy::ApiTree => {
            Arc::new(ApiTreeDownloader::new(config.api_base_url.clone()))
        }
        AcquisitionStrategy::CloneWalk => Arc::new(CloneDownloader::new()),
    };
    info!(strategy = acquirer.strategy_name(), "Selected acquisition strategy");
    acquirer
}
