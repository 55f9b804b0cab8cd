//! Search requests against the document store
//!
//! This module provides:
//! - Slice descriptors and query augmentation for sliced scrolls
//! - The search/scroll response envelope
//! - The page fetcher issuing search, scroll-advance and scroll-release calls

pub mod fetcher;
pub mod query;
pub mod response;

pub use fetcher::PageFetcher;
pub use query::{SliceDescriptor, augment};
pub use response::{SearchResponse, TotalHits, TotalRelation};
