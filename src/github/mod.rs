//! GitHub binding: REST client, payload types, and the ref-tolerant
//! directory listing used by the data agent.

pub mod client;
pub mod error;
pub mod fallback;
pub mod types;

pub use client::{CodeSearchFilters, GithubClient, PullRequestCountFilters};
pub use fallback::SafeDirectoryListing;
