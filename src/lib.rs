//! # metasearch
//!
//! Federated metasearch front end over [`metasearch_core`].
//!
//! A [`Metasearch`] instance is built from a [`MetasearchConfig`]: one
//! engine processor per configured engine, the compiled sitelink rules and
//! a suspension table. Each [`Metasearch::search`] call dispatches the query
//! to every eligible engine concurrently and merges their answers into one
//! [`SearchResponse`].
//!
//! ```no_run
//! use metasearch::{Metasearch, MetasearchConfig};
//! use metasearch_core::SearchQuery;
//!
//! # async fn run() -> metasearch::Result<()> {
//! let metasearch = Metasearch::from_config(MetasearchConfig::default())?;
//! let response = metasearch.search(&SearchQuery::new("rust async"), None).await;
//! for result in &response.results {
//!     println!("{} {}", result.title, result.url_str());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod search;

pub use config::MetasearchConfig;
pub use error::{MetasearchError, Result};
pub use search::{EngineSuspension, Metasearch, MetasearchBuilder, SearchResponse};
