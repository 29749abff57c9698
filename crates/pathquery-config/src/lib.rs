//! # pathquery configuration
//!
//! Settings shared by the pathquery tools: where the query schemas live,
//! network limits for fetching them, and the default log level.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pathquery_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("pathquery.toml").await?;
//!     println!("XML schema: {}", config.schemas.xml);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod loader;

pub use config::*;
pub use loader::*;
