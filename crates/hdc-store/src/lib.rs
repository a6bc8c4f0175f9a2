//! HDC Partitioned Store
//!
//! Columnar tables persisted as Parquet files, one per
//! `(dataset prefix, entity code, fiscal year)`:
//!
//! ```text
//! {base_dir}/{year}/{prefix}/{prefix}_{entity}_{year}.parquet
//! ```
//!
//! The entity `_all_` names the consolidated partition of a dataset.
//!
//! # Example
//!
//! ```rust,ignore
//! use hdc_store::{FiscalYear, PartitionedStore, StoreConfig};
//!
//! let store = PartitionedStore::new(&StoreConfig::default());
//! let year: FiscalYear = "2024".parse()?;
//! let mut writer = store.writer("s_anc", "10669", year)?;
//! writer.write(&table)?;
//! writer.close()?;
//! let all = store.read_all("s_anc", year, None)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod key;
pub mod layout;
pub mod listing;
pub mod store;
pub mod table;
pub mod writer;

// Re-exports for convenience
pub use error::{StoreError, StoreResult};
pub use key::{EntityCode, FiscalYear, PartitionKey, ALL_ENTITIES};
pub use layout::{PartitionPattern, StoreLayout};
pub use listing::{FsListing, PartitionListing};
pub use store::{PartitionInfo, PartitionedStore, StoreConfig, DEFAULT_BASE_DIR};
pub use table::Table;
pub use writer::{Compression, PartitionWriter};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
