pub mod aggregate;
pub mod cache;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod loader;
pub mod record;

pub use aggregate::Summary;
pub use cache::DatasetCache;
pub use dataset::Dataset;
pub use error::SalesError;
pub use filter::Selection;
pub use loader::{Loader, SheetLoader};
pub use record::Transaction;
