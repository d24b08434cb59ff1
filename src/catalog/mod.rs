/*!
 * Gettext PO catalogs: model, reader, writer and progress reporting.
 */

pub mod model;
pub mod parser;
pub mod status;
pub mod writer;

pub use model::{Catalog, CatalogEntry, DEFAULT_WRAP_WIDTH};
pub use status::{CatalogStats, FileStatus, StatusReport};
