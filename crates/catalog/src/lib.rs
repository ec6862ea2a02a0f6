//! Asset catalog service.
//!
//! Coordinates the database repository and the blob storage provider for
//! every create, counter, and delete path. The two are independent failure
//! domains: creation uploads blobs before the insert, while deletion treats
//! blob removal as best-effort and always removes the record.

mod error;
mod service;

pub use error::CatalogError;
pub use service::{AssetCatalog, DeleteReport, GeneratedAsset, NewUpload, UploadedBlob};
