//! Dataset feature: CSV and Excel upload and lookup of the caller's datasets

pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{
    UploadDatasetCommand, UploadDatasetError, UploadDatasetResponse, UploadedFile,
    MAX_UPLOAD_BYTES,
};
pub use queries::{
    GetDatasetError, GetDatasetQuery, GetDatasetResponse, ListDatasetsError, ListDatasetsQuery,
    ListDatasetsResponse,
};
pub use routes::datasets_routes;
