pub mod upload;

pub use upload::{
    UploadDatasetCommand, UploadDatasetError, UploadDatasetResponse, UploadedFile,
    MAX_UPLOAD_BYTES,
};
