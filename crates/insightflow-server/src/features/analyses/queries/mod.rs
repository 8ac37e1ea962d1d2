pub mod get;
pub mod list;

pub use get::{GetAnalysisError, GetAnalysisQuery, GetAnalysisResponse};
pub use list::{ListAnalysesError, ListAnalysesQuery, ListAnalysesResponse};
