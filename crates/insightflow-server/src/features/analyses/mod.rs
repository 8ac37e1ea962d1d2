//! Analysis feature
//!
//! An analysis runs the statistics engine over the preview of one dataset. Creation only records
//! the request and queues it; [`commands::process`] does the work in the background and
//! [`commands::generate_insights`] optionally adds a narrative afterwards.

pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{
    CreateAnalysisCommand, CreateAnalysisError, CreateAnalysisResponse, GenerateInsightsCommand,
    GenerateInsightsError, GenerateInsightsResponse, ProcessAnalysisError,
};
pub use queries::{
    GetAnalysisError, GetAnalysisQuery, GetAnalysisResponse, ListAnalysesError,
    ListAnalysesQuery, ListAnalysesResponse,
};
pub use routes::analyses_routes;
