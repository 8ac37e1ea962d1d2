pub mod create;
pub mod generate_insights;
pub mod process;

pub use create::{CreateAnalysisCommand, CreateAnalysisError, CreateAnalysisResponse};
pub use generate_insights::{
    GenerateInsightsCommand, GenerateInsightsError, GenerateInsightsResponse,
};
pub use process::ProcessAnalysisError;
