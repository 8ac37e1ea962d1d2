//! Prompt rendering

use super::InsightRequest;

/// Fallback context when the caller sends none
const NO_CONTEXT: &str = "No dashboard context was provided";

/// Render the business-analyst prompt for one analysis
pub fn build_prompt(request: &InsightRequest) -> String {
    let results = serde_json::to_string_pretty(&request.results)
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        "Review the following data analysis results and write insights:\n\
         \n\
         Dataset: {dataset}\n\
         Analysis type: {analysis_type}\n\
         Row count: {rows}\n\
         Column count: {columns}\n\
         \n\
         Statistical results:\n\
         {results}\n\
         \n\
         Please cover:\n\
         1. Overall observations and key findings\n\
         2. Notable or outlier values\n\
         3. Remarks on data quality\n\
         4. Recommendations for business decisions\n\
         \n\
         Write the answer clearly, from a business analyst's perspective.\n",
        dataset = request.dataset_name,
        analysis_type = request.analysis_type,
        rows = count_or_unknown(request.row_count),
        columns = count_or_unknown(request.column_count),
        results = results,
    )
}

/// Render the assistant's system instruction around the caller's context
pub fn build_chat_instruction(context: Option<&str>) -> String {
    let context = context.map(str::trim).filter(|c| !c.is_empty()).unwrap_or(NO_CONTEXT);

    format!(
        "Your name is InsightFlow AI Assistant. You are a professional assistant specialized in \
         data analytics, statistics and data security.\n\
         \n\
         Current context: {context}\n\
         \n\
         Rules:\n\
         1. Always respond in English.\n\
         2. Do not use emojis.\n\
         3. Use serious, reassuring and technical language.\n\
         4. Emphasize privacy and security when talking about user data.\n\
         5. Keep answers balanced, neither too short nor too long.\n",
        context = context,
    )
}

fn count_or_unknown(count: Option<i64>) -> String {
    count.map_or_else(|| "Unknown".to_string(), |c| c.to_string())
}
