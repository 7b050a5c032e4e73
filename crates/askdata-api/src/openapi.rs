//! OpenAPI document for every annotated handler, served as JSON.

use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "askdata API",
        description = "Ask questions about your data: SQL generation, execution, summaries and charts.",
    ),
    tags(
        (name = "ask", description = "Question to SQL and SQL execution"),
        (name = "summary", description = "Natural-language summaries of query results"),
        (name = "chart", description = "Vega-Lite chart generation"),
        (name = "stream", description = "SSE relays of AI token streams"),
        (name = "threads", description = "Conversation threads and their responses"),
        (name = "config", description = "Client settings"),
        (name = "health", description = "Service health"),
    ),
    paths(
        crate::routes::ask::generate_sql,
        crate::routes::ask::run_sql,
        crate::routes::summary::generate_summary,
        crate::routes::chart::generate_vega_chart,
        crate::handlers::stream::stream_summary,
        crate::handlers::stream::stream_explanation,
        crate::routes::threads::list_threads,
        crate::routes::threads::create_thread,
        crate::routes::threads::get_thread,
        crate::routes::threads::list_responses,
        crate::routes::threads::create_response,
        crate::routes::threads::update_response_sql,
        crate::routes::threads::update_response_answer,
        crate::routes::settings::get_config,
        crate::routes::health::health_check,
    ),
    components(schemas(
        // Ask pipeline
        askdata_types::GenerateSqlRequest,
        askdata_types::GenerateSqlResponse,
        askdata_types::RunSqlRequest,
        askdata_types::RunSqlResponse,
        askdata_types::ColumnInfo,
        askdata_types::GenerateSummaryRequest,
        askdata_types::GenerateSummaryResponse,
        askdata_types::GenerateChartRequest,
        askdata_types::GenerateChartResponse,
        askdata_types::ErrorBody,
        // Threads
        askdata_types::Thread,
        askdata_types::ThreadDetail,
        askdata_types::ThreadResponse,
        askdata_types::AnswerDetail,
        askdata_types::AnswerStatus,
        askdata_types::ChartDetail,
        askdata_types::CreateThreadRequest,
        askdata_types::CreateResponseRequest,
        askdata_types::UpdateSqlRequest,
        askdata_types::UpdateAnswerRequest,
        askdata_types::ThreadsEnvelope,
        askdata_types::ThreadEnvelope,
        askdata_types::ThreadDetailEnvelope,
        askdata_types::ResponsesEnvelope,
        askdata_types::ResponseEnvelope,
        // Settings and health
        askdata_types::ConfigResponse,
        crate::routes::health::HealthResponse,
    ))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
