pub mod check_duplicate;
pub mod create_record;
pub mod knowledge_stats;
pub mod suggest_by_context;
pub mod suggest_by_tags;

use check_duplicate::CheckDuplicateParams;
use create_record::CreateRecordParams;
use knowledge_stats::KnowledgeStatsParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use suggest_by_context::SuggestByContextParams;
use suggest_by_tags::SuggestByTagsParams;

use crate::config::TenetConfig;
use crate::knowledge::types::{Priority, QueryContext, RecordKind};
use crate::knowledge::version::Bump;
use crate::knowledge::write::CreateRequest;
use crate::knowledge::{check, stats, suggest, write};

/// The Tenet MCP tool handler. Holds shared state (db connection, config)
/// and exposes decision and constraint surfaces via the `#[tool_router]`
/// macro.
#[derive(Clone)]
pub struct TenetTools {
    tool_router: ToolRouter<Self>,
    db: Arc<Mutex<Connection>>,
    config: Arc<TenetConfig>,
}

impl TenetTools {
    /// Run a create request on the blocking pool and serialize the outcome.
    async fn run_create(
        &self,
        kind: RecordKind,
        params: CreateRecordParams,
    ) -> Result<String, String> {
        let request = build_create_request(kind, params)?;
        tracing::info!(kind = %kind, key = %request.key, "create requested");

        let db = Arc::clone(&self.db);
        let settings = self.config.suggestion_settings();
        let outcome = tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| format!("db lock poisoned: {e}"))?;
            write::create_record(&mut conn, &settings, request).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))??;

        serde_json::to_string(&outcome).map_err(|e| format!("serialization failed: {e}"))
    }

    async fn run_suggest_by_tags(
        &self,
        kind: RecordKind,
        params: SuggestByTagsParams,
    ) -> Result<String, String> {
        let db = Arc::clone(&self.db);
        let limit = params.limit;
        let min_score = params.min_score;
        let response = tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|e| format!("db lock poisoned: {e}"))?;
            suggest::by_tags(
                &conn,
                kind,
                &params.tags,
                params.layer,
                limit,
                min_score,
                chrono::Utc::now().timestamp(),
            )
            .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))??;

        serde_json::to_string(&response).map_err(|e| format!("serialization failed: {e}"))
    }

    async fn run_suggest_by_context(
        &self,
        kind: RecordKind,
        params: SuggestByContextParams,
    ) -> Result<String, String> {
        let priority = parse_priority(params.priority.as_deref())?;
        let ctx = QueryContext {
            key: params.key,
            tags: params.tags.unwrap_or_default(),
            layer: params.layer,
            priority,
            value: None,
        };

        let db = Arc::clone(&self.db);
        let (limit, min_score) = (params.limit, params.min_score);
        let response = tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|e| format!("db lock poisoned: {e}"))?;
            suggest::by_context(
                &conn,
                kind,
                ctx,
                limit,
                min_score,
                chrono::Utc::now().timestamp(),
            )
            .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))??;

        serde_json::to_string(&response).map_err(|e| format!("serialization failed: {e}"))
    }

    async fn run_check_duplicate(
        &self,
        kind: RecordKind,
        params: CheckDuplicateParams,
    ) -> Result<String, String> {
        if params.input.trim().is_empty() {
            return Err("input must not be empty".into());
        }

        let db = Arc::clone(&self.db);
        let response = tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|e| format!("db lock poisoned: {e}"))?;
            check::check_duplicate(&conn, kind, &params.input, params.category.as_deref())
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))??;

        serde_json::to_string(&response).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_router]
impl TenetTools {
    pub fn new(db: Arc<Mutex<Connection>>, config: Arc<TenetConfig>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            db,
            config,
        }
    }

    /// Record an architectural decision, with duplicate detection on the way in.
    #[tool(description = "Record an architectural decision. Runs duplicate detection: near-matches warn, close matches block (bypass with ignore_suggest=true), and strong matches update the existing decision instead. Writing an existing key updates it unconditionally.")]
    async fn create_decision(
        &self,
        Parameters(params): Parameters<CreateRecordParams>,
    ) -> Result<String, String> {
        self.run_create(RecordKind::Decision, params).await
    }

    /// Record a constraint, with duplicate detection on the way in.
    #[tool(description = "Record a constraint the codebase must honor. Same duplicate-detection behavior as create_decision; constraints additionally score value-text similarity and priority.")]
    async fn create_constraint(
        &self,
        Parameters(params): Parameters<CreateRecordParams>,
    ) -> Result<String, String> {
        self.run_create(RecordKind::Constraint, params).await
    }

    /// Find decisions sharing tags with the given set.
    #[tool(description = "Suggest existing decisions sharing at least one of the given tags, ranked by similarity score.")]
    async fn suggest_decisions_by_tags(
        &self,
        Parameters(params): Parameters<SuggestByTagsParams>,
    ) -> Result<String, String> {
        self.run_suggest_by_tags(RecordKind::Decision, params).await
    }

    /// Find constraints sharing tags with the given set.
    #[tool(description = "Suggest existing constraints sharing at least one of the given tags, ranked by similarity score.")]
    async fn suggest_constraints_by_tags(
        &self,
        Parameters(params): Parameters<SuggestByTagsParams>,
    ) -> Result<String, String> {
        self.run_suggest_by_tags(RecordKind::Constraint, params).await
    }

    /// Find decisions related to a partial record context.
    #[tool(description = "Suggest existing decisions related to a partial context (key, tags, and/or layer — at least one required).")]
    async fn suggest_decisions(
        &self,
        Parameters(params): Parameters<SuggestByContextParams>,
    ) -> Result<String, String> {
        self.run_suggest_by_context(RecordKind::Decision, params).await
    }

    /// Find constraints related to a partial record context.
    #[tool(description = "Suggest existing constraints related to a partial context (key, tags, and/or layer — at least one required).")]
    async fn suggest_constraints(
        &self,
        Parameters(params): Parameters<SuggestByContextParams>,
    ) -> Result<String, String> {
        self.run_suggest_by_context(RecordKind::Constraint, params).await
    }

    /// Check a key or text for duplicate decisions.
    #[tool(description = "Check whether a key or text duplicates an existing decision. Exact normalized match first, then similarity against threshold 70.")]
    async fn check_decision_duplicate(
        &self,
        Parameters(params): Parameters<CheckDuplicateParams>,
    ) -> Result<String, String> {
        self.run_check_duplicate(RecordKind::Decision, params).await
    }

    /// Check a key or text for duplicate constraints.
    #[tool(description = "Check whether a key or text duplicates an existing constraint. Exact normalized match first, then similarity against threshold 70.")]
    async fn check_constraint_duplicate(
        &self,
        Parameters(params): Parameters<CheckDuplicateParams>,
    ) -> Result<String, String> {
        self.run_check_duplicate(RecordKind::Constraint, params).await
    }

    /// Get statistics about the knowledge store.
    #[tool(description = "Get knowledge store statistics: record counts by kind/layer/status, policy count, history depth.")]
    async fn knowledge_stats(
        &self,
        Parameters(_params): Parameters<KnowledgeStatsParams>,
    ) -> Result<String, String> {
        let db = Arc::clone(&self.db);
        let db_path = self.config.resolved_db_path();
        let response = tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|e| format!("db lock poisoned: {e}"))?;
            stats::knowledge_stats(&conn, Some(&db_path)).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))??;

        serde_json::to_string(&response).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for TenetTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Tenet is a shared knowledge base of architectural decisions and constraints. \
                 Use create_decision/create_constraint to record, suggest_* to find related \
                 records before writing, and check_*_duplicate to probe for duplicates."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

/// Resolve a tool-layer create payload into a strict engine request.
fn build_create_request(
    kind: RecordKind,
    params: CreateRecordParams,
) -> Result<CreateRequest, String> {
    let mut request = CreateRequest::new(kind, params.key, params.value);
    request.tags = params.tags.unwrap_or_default();
    request.layer = params.layer;
    request.priority = parse_priority(params.priority.as_deref())?;
    request.version = params.version;
    request.status = params.status;
    request.bump = match params.version_bump.as_deref() {
        Some(s) => Some(s.parse::<Bump>()?),
        None => None,
    };
    request.ignore_suggest = params.ignore_suggest.unwrap_or(false);
    request.policy_name = params.policy_name;
    Ok(request)
}

fn parse_priority(priority: Option<&str>) -> Result<Option<Priority>, String> {
    priority.map(|s| s.parse::<Priority>()).transpose()
}
