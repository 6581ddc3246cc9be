//! Read-only suggestion surfaces: lookup by tags or by a partial context.
//!
//! Thin pipelines over retrieval → scoring → ranking. These never mutate
//! anything and never block a caller; they exist so agents can probe for
//! related records before deciding what to write.

use anyhow::{bail, Result};
use rusqlite::Connection;
use serde::Serialize;

use crate::knowledge::ranking;
use crate::knowledge::retrieval;
use crate::knowledge::scoring::{score_candidate, ScoredSuggestion};
use crate::knowledge::types::{normalize_tags, QueryContext, RecordKind};

/// Response from a tag-driven lookup.
#[derive(Debug, Serialize)]
pub struct TagSuggestions {
    pub query_tags: Vec<String>,
    pub count: usize,
    pub suggestions: Vec<ScoredSuggestion>,
}

/// Echo of the context inputs, returned with context-driven lookups.
#[derive(Debug, Serialize)]
pub struct QueryEcho {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
}

/// Response from a context-driven lookup.
#[derive(Debug, Serialize)]
pub struct ContextSuggestions {
    pub query: QueryEcho,
    pub count: usize,
    pub suggestions: Vec<ScoredSuggestion>,
}

/// Suggest records sharing at least one of `tags`, optionally boosted by a
/// layer match. Tag prefiltering already guarantees relevance, so the floor
/// defaults to [`ranking::TAG_QUERY_MIN_SCORE`].
pub fn by_tags(
    conn: &Connection,
    kind: RecordKind,
    tags: &[String],
    layer: Option<String>,
    limit: Option<usize>,
    min_score: Option<f64>,
    now: i64,
) -> Result<TagSuggestions> {
    let query_tags = normalize_tags(tags);
    if query_tags.is_empty() {
        bail!("at least one tag is required");
    }

    let ctx = QueryContext {
        tags: query_tags.clone(),
        layer,
        ..Default::default()
    };
    let candidates = retrieval::by_tags(conn, kind, &query_tags)?;
    let scored = candidates
        .iter()
        .map(|c| score_candidate(&ctx, kind, c, now))
        .collect();
    let suggestions = ranking::rank(
        scored,
        min_score.unwrap_or(ranking::TAG_QUERY_MIN_SCORE),
        limit.unwrap_or(ranking::DEFAULT_LIMIT),
    );

    Ok(TagSuggestions {
        query_tags,
        count: suggestions.len(),
        suggestions,
    })
}

/// Suggest records related to a partial context. At least one of key, tags,
/// or layer must be given.
pub fn by_context(
    conn: &Connection,
    kind: RecordKind,
    ctx: QueryContext,
    limit: Option<usize>,
    min_score: Option<f64>,
    now: i64,
) -> Result<ContextSuggestions> {
    let ctx = QueryContext {
        tags: normalize_tags(&ctx.tags),
        ..ctx
    };
    if ctx.key.is_none() && ctx.tags.is_empty() && ctx.layer.is_none() {
        bail!("at least one of key, tags, or layer is required");
    }

    let candidates = retrieval::for_context(conn, kind, &ctx)?;
    let scored = candidates
        .iter()
        .map(|c| score_candidate(&ctx, kind, c, now))
        .collect();
    let suggestions = ranking::rank(
        scored,
        min_score.unwrap_or(ranking::DEFAULT_MIN_SCORE),
        limit.unwrap_or(ranking::DEFAULT_LIMIT),
    );

    Ok(ContextSuggestions {
        query: QueryEcho {
            key: ctx.key,
            tags: ctx.tags,
            layer: ctx.layer,
        },
        count: suggestions.len(),
        suggestions,
    })
}
