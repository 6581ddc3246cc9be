//! Shared decision & constraint knowledge base for AI coding agents — via MCP.
//!
//! Tenet is an [MCP](https://modelcontextprotocol.io/) server that lets
//! multiple AI coding agents record architectural **decisions** and
//! **constraints** into one store. Its centerpiece is a duplicate-detection
//! engine on the write path: every create is scored against existing records
//! (tag overlap, layer match, key/value similarity, recency, priority) and
//! the top score picks one of four response tiers:
//!
//! | Score | Tier | Effect |
//! |-------|------|--------|
//! | < 35 | none | record created silently |
//! | 35–44 | gentle nudge | record created, duplicate-risk warning attached |
//! | 45–59 | hard block | create rejected; bypass with `ignore_suggest` |
//! | ≥ 60 | auto-update | existing record updated and version-bumped instead |
//!
//! # Architecture
//!
//! - **Storage**: SQLite with a tag index for candidate retrieval and an
//!   append-only version history
//! - **Scoring**: pure multi-factor similarity with itemized breakdowns
//! - **Policies**: key-pattern rule sets with required-field quality gates
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, and migrations
//! - [`knowledge`] — Core engine: retrieval, scoring, ranking, policies,
//!   tiers, and the write orchestrator

pub mod config;
pub mod db;
pub mod knowledge;
