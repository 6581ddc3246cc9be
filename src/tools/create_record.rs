use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateRecordParams {
    #[schemars(description = "Display key / category, e.g. 'sec/input-validation'. Hierarchical '/'-delimited keys group related records.")]
    pub key: String,

    #[schemars(description = "The decision or constraint text")]
    pub value: String,

    #[schemars(description = "Free-form tags; the primary duplicate signal. Normalized to lowercase.")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Architectural layer, e.g. 'infrastructure', 'business', 'presentation'")]
    pub layer: Option<String>,

    #[schemars(description = "Priority: 'low', 'medium', 'high', or 'critical'. Mostly used on constraints.")]
    pub priority: Option<String>,

    #[schemars(description = "Explicit initial version for new records. Defaults to 1.0.0.")]
    pub version: Option<String>,

    #[schemars(description = "Lifecycle status. Defaults to 'active'.")]
    pub status: Option<String>,

    #[schemars(description = "Version increment when the key already exists: 'major', 'minor', or 'patch' (default)")]
    pub version_bump: Option<String>,

    #[schemars(description = "Bypass duplicate detection and policy checks; always creates a new record")]
    pub ignore_suggest: Option<bool>,

    #[schemars(description = "Validate against this policy only, instead of the first key-pattern match")]
    pub policy_name: Option<String>,
}
