use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SuggestByTagsParams {
    #[schemars(description = "Tags to match against existing records (at least one)")]
    pub tags: Vec<String>,

    #[schemars(description = "Optional layer; records in the same layer score higher")]
    pub layer: Option<String>,

    #[schemars(description = "Maximum suggestions to return. Defaults to 5.")]
    pub limit: Option<usize>,

    #[schemars(description = "Minimum similarity score (0-100). Defaults to 15 for tag lookups.")]
    pub min_score: Option<f64>,
}
