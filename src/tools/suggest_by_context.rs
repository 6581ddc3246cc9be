use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SuggestByContextParams {
    #[schemars(description = "Key/category of the record being considered")]
    pub key: Option<String>,

    #[schemars(description = "Tags of the record being considered")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Architectural layer of the record being considered")]
    pub layer: Option<String>,

    #[schemars(description = "Priority: 'low', 'medium', 'high', or 'critical'")]
    pub priority: Option<String>,

    #[schemars(description = "Maximum suggestions to return. Defaults to 5.")]
    pub limit: Option<usize>,

    #[schemars(description = "Minimum similarity score (0-100). Defaults to 30.")]
    pub min_score: Option<f64>,
}
