use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CheckDuplicateParams {
    #[schemars(description = "Key or value text to check for duplicates")]
    pub input: String,

    #[schemars(description = "Optional key/category to restrict the check to")]
    pub category: Option<String>,
}
