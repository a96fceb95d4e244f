//! HTTP response bodies shared between the API and its clients.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::MediaType;

/// Successful `/process` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessResponse {
    pub count: u32,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

/// Error body returned by every failing route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorResponse {
    pub error: String,
}
