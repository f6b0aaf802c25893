use serde::{Deserialize, Serialize};

/// JWT payload: `{"id": <user id>, "exp": <unix timestamp>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>, // subject user ID
    pub exp: usize,         // expires at (unix timestamp)
}
