use serde::{Deserialize, Serialize};
use time::{macros::format_description, OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::store::{Product, ProductOrder, ProductPatch};

/// Renders as `2024-05-01 12:30:45.123456`, always UTC.
pub fn format_created_at(at: OffsetDateTime) -> String {
    let utc = at.to_offset(UtcOffset::UTC);
    utc.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]"
    ))
    .unwrap_or_else(|_| utc.to_string())
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub title: String,
    pub description: String,
}

/// Only the listed fields can change; ownership is never client-supplied.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl From<UpdateProductRequest> for ProductPatch {
    fn from(req: UpdateProductRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub author_name: String,
    pub author_id: String,
    pub created_at: String,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            author_name: p.author_name,
            author_id: p.author_id.to_string(),
            created_at: format_created_at(p.created_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub orderby: ProductOrder,
}
fn default_limit() -> u32 { 10 }
