//! Document store seam: users and products keyed by opaque ids.

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// User record in the store.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub api_key: String,
}

/// Product record in the store.
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub created_at: OffsetDateTime,
}

/// Fields a client may change on an existing product.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// Sort key for product listings. Listings are always descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductOrder {
    #[default]
    CreatedAt,
    Title,
    Description,
    AuthorName,
    AuthorId,
}

impl ProductOrder {
    pub fn column(self) -> &'static str {
        match self {
            ProductOrder::CreatedAt => "created_at",
            ProductOrder::Title => "title",
            ProductOrder::Description => "description",
            ProductOrder::AuthorName => "author_name",
            ProductOrder::AuthorId => "author_id",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique field (`name`, `email`) already holds this value.
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn list_products(
        &self,
        limit: u32,
        order: ProductOrder,
    ) -> Result<Vec<Product>, StoreError>;
    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;
    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;
    /// Returns `None` when no product has this id.
    async fn update_product(
        &self,
        id: Uuid,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StoreError>;
    /// Returns whether a product was removed.
    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError>;
}
