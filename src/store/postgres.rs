use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;
use uuid::Uuid;

use super::{NewProduct, NewUser, Product, ProductOrder, ProductPatch, Store, StoreError, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, api_key";
const PRODUCT_COLUMNS: &str = "id, title, description, author_id, author_name, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("run migrations")?;
        info!("postgres store ready");
        Ok(Self { pool })
    }
}

/// Maps unique-constraint violations on `users` to the offending field.
fn map_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("users_email_key") => StoreError::Duplicate("email"),
                _ => StoreError::Duplicate("name"),
            };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, api_key)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.api_key)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)
    }

    async fn list_products(
        &self,
        limit: u32,
        order: ProductOrder,
    ) -> Result<Vec<Product>, StoreError> {
        // column() is a closed set, never client text
        let rows = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            ORDER BY {} DESC, created_at DESC
            LIMIT $1
            "#,
            order.column()
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let created = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (id, title, description, author_id, author_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.author_id)
        .bind(&product.author_name)
        .bind(product.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_product(
        &self,
        id: Uuid,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StoreError> {
        let updated = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description)
             WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
