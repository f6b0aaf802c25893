use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewProduct, NewUser, Product, ProductOrder, ProductPatch, Store, StoreError, User};

/// In-process store for local runs (`DATABASE_URL=memory://`) and tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    // insertion order doubles as the listing tie-breaker
    products: Vec<Product>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.name == name).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.name == user.name) {
            return Err(StoreError::Duplicate("name"));
        }
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            api_key: Some(user.api_key),
        };
        inner.users.push(created.clone());
        Ok(created)
    }

    async fn list_products(
        &self,
        limit: u32,
        order: ProductOrder,
    ) -> Result<Vec<Product>, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<(usize, &Product)> = inner.products.iter().enumerate().collect();
        rows.sort_by(|(ia, a), (ib, b)| {
            let by_key = match order {
                ProductOrder::CreatedAt => b.created_at.cmp(&a.created_at),
                ProductOrder::Title => b.title.cmp(&a.title),
                ProductOrder::Description => b.description.cmp(&a.description),
                ProductOrder::AuthorName => b.author_name.cmp(&a.author_name),
                ProductOrder::AuthorId => b.author_id.cmp(&a.author_id),
            };
            by_key.then_with(|| ib.cmp(ia))
        });
        Ok(rows
            .into_iter()
            .take(limit as usize)
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.products.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let created = Product {
            id: Uuid::new_v4(),
            title: product.title,
            description: product.description,
            author_id: product.author_id,
            author_name: product.author_name,
            created_at: product.created_at,
        };
        self.inner.write().await.products.push(created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        id: Uuid,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(product) = inner.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            product.title = title;
        }
        if let Some(description) = patch.description {
            product.description = description;
        }
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.products.len();
        inner.products.retain(|p| p.id != id);
        Ok(inner.products.len() != before)
    }
}
