use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    state::AppState,
    store::{NewProduct, Product, ProductOrder, ProductPatch, User},
};

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Product #{id} not found"))
}

/// Ids that are not UUIDs cannot name a stored product.
async fn find(state: &AppState, id: &str) -> Result<Option<Product>, ApiError> {
    match Uuid::parse_str(id) {
        Ok(uuid) => Ok(state.store.find_product(uuid).await?),
        Err(_) => Ok(None),
    }
}

/// Existence is checked before ownership.
pub fn authorize_owner(
    product: Option<Product>,
    id: &str,
    principal: &User,
) -> Result<Product, ApiError> {
    let product = product.ok_or_else(|| not_found(id))?;
    if product.author_id != principal.id {
        warn!(product_id = %product.id, user_id = %principal.id, "non-owner mutation refused");
        return Err(ApiError::Forbidden(
            "You are not the owner of this Product".into(),
        ));
    }
    Ok(product)
}

pub async fn list(
    state: &AppState,
    limit: u32,
    order: ProductOrder,
) -> Result<Vec<Product>, ApiError> {
    Ok(state.store.list_products(limit, order).await?)
}

pub async fn get(state: &AppState, id: &str) -> Result<Product, ApiError> {
    find(state, id).await?.ok_or_else(|| not_found(id))
}

pub async fn create(
    state: &AppState,
    author: &User,
    title: String,
    description: String,
) -> Result<Product, ApiError> {
    let product = state
        .store
        .insert_product(NewProduct {
            title,
            description,
            author_id: author.id,
            author_name: author.name.clone(),
            created_at: OffsetDateTime::now_utc(),
        })
        .await?;
    info!(product_id = %product.id, user_id = %author.id, "product created");
    Ok(product)
}

pub async fn update(
    state: &AppState,
    id: &str,
    principal: &User,
    patch: ProductPatch,
) -> Result<Product, ApiError> {
    let product = authorize_owner(find(state, id).await?, id, principal)?;
    if patch.is_empty() {
        return Ok(product);
    }
    let updated = state
        .store
        .update_product(product.id, patch)
        .await?
        .ok_or_else(|| not_found(id))?;
    info!(product_id = %updated.id, user_id = %principal.id, "product updated");
    Ok(updated)
}

pub async fn delete(state: &AppState, id: &str, principal: &User) -> Result<(), ApiError> {
    let product = authorize_owner(find(state, id).await?, id, principal)?;
    // a concurrent delete already removed it; the outcome is the same
    if state.store.delete_product(product.id).await? {
        info!(product_id = %product.id, user_id = %principal.id, "product deleted");
    }
    Ok(())
}
