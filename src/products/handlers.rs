use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::AuthUser,
    error::ApiError,
    state::AppState,
};

use super::dto::{CreateProductRequest, ListQuery, ProductResponse, UpdateProductRequest};
use super::services;

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/product", get(list_products).post(create_product))
        .route("/product/", get(list_products).post(create_product))
        .route(
            "/product/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = services::list(&state, q.limit, q.orderby).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, user, body))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = services::create(&state, &user, body.title, body.description).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = services::get(&state, &id).await?;
    Ok(Json(product.into()))
}

#[instrument(skip(state, user, body))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = services::update(&state, &id, &user, body.into()).await?;
    Ok(Json(product.into()))
}

#[instrument(skip(state, user))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    services::delete(&state, &id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
