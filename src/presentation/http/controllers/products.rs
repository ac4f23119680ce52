// src/presentation/http/controllers/products.rs
use crate::application::{
    dto::{ProductDto, ProductPayload},
    services::ProductService,
};
use crate::presentation::http::error::{HttpResult, IntoHttpResult};
use crate::presentation::http::extractors::RequestScope;
use crate::presentation::http::state::HttpState;
use axum::{Extension, Json, extract::Path, http::StatusCode};

pub async fn list_products(
    Extension(state): Extension<HttpState>,
    scope: RequestScope,
) -> HttpResult<Json<Vec<ProductDto>>> {
    let mut ctx = state.open_context(&scope).await.into_http()?;
    let products = state.products.list(&mut ctx).await.into_http()?;
    Ok(Json(products))
}

pub async fn get_product(
    Extension(state): Extension<HttpState>,
    scope: RequestScope,
    Path(id): Path<i64>,
) -> HttpResult<Json<ProductDto>> {
    let mut ctx = state.open_context(&scope).await.into_http()?;
    let product = state.products.get(&mut ctx, id).await.into_http()?;
    Ok(Json(product))
}

pub async fn create_product(
    Extension(state): Extension<HttpState>,
    scope: RequestScope,
    Json(payload): Json<ProductPayload>,
) -> HttpResult<(StatusCode, Json<ProductDto>)> {
    let mut ctx = state.open_context(&scope).await.into_http()?;
    let product = state.products.create(&mut ctx, payload).await.into_http()?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    Extension(state): Extension<HttpState>,
    scope: RequestScope,
    Path(id): Path<i64>,
    Json(payload): Json<ProductPayload>,
) -> HttpResult<Json<ProductDto>> {
    ProductService::ensure_matching_id(id, &payload).into_http()?;
    let mut ctx = state.open_context(&scope).await.into_http()?;
    let product = state.products.update(&mut ctx, id, payload).await.into_http()?;
    Ok(Json(product))
}

pub async fn delete_product(
    Extension(state): Extension<HttpState>,
    scope: RequestScope,
    Path(id): Path<i64>,
) -> HttpResult<StatusCode> {
    let mut ctx = state.open_context(&scope).await.into_http()?;
    state.products.delete(&mut ctx, id).await.into_http()?;
    Ok(StatusCode::NO_CONTENT)
}
