//! Product route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::ApiQuery;
use crate::models::ProductDetail;
use crate::services::catalog::filter::present;
use crate::services::{CatalogService, ProductFilter, ProductListParams, ProductPage};
use crate::state::AppState;

/// Query string for `GET /api/product`.
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub slug: Option<String>,
}

/// Filtered, sorted, paginated product listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ProductListParams>,
) -> Result<Json<ProductPage>> {
    let filter = ProductFilter::try_from(params)?;
    let page = CatalogService::new(state.pool())
        .list_products(&filter)
        .await?;

    tracing::debug!(
        total = page.info.total_products,
        returned = page.products.len(),
        "Listed products"
    );

    Ok(Json(page))
}

/// Product page with variants, brand, category and reviews.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<ProductDetail>> {
    let slug = present("slug", query.slug)?
        .ok_or_else(|| AppError::BadRequest("Product slug is required".to_string()))?;

    CatalogService::new(state.pool())
        .product_detail(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}
