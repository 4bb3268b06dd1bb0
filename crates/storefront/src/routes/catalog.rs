//! Reference data route handlers.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::models::{Brand, CategoryNode, HealthGoal};
use crate::services::CatalogService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryNode>,
}

#[derive(Debug, Serialize)]
pub struct BrandsResponse {
    pub brands: Vec<Brand>,
}

#[derive(Debug, Serialize)]
pub struct HealthGoalsResponse {
    pub goals: Vec<HealthGoal>,
}

/// Root categories with their direct children.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<CategoriesResponse>> {
    let categories = CatalogService::new(state.pool()).category_tree().await?;
    Ok(Json(CategoriesResponse { categories }))
}

/// All brands.
#[instrument(skip(state))]
pub async fn brands(State(state): State<AppState>) -> Result<Json<BrandsResponse>> {
    let brands = CatalogService::new(state.pool()).brands().await?;
    Ok(Json(BrandsResponse { brands }))
}

/// All health goals.
#[instrument(skip(state))]
pub async fn health_goals(State(state): State<AppState>) -> Result<Json<HealthGoalsResponse>> {
    let goals = CatalogService::new(state.pool()).health_goals().await?;
    Ok(Json(HealthGoalsResponse { goals }))
}
