//! Cart route handlers.
//!
//! Every cart request is made on behalf of either a verified user (bearer
//! token) or a guest (`guestId`, in the query string for GET/DELETE and in
//! the JSON body for POST/PUT). A verified user always takes precedence.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use nutrishop_core::{CartItemId, ProductId, VariantId};

use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::Caller;
use crate::models::{CartItem, CartView};
use crate::services::{AddItem, CartService, QuantityUpdate};
use crate::state::AppState;

/// Confirmation body for removals.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

const ITEM_REMOVED: MessageResponse = MessageResponse {
    message: "Item removed from cart",
};

/// Query string for `GET /api/cart`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuery {
    pub guest_id: Option<String>,
}

/// Body for `POST /api/cart`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Option<ProductId>,
    pub variant_id: Option<VariantId>,
    pub quantity: Option<i32>,
    pub guest_id: Option<String>,
}

/// Body for `PUT /api/cart`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub cart_item_id: Option<CartItemId>,
    pub quantity: Option<i32>,
    pub guest_id: Option<String>,
}

/// Query string for `DELETE /api/cart`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemQuery {
    pub cart_item_id: Option<String>,
    pub guest_id: Option<String>,
}

/// Either the updated line or a removal confirmation.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UpdateResponse {
    Updated(CartItem),
    Removed(MessageResponse),
}

/// Show the caller's cart with totals.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<CartQuery>,
) -> Result<Json<CartView>> {
    let owner = caller.identity(query.guest_id.as_deref())?;
    let cart = CartService::new(state.pool()).view(&owner).await?;
    Ok(Json(cart))
}

/// Add a product to the caller's cart.
///
/// Responds 201 with the new line, or 200 with the existing line after its
/// quantity was increased.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(body): ApiJson<AddItemRequest>,
) -> Result<impl IntoResponse> {
    let owner = caller.identity(body.guest_id.as_deref())?;

    let product_id = body
        .product_id
        .ok_or_else(|| AppError::BadRequest("Product ID is required".to_string()))?;
    let quantity = body
        .quantity
        .filter(|q| *q >= 1)
        .ok_or_else(|| AppError::BadRequest("Valid quantity is required".to_string()))?;

    let upserted = CartService::new(state.pool())
        .add_item(
            &owner,
            AddItem {
                product_id,
                variant_id: body.variant_id,
                quantity,
            },
        )
        .await?;

    let status = if upserted.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(upserted.item)))
}

/// Set a line's quantity. Zero or below removes the line.
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(body): ApiJson<UpdateItemRequest>,
) -> Result<Json<UpdateResponse>> {
    let owner = caller.identity(body.guest_id.as_deref())?;

    let item_id = body
        .cart_item_id
        .ok_or_else(|| AppError::BadRequest("Cart item ID is required".to_string()))?;
    let quantity = body
        .quantity
        .ok_or_else(|| AppError::BadRequest("Quantity is required".to_string()))?;

    let response = match CartService::new(state.pool())
        .update_quantity(&owner, item_id, quantity)
        .await?
    {
        QuantityUpdate::Updated(item) => UpdateResponse::Updated(item),
        QuantityUpdate::Removed => UpdateResponse::Removed(ITEM_REMOVED),
    };

    Ok(Json(response))
}

/// Remove a line from the caller's cart.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<RemoveItemQuery>,
) -> Result<Json<MessageResponse>> {
    let owner = caller.identity(query.guest_id.as_deref())?;

    let raw_id = query
        .cart_item_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Cart item ID is required".to_string()))?;
    let item_id: CartItemId = raw_id
        .parse()
        .map_err(|_| AppError::BadRequest("Cart item ID must be an integer".to_string()))?;

    CartService::new(state.pool())
        .remove_item(&owner, item_id)
        .await?;

    Ok(Json(ITEM_REMOVED))
}
