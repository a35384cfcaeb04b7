//! Counter endpoints: place orders and read their fulfillment state.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ItemType, Location, OrderId, OrderSource, Status};
use domain::{CatalogItem, LineItem, Order, OrderRepository, PlaceOrder, ProductCatalog};
use messaging::Publisher;
use saga::PlaceOrderHandler;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared state of the counter's HTTP handlers.
pub struct AppState<R, C, P> {
    pub place: PlaceOrderHandler<R, C, P>,
}

impl<R, C, P> AppState<R, C, P> {
    pub fn new(place: PlaceOrderHandler<R, C, P>) -> Self {
        Self { place }
    }
}

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub order_source: OrderSource,
    pub location: Location,
    pub loyalty_member_id: String,
    #[serde(default)]
    pub barista_items: Vec<ItemRequest>,
    #[serde(default)]
    pub kitchen_items: Vec<ItemRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub item_type: ItemType,
}

impl From<PlaceOrderRequest> for PlaceOrder {
    fn from(req: PlaceOrderRequest) -> Self {
        let mut cmd = PlaceOrder::new(req.order_source, req.location, req.loyalty_member_id);
        cmd.drink_items = req.barista_items.into_iter().map(|i| i.item_type).collect();
        cmd.food_items = req.kitchen_items.into_iter().map(|i| i.item_type).collect();
        cmd
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub order_source: OrderSource,
    pub loyalty_member_id: String,
    pub order_status: Status,
    pub location: Location,
    pub line_items: Vec<LineItemResponse>,
    pub total_cents: i64,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemResponse {
    pub id: String,
    pub item_type: ItemType,
    pub name: String,
    pub price_cents: i64,
    pub item_status: Status,
    pub is_barista_order: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTypeResponse {
    pub item_type: ItemType,
    pub name: String,
    pub price_cents: i64,
}

impl From<&LineItem> for LineItemResponse {
    fn from(item: &LineItem) -> Self {
        Self {
            id: item.id.to_string(),
            item_type: item.item_type,
            name: item.name.clone(),
            price_cents: item.price.cents(),
            item_status: item.status,
            is_barista_order: item.is_barista_line,
        }
    }
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            order_source: order.order_source(),
            loyalty_member_id: order.loyalty_member_id().to_string(),
            order_status: order.status(),
            location: order.location(),
            line_items: order.line_items().iter().map(LineItemResponse::from).collect(),
            total_cents: order.total().cents(),
            version: order.version(),
            created_at: order.created_at().to_rfc3339(),
            updated_at: order.updated_at().to_rfc3339(),
        }
    }
}

impl From<CatalogItem> for ItemTypeResponse {
    fn from(item: CatalogItem) -> Self {
        Self {
            item_type: item.item_type,
            name: item.name,
            price_cents: item.price.cents(),
        }
    }
}

// -- Handlers --

/// POST /orders: place an order and hand its items to the barista and kitchen.
#[tracing::instrument(skip(state, req))]
pub async fn create<R, C, P>(
    State(state): State<Arc<AppState<R, C, P>>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    R: OrderRepository,
    C: ProductCatalog,
    P: Publisher + 'static,
{
    let order = state.place.handle(req.into()).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<R, C, P>(
    State(state): State<Arc<AppState<R, C, P>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    R: OrderRepository,
    C: ProductCatalog,
    P: Publisher + 'static,
{
    let order_id: OrderId = id
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;
    let order = state.place.orders().get_order(order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders: every order with its fulfillment state.
#[tracing::instrument(skip(state))]
pub async fn list<R, C, P>(
    State(state): State<Arc<AppState<R, C, P>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    R: OrderRepository,
    C: ProductCatalog,
    P: Publisher + 'static,
{
    let orders = state.place.orders().list_orders().await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /item-types: the menu with current prices.
pub async fn item_types<R, C, P>(
    State(state): State<Arc<AppState<R, C, P>>>,
) -> Result<Json<Vec<ItemTypeResponse>>, ApiError>
where
    R: OrderRepository,
    C: ProductCatalog,
    P: Publisher + 'static,
{
    let items = state.place.orders().item_types().await?;
    Ok(Json(items.into_iter().map(ItemTypeResponse::from).collect()))
}
