use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::delivery::geo::GeoPoint;
use crate::delivery::pricing::round_cents;
use crate::delivery::resolver::{resolve_distance, PickupDescriptor, TravelMode};
use crate::delivery::session::PriceSession;
use crate::entities::{order, servery};
use crate::entities::order::{OrderStatus, PaymentStatus};
use crate::error::{AppError, AppResult};
use crate::handlers::known_coordinates;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ServeryInfo {
    pub id: i32,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

/// List all serveries (pickup points)
pub async fn list_serveries(State(state): State<AppState>) -> AppResult<Json<Vec<ServeryInfo>>> {
    let serveries = servery::Entity::find().all(&state.db).await?;

    let responses: Vec<ServeryInfo> = serveries
        .into_iter()
        .map(|s| ServeryInfo {
            id: s.id,
            name: s.name,
            lat: s.lat,
            lng: s.lng,
        })
        .collect();

    Ok(Json(responses))
}

// ============ Order Management ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub id: String,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub servery: String,
    pub items: Vec<OrderItemInput>,
    pub meal_time: Option<String>,
    pub delivery_location: String,
    pub delivery_lat: f64,
    pub delivery_lng: f64,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub servery: String,
    pub items: serde_json::Value,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub delivery_fee: f64,
    pub total_amount: f64,
    pub distance_miles: f64,
    pub distance_source: String,
    pub delivery_location: String,
    pub delivery_rating: Option<i32>,
    pub created_at: DateTime<Utc>,
}

fn order_response(order: order::Model, servery_name: String) -> OrderResponse {
    OrderResponse {
        id: order.id,
        servery: servery_name,
        items: order.order_items,
        status: order.status,
        payment_status: order.payment_status,
        delivery_fee: order.delivery_fee,
        total_amount: order.total_amount,
        distance_miles: order.distance_miles,
        distance_source: order.distance_source,
        delivery_location: order.delivery_location,
        delivery_rating: order.delivery_rating,
        created_at: order.created_at.with_timezone(&Utc),
    }
}

/// Place an order. The delivery fee is computed server-side from the
/// servery-to-dropoff distance; submission is rejected while the distance
/// is unresolved.
pub async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<OrderResponse>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".to_string()));
    }
    for item in &payload.items {
        if item.quantity == 0 {
            return Err(AppError::BadRequest(format!(
                "Item {} has zero quantity",
                item.name
            )));
        }
        if !(item.price.is_finite() && item.price >= 0.0) {
            return Err(AppError::BadRequest(format!(
                "Item {} has an invalid price",
                item.name
            )));
        }
    }
    if payload.delivery_location.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Delivery location is required".to_string(),
        ));
    }

    let serveries = servery::Entity::find().all(&state.db).await?;
    let pickup = serveries
        .iter()
        .find(|s| s.name == payload.servery)
        .ok_or_else(|| AppError::BadRequest("Invalid servery name".to_string()))?;

    let dropoff = GeoPoint::new(payload.delivery_lat, payload.delivery_lng);
    if !dropoff.is_valid() {
        return Err(AppError::BadRequest(
            "Invalid delivery coordinates".to_string(),
        ));
    }

    // Run the one-shot resolve/price pipeline for this submission
    let known = known_coordinates(&serveries);
    let mut session = PriceSession::new();
    session.set_user_location(Some(dropoff));
    let descriptor = PickupDescriptor::Named(pickup.name.clone());
    let ticket = session
        .select_pickup(Some(descriptor.clone()))
        .ok_or_else(|| AppError::Internal("Distance resolution not armed".to_string()))?;

    let outcome = resolve_distance(
        state.distance_provider.as_ref(),
        &known,
        &descriptor,
        session.user_location(),
        TravelMode::Walking,
    )
    .await;
    session.commit(ticket, outcome);

    let price_unavailable = || {
        AppError::PriceUnavailable(
            "enable location access or select a valid pickup point".to_string(),
        )
    };
    let distance = session.current_distance().ok_or_else(price_unavailable)?;
    let delivery_fee = session.current_price().ok_or_else(price_unavailable)?;

    let subtotal: f64 = payload
        .items
        .iter()
        .map(|item| item.price * f64::from(item.quantity))
        .sum();
    let total_amount = round_cents(subtotal + delivery_fee);

    let items_json = serde_json::json!({
        "items": payload.items,
        "meal_time": payload.meal_time,
    });

    let order_id = Uuid::new_v4();
    let new_order = order::ActiveModel {
        id: Set(order_id),
        customer_id: Set(claims.sub),
        dasher_id: Set(None),
        servery_id: Set(pickup.id),
        order_items: Set(items_json),
        status: Set(OrderStatus::Pending),
        payment_status: Set(PaymentStatus::Pending),
        delivery_fee: Set(delivery_fee),
        total_amount: Set(total_amount),
        distance_miles: Set(distance.miles),
        distance_source: Set(distance.provenance.as_str().to_string()),
        delivery_location: Set(payload.delivery_location.clone()),
        delivery_lat: Set(dropoff.lat),
        delivery_lng: Set(dropoff.lng),
        delivery_rating: Set(None),
        ..Default::default()
    };

    let order = new_order.insert(&state.db).await?;

    tracing::info!(
        order_id = %order.id,
        servery = %pickup.name,
        miles = distance.miles,
        source = distance.provenance.as_str(),
        fee = delivery_fee,
        "order placed"
    );

    Ok(Json(order_response(order, pickup.name.clone())))
}

/// List the caller's orders, newest first
pub async fn my_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<OrderResponse>>> {
    let orders = order::Entity::find()
        .filter(order::Column::CustomerId.eq(claims.sub))
        .order_by_desc(order::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let serveries = servery::Entity::find().all(&state.db).await?;

    let responses: Vec<OrderResponse> = orders
        .into_iter()
        .map(|o| {
            let name = serveries
                .iter()
                .find(|s| s.id == o.servery_id)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            order_response(o, name)
        })
        .collect();

    Ok(Json(responses))
}

#[derive(Debug, Deserialize)]
pub struct RateOrderRequest {
    pub rating: i32,
}

/// Rate a delivered order
pub async fn rate_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<RateOrderRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    let order = order::Entity::find_by_id(order_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if order.customer_id != claims.sub {
        return Err(AppError::Forbidden(
            "You can only rate your own orders".to_string(),
        ));
    }
    if order.status != OrderStatus::Delivered {
        return Err(AppError::BadRequest(
            "Only delivered orders can be rated".to_string(),
        ));
    }

    let mut active: order::ActiveModel = order.into();
    active.delivery_rating = Set(Some(payload.rating));
    active.update(&state.db).await?;

    Ok(Json(serde_json::json!({ "message": "Rating saved" })))
}
