use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{sea_query::Expr, ActiveEnum, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::delivery::geo::{haversine_miles, GeoPoint};
use crate::entities::order::OrderStatus;
use crate::entities::user::DasherStatus;
use crate::entities::{order, servery, user};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::{create_token, Claims};
use crate::AppState;

/// Orders older than this no longer show up on the dasher feed.
const FEED_WINDOW_MINUTES: i64 = 30;

/// Assumed dasher walking speed for the delivery-time estimate.
const WALKING_MPH: f64 = 3.0;
const PREP_MINUTES: i64 = 10;

#[derive(Debug, Serialize)]
pub struct DasherTokenResponse {
    pub token: String,
    pub is_dasher: bool,
}

/// Become a dasher. Returns a fresh token carrying the dasher flag.
pub async fn signup(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<DasherTokenResponse>> {
    let user = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !user.is_dasher {
        let mut active: user::ActiveModel = user.clone().into();
        active.is_dasher = Set(true);
        active.update(&state.db).await?;
    }

    let token = create_token(
        user.id,
        &user.email,
        true,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    Ok(Json(DasherTokenResponse {
        token,
        is_dasher: true,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: DasherStatus,
}

/// Go online or offline
pub async fn set_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SetStatusRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let user = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let mut active: user::ActiveModel = user.into();
    active.dasher_status = Set(payload.status);
    active.update(&state.db).await?;

    Ok(Json(serde_json::json!({ "status": payload.status })))
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct FeedOrderResponse {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub servery: String,
    pub items: serde_json::Value,
    pub total_amount: f64,
    pub delivery_fee: f64,
    pub delivery_location: String,
    pub delivery_lat: f64,
    pub delivery_lng: f64,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub minutes_ago: i64,
    /// Straight-line miles from the dasher to the pickup, when the dasher
    /// sent their location.
    pub pickup_distance_miles: Option<f64>,
    pub estimated_minutes: i64,
    pub created_at: DateTime<Utc>,
}

/// Unassigned pending orders from the last 30 minutes, nearest pickup first
/// when the dasher's location is provided.
pub async fn open_orders(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<Vec<FeedOrderResponse>>> {
    let cutoff = Utc::now() - Duration::minutes(FEED_WINDOW_MINUTES);

    let orders = order::Entity::find()
        .filter(order::Column::Status.eq(OrderStatus::Pending))
        .filter(order::Column::DasherId.is_null())
        .filter(order::Column::CreatedAt.gte(cutoff))
        .all(&state.db)
        .await?;

    if orders.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let customer_ids: Vec<Uuid> = orders.iter().map(|o| o.customer_id).collect();
    let customers = user::Entity::find()
        .filter(user::Column::Id.is_in(customer_ids))
        .all(&state.db)
        .await?;
    let serveries = servery::Entity::find().all(&state.db).await?;

    let dasher_location = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)).filter(GeoPoint::is_valid),
        _ => None,
    };

    let now = Utc::now();
    let mut responses: Vec<FeedOrderResponse> = orders
        .into_iter()
        .filter_map(|o| {
            let pickup = serveries.iter().find(|s| s.id == o.servery_id)?;
            let customer = customers.iter().find(|c| c.id == o.customer_id)?;

            let pickup_point = GeoPoint::new(pickup.lat, pickup.lng);
            let pickup_distance_miles =
                dasher_location.map(|loc| haversine_miles(loc, pickup_point));

            // Prep time plus the pickup-to-dropoff leg at walking pace
            let estimated_minutes =
                PREP_MINUTES + (o.distance_miles / WALKING_MPH * 60.0).round() as i64;

            let minutes_ago = (now - o.created_at.with_timezone(&Utc)).num_minutes();

            Some(FeedOrderResponse {
                id: o.id,
                customer_name: customer.full_name(),
                customer_phone: customer.phone_number.clone(),
                servery: pickup.name.clone(),
                items: o.order_items,
                total_amount: o.total_amount,
                delivery_fee: o.delivery_fee,
                delivery_location: o.delivery_location,
                delivery_lat: o.delivery_lat,
                delivery_lng: o.delivery_lng,
                pickup_lat: pickup.lat,
                pickup_lng: pickup.lng,
                minutes_ago,
                pickup_distance_miles,
                estimated_minutes,
                created_at: o.created_at.with_timezone(&Utc),
            })
        })
        .collect();

    if dasher_location.is_some() {
        responses.sort_by(|a, b| {
            a.pickup_distance_miles
                .partial_cmp(&b.pickup_distance_miles)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    } else {
        responses.sort_by_key(|r| r.created_at);
    }

    Ok(Json(responses))
}

/// Claim a pending order. The claim is a single filtered update so two
/// dashers racing on the same order cannot both win.
pub async fn accept_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = order::Entity::update_many()
        .col_expr(order::Column::DasherId, Expr::value(claims.sub))
        .col_expr(order::Column::Status, OrderStatus::Accepted.as_enum())
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Status.eq(OrderStatus::Pending))
        .filter(order::Column::DasherId.is_null())
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        let existing = order::Entity::find_by_id(order_id).one(&state.db).await?;
        return Err(match existing {
            None => AppError::NotFound("Order not found".to_string()),
            Some(_) => AppError::Conflict("Order has already been accepted".to_string()),
        });
    }

    tracing::info!(order_id = %order_id, dasher_id = %claims.sub, "order accepted");

    Ok(Json(serde_json::json!({
        "message": "Order accepted",
        "order_id": order_id,
    })))
}

/// Mark an accepted order as delivered
pub async fn deliver_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let order = order::Entity::find_by_id(order_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if order.dasher_id != Some(claims.sub) {
        return Err(AppError::Forbidden(
            "You can only complete orders assigned to you".to_string(),
        ));
    }
    if order.status != OrderStatus::Accepted {
        return Err(AppError::BadRequest(
            "Only accepted orders can be delivered".to_string(),
        ));
    }

    let mut active: order::ActiveModel = order.into();
    active.status = Set(OrderStatus::Delivered);
    let order = active.update(&state.db).await?;

    tracing::info!(order_id = %order.id, dasher_id = %claims.sub, "order delivered");

    Ok(Json(serde_json::json!({
        "message": "Order delivered",
        "order_id": order.id,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};

    use crate::config::Config;
    use crate::delivery::resolver::{
        PickupDescriptor, RouteLookupError, RoutedDistanceProvider, TravelMode,
    };
    use crate::entities::order::PaymentStatus;

    struct NoRoute;

    #[async_trait::async_trait]
    impl RoutedDistanceProvider for NoRoute {
        async fn route_miles(
            &self,
            _origin: &PickupDescriptor,
            _destination: GeoPoint,
            _mode: TravelMode,
        ) -> Result<f64, RouteLookupError> {
            Err(RouteLookupError::Lookup("ZERO_RESULTS".to_string()))
        }
    }

    fn test_state(db: DatabaseConnection) -> AppState {
        AppState {
            db,
            config: Config {
                database_url: "postgres://localhost/test".to_string(),
                jwt_secret: "test-secret".to_string(),
                jwt_expiration_hours: 24,
                server_host: "127.0.0.1".to_string(),
                server_port: 3000,
                google_maps_api_key: None,
                distance_timeout_secs: 8,
            },
            distance_provider: Arc::new(NoRoute),
        }
    }

    fn dasher_claims() -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4(),
            email: "dasher@rice.edu".to_string(),
            is_dasher: true,
            exp: now + 3600,
            iat: now,
        }
    }

    fn pending_order(customer_id: Uuid, servery_id: i32, miles: f64) -> order::Model {
        order::Model {
            id: Uuid::new_v4(),
            customer_id,
            dasher_id: None,
            servery_id,
            order_items: serde_json::json!({ "items": [] }),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            delivery_fee: 3.00,
            total_amount: 10.50,
            distance_miles: miles,
            distance_source: "routed".to_string(),
            delivery_location: "Lovett College, Room 205".to_string(),
            delivery_lat: 29.7166,
            delivery_lng: -95.3988,
            delivery_rating: None,
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[tokio::test]
    async fn test_accept_claims_pending_order() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let result = accept_order(
            State(test_state(db)),
            Extension(dasher_claims()),
            Path(Uuid::new_v4()),
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_accept_conflicts_when_order_already_claimed() {
        // The filtered update matches nothing once another dasher holds the
        // order, even though the row itself still exists.
        let mut claimed = pending_order(Uuid::new_v4(), 1, 0.4);
        claimed.dasher_id = Some(Uuid::new_v4());
        claimed.status = OrderStatus::Accepted;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![claimed.clone()]])
            .into_connection();

        let result = accept_order(
            State(test_state(db)),
            Extension(dasher_claims()),
            Path(claimed.id),
        )
        .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_accept_missing_order_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([Vec::<order::Model>::new()])
            .into_connection();

        let result = accept_order(
            State(test_state(db)),
            Extension(dasher_claims()),
            Path(Uuid::new_v4()),
        )
        .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_feed_joins_customers_and_sorts_nearest_first() {
        let customer_id = Uuid::new_v4();
        let customer = user::Model {
            id: customer_id,
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            email: "john@rice.edu".to_string(),
            phone_number: Some("+1 (555) 123-4567".to_string()),
            password_hash: "hash".to_string(),
            is_dasher: false,
            dasher_status: DasherStatus::Offline,
            created_at: Utc::now().fixed_offset(),
        };
        let baker = servery::Model {
            id: 1,
            name: "Baker".to_string(),
            lat: 29.7164,
            lng: -95.4018,
        };
        let west = servery::Model {
            id: 2,
            name: "West".to_string(),
            lat: 29.7174,
            lng: -95.4028,
        };

        let at_baker = pending_order(customer_id, 1, 0.3);
        let at_west = pending_order(customer_id, 2, 0.6);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![at_west, at_baker]])
            .append_query_results([vec![customer]])
            .append_query_results([vec![baker, west]])
            .into_connection();

        // Dasher standing at the Baker servery
        let query = FeedQuery {
            lat: Some(29.7164),
            lng: Some(-95.4018),
        };
        let Json(feed) = open_orders(State(test_state(db)), Query(query))
            .await
            .unwrap();

        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].servery, "Baker");
        assert_eq!(feed[0].customer_name, "John Smith");
        assert!(
            feed[0].pickup_distance_miles.unwrap() < feed[1].pickup_distance_miles.unwrap()
        );
    }

    #[tokio::test]
    async fn test_feed_empty_when_no_open_orders() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<order::Model>::new()])
            .into_connection();

        let Json(feed) = open_orders(
            State(test_state(db)),
            Query(FeedQuery { lat: None, lng: None }),
        )
        .await
        .unwrap();

        assert!(feed.is_empty());
    }
}
