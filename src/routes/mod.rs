use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::{auth, customer, dasher, distance};
use crate::middleware::auth::{auth_middleware, require_dasher};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Create role-specific governor layers
    let dasher_governor = create_role_governor(RateLimitedRole::Dasher);
    let customer_governor = create_role_governor(RateLimitedRole::Customer);
    // Create IP-based governor for public routes
    let public_governor = create_public_governor();

    // Public routes (with IP-based rate limiting)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(public_governor.clone());

    // Public lookup routes (serveries, distance/fee quotes)
    let public_routes = Router::new()
        .route("/serveries", get(customer::list_serveries))
        .route("/distance", post(distance::quote))
        .layer(public_governor);

    // Customer routes (requires auth)
    // Rate limit: 100 requests per minute per user
    let order_routes = Router::new()
        .route("/", post(customer::create_order))
        .route("/", get(customer::my_orders))
        .route("/{id}/rating", post(customer::rate_order))
        .layer(customer_governor)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Dasher signup only needs auth, not the dasher flag
    let dasher_signup = Router::new()
        .route("/signup", post(dasher::signup))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Dasher routes (requires auth + dasher flag)
    // Rate limit: 500 requests per minute per user (the feed is polled)
    let dasher_routes = Router::new()
        .route("/status", put(dasher::set_status))
        .route("/orders", get(dasher::open_orders))
        .route("/orders/{id}/accept", post(dasher::accept_order))
        .route("/orders/{id}/deliver", post(dasher::deliver_order))
        .layer(dasher_governor)
        .layer(middleware::from_fn(require_dasher))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", public_routes)
        .nest("/api/orders", order_routes)
        .nest("/api/dasher", dasher_signup.merge(dasher_routes))
        .with_state(state)
}
