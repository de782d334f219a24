// src/routes.rs

use axum::{
    Json, Router,
    http::Method,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{auth, outfits, ratings, search, users},
    state::AppState,
    utils::session::auth_middleware,
};

async fn health() -> impl IntoResponse {
    Json(json!({ "message": "StyleSwap API is running" }))
}

/// Assembles the main application router.
///
/// * Public routes: health, signup/login/logout, catalog reads, search,
///   user lookup, share links, static image serving.
/// * Session-gated routes: outfit writes, ratings, profile reads/writes.
/// * Global middleware (Trace, CORS) and state injection.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let public_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/check-auth", get(auth::check_auth))
        .route("/outfits", get(outfits::list_outfits))
        .route("/outfits/{id}", get(outfits::get_outfit))
        .route("/outfits/{id}/share", get(outfits::share_outfit))
        .route("/search", get(search::search))
        .route("/users/{id}", get(users::get_user));

    let protected_routes = Router::new()
        .route("/outfits", post(outfits::create_outfit))
        .route(
            "/outfits/{id}",
            put(outfits::update_outfit).delete(outfits::delete_outfit),
        )
        .route("/ratings", post(ratings::submit_rating))
        .route("/users/{id}", put(users::update_user))
        .route("/users/{id}/outfits", get(users::list_user_outfits))
        .route("/profile", get(users::get_profile))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(health))
        .nest("/api", public_routes.merge(protected_routes))
        .nest_service("/Uploads", ServeDir::new(&state.config.upload_dir))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
