use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{auth, coupons},
    services::images::UPLOADS_ROUTE,
    AppState,
};

async fn root() -> &'static str {
    "Server is running"
}

pub fn router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.images.dir());
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(root))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route(
            "/api/coupons",
            get(coupons::list_coupons).post(coupons::create_coupon),
        )
        .route("/api/coupons/stats", get(coupons::coupon_stats))
        .route("/api/coupons/by-id/:id", get(coupons::get_coupon_by_id))
        // GET resolves a public code; PUT and DELETE take the owner's coupon id.
        .route(
            "/api/coupons/:key",
            get(coupons::get_coupon_by_code)
                .put(coupons::update_coupon)
                .delete(coupons::delete_coupon),
        )
        .nest_service(UPLOADS_ROUTE, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
