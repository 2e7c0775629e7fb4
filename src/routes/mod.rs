use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod auth;
pub mod colorings;
pub mod favorites;
pub mod gallery;
pub mod health;
pub mod library;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let colorings_routes = Router::new()
        .route("/generate", post(colorings::generate_colorings))
        .route("/limit", get(colorings::generation_limit));

    let gallery_routes = Router::new()
        .route("/", get(gallery::list_gallery))
        .route("/:id", get(gallery::get_coloring))
        .route("/:id/image", get(gallery::get_coloring_image))
        .route("/:id/favorite", post(favorites::toggle_favorite));

    let library_routes = Router::new()
        .route("/", get(library::list_library))
        .route(
            "/:id",
            post(library::save_to_library).delete(library::remove_from_library),
        )
        .route("/:id/favorite", post(library::toggle_library_favorite));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/colorings", colorings_routes)
        .nest("/api/gallery", gallery_routes)
        .nest("/api/library", library_routes)
        // Nested "/" does not match the trailing-slash form of the prefix.
        .route("/api/gallery/", get(gallery::list_gallery))
        .route("/api/library/", get(library::list_library))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 16))
}
