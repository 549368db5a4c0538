use crate::{
    AppState, handlers,
    models::{GalleryItem, Person, Project, Testimonial},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Mounted at `/api/public`. Unauthenticated, read-only endpoints: the list and
/// detail handlers run under `AccessPolicy::Public`, so inactive people,
/// testimonials and gallery items, and unfinished projects, are never released
/// here regardless of query parameters.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // --- People ---
        .route("/people", get(handlers::public_list::<Person>))
        // Category rosters. `isActive = true` is fixed for all four.
        .route("/people/team", get(handlers::team))
        .route("/people/faculty", get(handlers::faculty))
        .route("/people/alumni", get(handlers::alumni))
        .route("/people/golden-alumni", get(handlers::golden_alumni))
        .route("/people/{id}", get(handlers::public_get::<Person>))
        // --- Projects ---
        .route("/projects", get(handlers::public_list::<Project>))
        // At most six featured, completed projects.
        .route("/projects/featured", get(handlers::featured_projects))
        .route("/projects/{id}", get(handlers::public_get::<Project>))
        // --- Testimonials & Gallery ---
        .route("/testimonials", get(handlers::public_list::<Testimonial>))
        .route("/testimonials/{id}", get(handlers::public_get::<Testimonial>))
        .route("/gallery", get(handlers::public_list::<GalleryItem>))
        .route("/gallery/{id}", get(handlers::public_get::<GalleryItem>))
        // POST /contact
        // The website contact form. Responds 201 with a thank-you message.
        .route("/contact", post(handlers::submit_contact))
}
