use crate::{
    AppState, handlers,
    models::{ContactMessage, GalleryItem, Person, Project, Testimonial},
    schema::Entity,
    upload::{ResourceRoute, UploadDestination, UploadField},
    validation::{
        CONTACT_RULES, CONTACT_UPDATE_RULES, GALLERY_RULES, PERSON_RULES, PROJECT_RULES,
        TESTIMONIAL_RULES,
    },
};
use axum::{Extension, Router, routing::get};

/// Images accepted on a single project create or update.
pub const MAX_PROJECT_IMAGES: usize = 5;

pub const PEOPLE_ROUTE: ResourceRoute = ResourceRoute::new(
    Some(UploadField::single("image", UploadDestination::People)),
    PERSON_RULES,
);

pub const PROJECTS_ROUTE: ResourceRoute = ResourceRoute::new(
    Some(UploadField::multiple(
        "images",
        MAX_PROJECT_IMAGES,
        UploadDestination::Projects,
    )),
    PROJECT_RULES,
);

pub const TESTIMONIALS_ROUTE: ResourceRoute = ResourceRoute::new(
    Some(UploadField::single("image", UploadDestination::Misc)),
    TESTIMONIAL_RULES,
);

pub const GALLERY_ROUTE: ResourceRoute = ResourceRoute::new(
    Some(UploadField::single("image", UploadDestination::Gallery)),
    GALLERY_RULES,
);

pub const CONTACTS_ROUTE: ResourceRoute = ResourceRoute {
    upload: None,
    create_rules: CONTACT_RULES,
    update_rules: CONTACT_UPDATE_RULES,
};

/// resource
///
/// The five CRUD endpoints for one record kind. The route's upload field and
/// validation rules travel with each request as an extension.
fn resource<E: Entity>(route: ResourceRoute) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::admin_list::<E>).post(handlers::create::<E>),
        )
        .route(
            "/{id}",
            get(handlers::admin_get::<E>)
                .put(handlers::update::<E>)
                .delete(handlers::delete::<E>),
        )
        .layer(Extension(route))
}

/// Admin Router Module
///
/// Mounted at `/api/admin`. Every route here sits behind the admin gate in
/// `create_router`: missing or invalid credentials are rejected with 401, a
/// non-ADMIN role with 403. Admin list endpoints apply no filter floor.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .nest("/people", resource::<Person>(PEOPLE_ROUTE))
        .nest("/projects", resource::<Project>(PROJECTS_ROUTE))
        .nest("/testimonials", resource::<Testimonial>(TESTIMONIALS_ROUTE))
        .nest("/gallery", resource::<GalleryItem>(GALLERY_ROUTE))
        .nest("/contacts", resource::<ContactMessage>(CONTACTS_ROUTE))
}
