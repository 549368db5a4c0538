use crate::{
    AppState,
    access::AccessPolicy,
    config::AppConfig,
    error::AppError,
    models::{ContactMessage, Person, PersonCategory, Project},
    response::ApiResponse,
    schema::Entity,
    upload::{ResourcePayload, ResourceRoute},
    validation::{self, CONTACT_RULES},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{StatusCode, Uri},
};
use serde::Serialize;
use utoipa::ToSchema;

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// HealthResponse
///
/// Liveness probe body.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    pub environment: String,
}

/// Binds the query string, reporting malformed values (e.g. `isActive=maybe`)
/// as a bad request rather than axum's plain-text rejection.
fn bind_query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(q)| q)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

// --- Generic Resource Handlers ---
//
// One set of handlers serves every record kind; the route registers them with a
// concrete `E` (e.g. `admin_list::<Person>`).

/// admin_list
///
/// [Admin Route] Lists records matching exactly the filters the caller supplied.
pub async fn admin_list<E: Entity>(
    State(state): State<AppState>,
    query: Result<Query<E::Query>, QueryRejection>,
) -> ApiResult<Vec<E>> {
    let filter = AccessPolicy::Admin.scope(&E::SCHEMA, E::query_filter(bind_query(query)?));
    let records = state.service::<E>().list(filter).await?;
    Ok(Json(ApiResponse::list(records)))
}

/// [Admin Route]
pub async fn admin_get<E: Entity>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<E> {
    let record = state.service::<E>().get_by_id(&id).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// create
///
/// [Admin Route] Runs the route's validation rules against the classified
/// payload, then creates the record.
pub async fn create<E: Entity>(
    State(state): State<AppState>,
    Extension(route): Extension<ResourceRoute>,
    ResourcePayload(payload): ResourcePayload,
) -> Result<(StatusCode, Json<ApiResponse<E>>), AppError> {
    validation::validate(&payload, route.create_rules)?;
    let record = state.service::<E>().create(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(record))))
}

/// update
///
/// [Admin Route] Partial update; only the supplied fields change.
pub async fn update<E: Entity>(
    State(state): State<AppState>,
    Extension(route): Extension<ResourceRoute>,
    Path(id): Path<String>,
    ResourcePayload(payload): ResourcePayload,
) -> ApiResult<E> {
    validation::validate(&payload, route.update_rules)?;
    let record = state.service::<E>().update(&id, payload).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// [Admin Route] Deletes the record and echoes it back.
pub async fn delete<E: Entity>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<E> {
    let record = state.service::<E>().delete(&id).await?;
    Ok(Json(
        ApiResponse::ok(record).with_message(format!("{} deleted successfully", E::SCHEMA.label)),
    ))
}

/// public_list
///
/// [Public Route] Caller filters are honored, but the public floor always
/// applies on top of them.
pub async fn public_list<E: Entity>(
    State(state): State<AppState>,
    query: Result<Query<E::Query>, QueryRejection>,
) -> ApiResult<Vec<E>> {
    let filter = AccessPolicy::Public.scope(&E::SCHEMA, E::query_filter(bind_query(query)?));
    let records = state.service::<E>().list(filter).await?;
    Ok(Json(ApiResponse::list(records)))
}

/// [Public Route] A record outside the public floor is reported as not found.
pub async fn public_get<E: Entity>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<E> {
    let floor = AccessPolicy::Public.floor(&E::SCHEMA);
    let record = state.service::<E>().get_scoped(&id, &floor).await?;
    Ok(Json(ApiResponse::ok(record)))
}

// --- People Rosters ---

async fn people_in(state: &AppState, category: PersonCategory) -> ApiResult<Vec<Person>> {
    let people = state.service::<Person>().get_by_category(category.as_str()).await?;
    Ok(Json(ApiResponse::list(people)))
}

#[utoipa::path(
    get,
    path = "/api/public/people/team",
    responses((status = 200, description = "Active team members", body = [Person]))
)]
pub async fn team(State(state): State<AppState>) -> ApiResult<Vec<Person>> {
    people_in(&state, PersonCategory::Team).await
}

#[utoipa::path(
    get,
    path = "/api/public/people/faculty",
    responses((status = 200, description = "Active faculty", body = [Person]))
)]
pub async fn faculty(State(state): State<AppState>) -> ApiResult<Vec<Person>> {
    people_in(&state, PersonCategory::Faculty).await
}

#[utoipa::path(
    get,
    path = "/api/public/people/alumni",
    responses((status = 200, description = "Active alumni", body = [Person]))
)]
pub async fn alumni(State(state): State<AppState>) -> ApiResult<Vec<Person>> {
    people_in(&state, PersonCategory::Alumni).await
}

#[utoipa::path(
    get,
    path = "/api/public/people/golden-alumni",
    responses((status = 200, description = "Active golden alumni", body = [Person]))
)]
pub async fn golden_alumni(State(state): State<AppState>) -> ApiResult<Vec<Person>> {
    people_in(&state, PersonCategory::GoldenAlumni).await
}

/// featured_projects
///
/// [Public Route] Landing-page projects: featured and completed, at most six.
#[utoipa::path(
    get,
    path = "/api/public/projects/featured",
    responses((status = 200, description = "Featured projects", body = [Project]))
)]
pub async fn featured_projects(State(state): State<AppState>) -> ApiResult<Vec<Project>> {
    let projects = state.service::<Project>().get_featured().await?;
    Ok(Json(ApiResponse::list(projects)))
}

/// submit_contact
///
/// [Public Route] Stores a contact-form message. Visitors cannot choose the
/// message status; every submission starts UNREAD.
#[utoipa::path(
    post,
    path = "/api/public/contact",
    responses(
        (status = 201, description = "Message received", body = ContactMessage),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn submit_contact(
    State(state): State<AppState>,
    ResourcePayload(mut payload): ResourcePayload,
) -> Result<(StatusCode, Json<ApiResponse<ContactMessage>>), AppError> {
    validation::validate(&payload, CONTACT_RULES)?;
    payload.remove("status");

    let message = state.service::<ContactMessage>().create(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(
            ApiResponse::ok(message)
                .with_message("Thank you for contacting us. We will get back to you soon."),
        ),
    ))
}

/// health
///
/// Always 200 while the process is serving requests.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health(State(config): State<AppConfig>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "Server is running".to_string(),
        environment: config.env.as_str().to_string(),
    })
}

/// Fallback for every unmatched route.
pub async fn route_not_found(uri: Uri) -> AppError {
    AppError::RouteNotFound(uri.to_string())
}
