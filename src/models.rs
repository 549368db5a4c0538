use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::schema::{
    CREATED_AT_FIELD, Entity, FieldDefault, FieldKind, FieldSpec, FloorValue, Schema, SortKey,
};
use crate::store::Filter;

// --- Choice Sets ---

/// PersonCategory
///
/// Which public roster a person appears on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum PersonCategory {
    Team,
    Faculty,
    Alumni,
    GoldenAlumni,
}

impl PersonCategory {
    pub const NAMES: &'static [&'static str] = &["TEAM", "FACULTY", "ALUMNI", "GOLDEN_ALUMNI"];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonCategory::Team => "TEAM",
            PersonCategory::Faculty => "FACULTY",
            PersonCategory::Alumni => "ALUMNI",
            PersonCategory::GoldenAlumni => "GOLDEN_ALUMNI",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ProjectStatus {
    Ongoing,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub const NAMES: &'static [&'static str] = &["ONGOING", "COMPLETED", "ARCHIVED"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum GalleryCategory {
    Event,
    Workshop,
    Hackathon,
    Meetup,
    Other,
}

impl GalleryCategory {
    pub const NAMES: &'static [&'static str] = &["EVENT", "WORKSHOP", "HACKATHON", "MEETUP", "OTHER"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ContactStatus {
    Unread,
    Read,
    Replied,
}

impl ContactStatus {
    pub const NAMES: &'static [&'static str] = &["UNREAD", "READ", "REPLIED"];
}

/// Uppercases a text filter, treating an empty value as not supplied.
fn choice_filter(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_uppercase())
        .filter(|v| !v.is_empty())
}

const SORT_BY_ORDER_THEN_NEWEST: &[SortKey] = &[
    SortKey::asc("order", FieldKind::Integer),
    SortKey::desc(CREATED_AT_FIELD, FieldKind::Timestamp),
];

const ACTIVE_ONLY: &[(&str, FloorValue)] = &[("isActive", FloorValue::Bool(true))];

// --- Person ---

/// Person
///
/// A team member, faculty member or alumnus shown on the public site.
/// `company`, `package` and `graduationYear` are meant for alumni but are not
/// restricted to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub designation: String,
    pub category: PersonCategory,
    pub bio: Option<String>,
    // Relative upload URL, e.g. `/uploads/people/image-....jpg`.
    pub image: Option<String>,
    pub linked_in: Option<String>,
    pub github: Option<String>,
    pub twitter: Option<String>,
    pub company: Option<String>,
    pub package: Option<String>,
    pub graduation_year: Option<i32>,
    pub order: i32,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PeopleQuery {
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

impl Entity for Person {
    const SCHEMA: Schema = Schema {
        collection: "people",
        label: "Person",
        fields: &[
            FieldSpec::new("name", FieldKind::Text).required("Please provide a name"),
            FieldSpec::new("email", FieldKind::Email),
            FieldSpec::new("phone", FieldKind::Text),
            FieldSpec::new("designation", FieldKind::Text).required("Please provide a designation"),
            FieldSpec::new("category", FieldKind::Choice(PersonCategory::NAMES))
                .required("Please provide a category"),
            FieldSpec::new("bio", FieldKind::Text),
            FieldSpec::new("image", FieldKind::Text).default(FieldDefault::Null),
            FieldSpec::new("linkedIn", FieldKind::Text),
            FieldSpec::new("github", FieldKind::Text),
            FieldSpec::new("twitter", FieldKind::Text),
            FieldSpec::new("company", FieldKind::Text),
            FieldSpec::new("package", FieldKind::Text),
            FieldSpec::new("graduationYear", FieldKind::Integer),
            FieldSpec::new("order", FieldKind::Integer).default(FieldDefault::Int(0)),
            FieldSpec::new("isActive", FieldKind::Boolean).default(FieldDefault::Bool(true)),
        ],
        sort: SORT_BY_ORDER_THEN_NEWEST,
        public_floor: ACTIVE_ONLY,
    };

    type Query = PeopleQuery;

    fn query_filter(query: PeopleQuery) -> Filter {
        Filter::new()
            .eq_some("category", choice_filter(query.category))
            .eq_some("isActive", query.is_active)
    }
}

// --- Project ---

/// Project
///
/// A showcased project. `thumbnail` always mirrors the first entry of `images`
/// whenever a write supplies images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub short_description: Option<String>,
    pub category: String,
    pub technologies: Vec<String>,
    pub images: Vec<String>,
    pub thumbnail: Option<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    #[ts(type = "string | null")]
    pub start_date: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub end_date: Option<DateTime<Utc>>,
    pub status: ProjectStatus,
    pub is_featured: bool,
    pub team_members: Vec<String>,
    pub order: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub status: Option<String>,
    pub is_featured: Option<bool>,
}

impl Entity for Project {
    const SCHEMA: Schema = Schema {
        collection: "projects",
        label: "Project",
        fields: &[
            FieldSpec::new("title", FieldKind::Text).required("Please provide a project title"),
            FieldSpec::new("description", FieldKind::Text)
                .required("Please provide a project description"),
            FieldSpec::new("shortDescription", FieldKind::Text),
            FieldSpec::new("category", FieldKind::Text).required("Please provide a category"),
            FieldSpec::new("technologies", FieldKind::TextList).default(FieldDefault::EmptyList),
            FieldSpec::new("images", FieldKind::TextList).default(FieldDefault::EmptyList),
            FieldSpec::new("thumbnail", FieldKind::Text).default(FieldDefault::Null),
            FieldSpec::new("githubUrl", FieldKind::Text),
            FieldSpec::new("liveUrl", FieldKind::Text),
            FieldSpec::new("startDate", FieldKind::Timestamp),
            FieldSpec::new("endDate", FieldKind::Timestamp),
            FieldSpec::new("status", FieldKind::Choice(ProjectStatus::NAMES))
                .default(FieldDefault::Text("ONGOING")),
            FieldSpec::new("isFeatured", FieldKind::Boolean).default(FieldDefault::Bool(false)),
            FieldSpec::new("teamMembers", FieldKind::TextList).default(FieldDefault::EmptyList),
            FieldSpec::new("order", FieldKind::Integer).default(FieldDefault::Int(0)),
        ],
        sort: SORT_BY_ORDER_THEN_NEWEST,
        public_floor: &[("status", FloorValue::Text("COMPLETED"))],
    };

    type Query = ProjectQuery;

    fn query_filter(query: ProjectQuery) -> Filter {
        Filter::new()
            .eq_some("status", choice_filter(query.status))
            .eq_some("isFeatured", query.is_featured)
    }

    fn prepare(payload: &mut Map<String, Value>) {
        // The thumbnail always tracks the first image, cleared with an emptied list.
        if let Some(images) = payload.get("images").and_then(Value::as_array) {
            let thumbnail = images.first().cloned().unwrap_or(Value::Null);
            payload.insert("thumbnail".to_string(), thumbnail);
        }
    }
}

// --- Testimonial ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Testimonial {
    pub id: Uuid,
    pub name: String,
    pub designation: String,
    pub company: Option<String>,
    pub message: String,
    pub image: Option<String>,
    // Always within 1..=5.
    pub rating: i32,
    pub is_active: bool,
    pub order: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialQuery {
    pub is_active: Option<bool>,
}

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

impl Entity for Testimonial {
    const SCHEMA: Schema = Schema {
        collection: "testimonials",
        label: "Testimonial",
        fields: &[
            FieldSpec::new("name", FieldKind::Text).required("Please provide a name"),
            FieldSpec::new("designation", FieldKind::Text).required("Please provide a designation"),
            FieldSpec::new("company", FieldKind::Text),
            FieldSpec::new("message", FieldKind::Text)
                .required("Please provide a testimonial message"),
            FieldSpec::new("image", FieldKind::Text).default(FieldDefault::Null),
            FieldSpec::new("rating", FieldKind::Integer).default(FieldDefault::Int(MAX_RATING)),
            FieldSpec::new("isActive", FieldKind::Boolean).default(FieldDefault::Bool(true)),
            FieldSpec::new("order", FieldKind::Integer).default(FieldDefault::Int(0)),
        ],
        sort: SORT_BY_ORDER_THEN_NEWEST,
        public_floor: ACTIVE_ONLY,
    };

    type Query = TestimonialQuery;

    fn query_filter(query: TestimonialQuery) -> Filter {
        Filter::new().eq_some("isActive", query.is_active)
    }

    fn prepare(payload: &mut Map<String, Value>) {
        if let Some(rating) = payload.get("rating").and_then(Value::as_i64) {
            payload.insert(
                "rating".to_string(),
                Value::from(rating.clamp(MIN_RATING, MAX_RATING)),
            );
        }
    }
}

// --- Gallery ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GalleryItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image: String,
    pub category: GalleryCategory,
    #[ts(type = "string")]
    pub date: DateTime<Utc>,
    pub is_active: bool,
    pub order: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct GalleryQuery {
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

impl Entity for GalleryItem {
    const SCHEMA: Schema = Schema {
        collection: "gallery",
        label: "Gallery item",
        fields: &[
            FieldSpec::new("title", FieldKind::Text).required("Please provide a title"),
            FieldSpec::new("description", FieldKind::Text),
            FieldSpec::new("image", FieldKind::Text).required("Please provide an image"),
            FieldSpec::new("category", FieldKind::Choice(GalleryCategory::NAMES))
                .default(FieldDefault::Text("OTHER")),
            FieldSpec::new("date", FieldKind::Timestamp).default(FieldDefault::Now),
            FieldSpec::new("isActive", FieldKind::Boolean).default(FieldDefault::Bool(true)),
            FieldSpec::new("order", FieldKind::Integer).default(FieldDefault::Int(0)),
        ],
        sort: &[
            SortKey::desc("date", FieldKind::Timestamp),
            SortKey::asc("order", FieldKind::Integer),
        ],
        public_floor: ACTIVE_ONLY,
    };

    type Query = GalleryQuery;

    fn query_filter(query: GalleryQuery) -> Filter {
        Filter::new()
            .eq_some("category", choice_filter(query.category))
            .eq_some("isActive", query.is_active)
    }
}

// --- Contact ---

/// ContactMessage
///
/// A submission from the public contact form. Admins move it through
/// UNREAD → READ → REPLIED by updating `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub order: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ContactQuery {
    pub status: Option<String>,
}

impl Entity for ContactMessage {
    const SCHEMA: Schema = Schema {
        collection: "contacts",
        label: "Contact",
        fields: &[
            FieldSpec::new("name", FieldKind::Text).required("Please provide a name"),
            FieldSpec::new("email", FieldKind::Email).required("Please provide an email"),
            FieldSpec::new("phone", FieldKind::Text),
            FieldSpec::new("subject", FieldKind::Text).required("Please provide a subject"),
            FieldSpec::new("message", FieldKind::Text).required("Please provide a message"),
            FieldSpec::new("status", FieldKind::Choice(ContactStatus::NAMES))
                .default(FieldDefault::Text("UNREAD")),
            FieldSpec::new("order", FieldKind::Integer).default(FieldDefault::Int(0)),
        ],
        sort: &[SortKey::desc(CREATED_AT_FIELD, FieldKind::Timestamp)],
        public_floor: &[],
    };

    type Query = ContactQuery;

    fn query_filter(query: ContactQuery) -> Filter {
        Filter::new().eq_some("status", choice_filter(query.status))
    }
}
