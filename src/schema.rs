//! Declarative record schemas.
//!
//! Each record kind describes itself as static data: its collection, its fields
//! (kind, required message, default), its sort order and the filter floor public
//! readers are held to. The generic service layer only ever consults this data;
//! there are no per-entity branches outside of `Entity::prepare`.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::error::{AppError, FieldError};
use crate::store::Filter;
use crate::validation::is_email;

/// Input/storage kind of a field. Drives coercion of loosely-typed input
/// (multipart text, JSON strings) into the stored representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Integer,
    Boolean,
    Timestamp,
    TextList,
    Choice(&'static [&'static str]),
}

/// Value a field takes when a new record is created without it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Bool(bool),
    Int(i64),
    Text(&'static str),
    Now,
    EmptyList,
    Null,
}

impl FieldDefault {
    fn to_value(self, now: DateTime<Utc>) -> Value {
        match self {
            FieldDefault::Bool(b) => Value::Bool(b),
            FieldDefault::Int(i) => Value::from(i),
            FieldDefault::Text(t) => Value::String(t.to_string()),
            FieldDefault::Now => Value::String(format_timestamp(now)),
            FieldDefault::EmptyList => Value::Array(Vec::new()),
            FieldDefault::Null => Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Message reported when the field is missing; `None` for optional fields.
    pub required: Option<&'static str>,
    pub default: Option<FieldDefault>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: None,
            default: None,
        }
    }

    pub const fn required(mut self, message: &'static str) -> Self {
        self.required = Some(message);
        self
    }

    pub const fn default(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy)]
pub struct SortKey {
    pub field: &'static str,
    pub direction: Direction,
    pub kind: FieldKind,
}

impl SortKey {
    pub const fn asc(field: &'static str, kind: FieldKind) -> Self {
        Self {
            field,
            direction: Direction::Asc,
            kind,
        }
    }

    pub const fn desc(field: &'static str, kind: FieldKind) -> Self {
        Self {
            field,
            direction: Direction::Desc,
            kind,
        }
    }
}

/// A constant filter value (public floors are compile-time data).
#[derive(Debug, Clone, Copy)]
pub enum FloorValue {
    Bool(bool),
    Text(&'static str),
}

impl From<FloorValue> for Value {
    fn from(value: FloorValue) -> Self {
        match value {
            FloorValue::Bool(b) => Value::Bool(b),
            FloorValue::Text(t) => Value::String(t.to_string()),
        }
    }
}

/// Names of the bookkeeping fields every stored document carries.
pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

#[derive(Debug)]
pub struct Schema {
    pub collection: &'static str,
    /// Human label used in messages, e.g. "Person not found".
    pub label: &'static str,
    pub fields: &'static [FieldSpec],
    pub sort: &'static [SortKey],
    /// Filters public readers can never escape.
    pub public_floor: &'static [(&'static str, FloorValue)],
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Drops keys the schema does not declare, including any client-supplied
    /// identifier or timestamps.
    pub fn retain_known(&self, payload: &mut Map<String, Value>) {
        payload.retain(|key, _| self.field(key).is_some());
    }

    /// Coerces loosely-typed input into each field's stored representation.
    /// All coercion failures are reported together.
    pub fn coerce(&self, payload: &mut Map<String, Value>) -> Result<(), AppError> {
        let now = Utc::now();
        let mut errors = Vec::new();

        for spec in self.fields {
            let Some(value) = payload.get_mut(spec.name) else {
                continue;
            };

            if value.is_null() {
                // Explicit null on a defaulted field resets it rather than storing null.
                if let Some(default) = spec.default {
                    *value = default.to_value(now);
                }
                continue;
            }

            match coerce_value(spec.kind, value) {
                // A blank non-text field falls back to its default, like an omitted one.
                Ok(Value::Null) => *value = spec.default.map_or(Value::Null, |d| d.to_value(now)),
                Ok(coerced) => *value = coerced,
                Err(message) => errors.push(FieldError::new(spec.name, message)),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationFailed(errors))
        }
    }

    /// A fresh document holding every declared default.
    pub fn defaults(&self, now: DateTime<Utc>) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|spec| spec.default.map(|d| (spec.name.to_string(), d.to_value(now))))
            .collect()
    }

    /// Full-document constraint check: required presence, choice membership and
    /// email shape.
    pub fn check(&self, document: &Map<String, Value>) -> Vec<FieldError> {
        let mut errors = Vec::new();

        for spec in self.fields {
            let value = document.get(spec.name);
            let absent = match value {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                _ => false,
            };

            if absent {
                if let Some(message) = spec.required {
                    errors.push(FieldError::new(spec.name, message));
                }
                continue;
            }

            match (spec.kind, value) {
                (FieldKind::Choice(options), Some(Value::String(s))) => {
                    if !options.contains(&s.as_str()) {
                        errors.push(FieldError::new(
                            spec.name,
                            format!("`{}` is not a valid enum value for path `{}`.", s, spec.name),
                        ));
                    }
                }
                (FieldKind::Email, Some(Value::String(s))) => {
                    if !is_email(s) {
                        errors.push(FieldError::new(spec.name, "Please provide a valid email"));
                    }
                }
                _ => {}
            }
        }

        errors
    }

    /// Checks a complete document and turns it into its typed record.
    pub fn materialize<E: DeserializeOwned>(
        &self,
        document: Map<String, Value>,
    ) -> Result<E, AppError> {
        let errors = self.check(&document);
        if !errors.is_empty() {
            return Err(AppError::ValidationFailed(errors));
        }

        serde_json::from_value(Value::Object(document)).map_err(|e| {
            AppError::Internal(format!("{} document failed to load: {}", self.collection, e))
        })
    }

    /// The filter floor applied to every public read.
    pub fn public_filter(&self) -> Filter {
        self.public_floor
            .iter()
            .fold(Filter::new(), |filter, (field, value)| {
                filter.eq(field, Value::from(*value))
            })
    }
}

fn coerce_value(kind: FieldKind, value: &Value) -> Result<Value, String> {
    match (kind, value) {
        (FieldKind::Text, Value::String(s)) => Ok(Value::String(s.trim().to_string())),
        (FieldKind::Text, Value::Number(n)) => Ok(Value::String(n.to_string())),
        (FieldKind::Text, Value::Bool(b)) => Ok(Value::String(b.to_string())),
        (FieldKind::Email, Value::String(s)) => Ok(Value::String(s.trim().to_lowercase())),
        (
            FieldKind::Choice(_) | FieldKind::Integer | FieldKind::Boolean | FieldKind::Timestamp,
            Value::String(s),
        ) if s.trim().is_empty() => Ok(Value::Null),
        (FieldKind::Choice(_), Value::String(s)) => Ok(Value::String(s.trim().to_uppercase())),
        (FieldKind::Text | FieldKind::Email | FieldKind::Choice(_), _) => {
            Err("must be a string".to_string())
        }
        (FieldKind::Integer, _) => {
            let parsed = match value {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            let whole = parsed.ok_or_else(|| "must be a whole number".to_string())?;
            i32::try_from(whole)
                .map(Value::from)
                .map_err(|_| format!("must be between {} and {}", i32::MIN, i32::MAX))
        }
        (FieldKind::Boolean, _) => {
            let parsed = match value {
                Value::Bool(b) => Some(*b),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" | "on" => Some(true),
                    "false" | "0" | "no" | "off" => Some(false),
                    _ => None,
                },
                Value::Number(n) => match n.as_i64() {
                    Some(1) => Some(true),
                    Some(0) => Some(false),
                    _ => None,
                },
                _ => None,
            };
            parsed
                .map(Value::Bool)
                .ok_or_else(|| "must be true or false".to_string())
        }
        (FieldKind::Timestamp, _) => {
            let parsed = match value {
                Value::String(s) => parse_timestamp(s.trim()),
                Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
                _ => None,
            };
            parsed
                .map(|ts| Value::String(format_timestamp(ts)))
                .ok_or_else(|| "must be a valid date".to_string())
        }
        (FieldKind::TextList, Value::String(raw)) => {
            // Multipart forms carry arrays as JSON-encoded strings.
            let items: Vec<String> = serde_json::from_str(raw)
                .map_err(|_| "must be a JSON array of strings".to_string())?;
            Ok(Value::from(
                items.iter().map(|s| s.trim().to_string()).collect::<Vec<_>>(),
            ))
        }
        (FieldKind::TextList, Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(Value::String(s.trim().to_string())),
                _ => Err("must contain only strings".to_string()),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (FieldKind::TextList, _) => Err("must be a list of strings".to_string()),
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Entity
///
/// A record kind managed by the generic resource service. Implementors are the
/// typed records in `models`; their behavior is carried by `SCHEMA`.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const SCHEMA: Schema;

    /// Caller-facing list filters, bound from the query string.
    type Query: DeserializeOwned + Default + Send + 'static;

    /// Turns the caller's query into store filters. Absent keys are omitted.
    fn query_filter(query: Self::Query) -> Filter;

    /// Per-kind derivations applied to an incoming payload after coercion.
    fn prepare(_payload: &mut Map<String, Value>) {}
}
