//! Request validation.
//!
//! Payloads are plain serde structs that also implement [`Validate`]. The
//! [`ValidJson`] and [`ValidQuery`] extractors deserialize and validate in one
//! step, so a handler body only ever sees well-formed input. Every failure is
//! a 406 naming the first offending field.

pub mod requests;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, rejection::QueryRejection, FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ApiError;

pub use requests::*;

/// Semantic checks that run after a payload deserialized
pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

/// JSON body, deserialized and validated
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| rejection_to_error(&rejection.body_text(), "body"))?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// Query string, deserialized and validated
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| rejection_to_error(&rejection.body_text(), "query"))?;
        value.validate()?;
        Ok(ValidQuery(value))
    }
}

/// Turn a serde rejection into a 406 naming the offending field.
///
/// axum renders JSON data errors as `<context>: <path>: <error>`, the path
/// coming from `serde_path_to_error`. Query conversions use the same
/// `<field>: <error>` shape through [`FieldError`].
pub(crate) fn rejection_to_error(text: &str, fallback_field: &str) -> ApiError {
    let detail = text.split_once(": ").map(|(_, detail)| detail).unwrap_or(text);
    let detail = detail.split(" at line ").next().unwrap_or(detail);
    let (path, inner) = split_path(detail);

    let field = match (path, field_from_serde_message(inner)) {
        (Some(path), Some(field)) => format!("{}.{}", path, field),
        (Some(path), None) => path.to_string(),
        (None, Some(field)) => field,
        (None, None) => fallback_field.to_string(),
    };
    ApiError::validation(field, detail.to_string())
}

/// Leading `a.b[0]` path of a serde message, if there is one
fn split_path(detail: &str) -> (Option<&str>, &str) {
    match detail.split_once(": ") {
        Some((path, rest))
            if !path.is_empty()
                && path.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']')) =>
        {
            (Some(path), rest)
        }
        _ => (None, detail),
    }
}

fn field_from_serde_message(text: &str) -> Option<String> {
    for marker in ["missing field `", "unknown field `", "duplicate field `"] {
        if let Some(start) = text.find(marker) {
            let rest = &text[start + marker.len()..];
            return rest.find('`').map(|end| rest[..end].to_string());
        }
    }
    None
}

/// Conversion failure of one query parameter, displayed as `field: message`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn present<'a>(field: &'static str, raw: &'a Option<String>) -> Result<&'a str, FieldError> {
    raw.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| FieldError { field, message: format!("{} is required", field) })
}

pub fn query_uuid(field: &'static str, raw: &Option<String>) -> Result<Uuid, FieldError> {
    Uuid::parse_str(present(field, raw)?)
        .map_err(|_| FieldError { field, message: format!("{} must be a valid id", field) })
}

pub fn query_date(field: &'static str, raw: &Option<String>) -> Result<NaiveDate, FieldError> {
    NaiveDate::parse_from_str(present(field, raw)?, "%Y-%m-%d")
        .map_err(|_| FieldError { field, message: format!("{} must be a YYYY-MM-DD date", field) })
}

// Field-level helpers shared by the payload impls

pub fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(field, format!("{} is required", field)));
    }
    Ok(())
}

pub fn require_optional_text(field: &str, value: &Option<String>) -> Result<(), ApiError> {
    match value {
        Some(v) => require_text(field, v),
        None => Ok(()),
    }
}

pub fn require_non_negative(field: &str, value: Decimal) -> Result<(), ApiError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ApiError::validation(field, format!("{} must not be negative", field)));
    }
    Ok(())
}

pub fn require_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ApiError> {
    if !(min..=max).contains(&value) {
        return Err(ApiError::validation(field, format!("{} must be between {} and {}", field, min, max)));
    }
    Ok(())
}

/// Parse an `HH:MM-HH:MM` slot label into its bounds; start must precede end
pub fn slot_bounds(label: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (start, end) = label.trim().split_once('-')?;
    let parse = |s: &str| {
        let s = s.trim();
        if s.len() != 5 {
            return None;
        }
        NaiveTime::parse_from_str(s, "%H:%M").ok()
    };
    let (start, end) = (parse(start)?, parse(end)?);
    (start < end).then_some((start, end))
}

pub fn require_slot_label(field: &str, label: &str) -> Result<(), ApiError> {
    slot_bounds(label)
        .map(|_| ())
        .ok_or_else(|| ApiError::validation(field, format!("{} must look like HH:MM-HH:MM with start before end", field)))
}
