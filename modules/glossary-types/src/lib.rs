//! Shared types for the glossary service and its HTTP clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =====================================================
// Field Constraints
// =====================================================

pub const TITLE_MIN_CHARS: usize = 1;
pub const TITLE_MAX_CHARS: usize = 100;
pub const DEFINITION_MIN_CHARS: usize = 10;
pub const DEFINITION_MAX_CHARS: usize = 2000;
pub const KEYWORD_MIN_CHARS: usize = 1;
pub const KEYWORD_MAX_CHARS: usize = 100;

pub const DEFAULT_LIST_LIMIT: usize = 100;
pub const MAX_LIST_LIMIT: usize = 1000;

/// Category assigned when a create request omits one.
pub const DEFAULT_CATEGORY: &str = "General";
/// Bucket used by statistics for records persisted without a category.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

// =====================================================
// Domain Types
// =====================================================

/// A glossary term as stored in the backing document and returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub id: i64,
    pub title: String,
    pub definition: String,
    /// Always set for terms created by the service; documents written
    /// elsewhere may leave it out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub related_terms: Vec<String>,
    #[serde(default)]
    pub source: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// On-disk layout of the backing document
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GlossaryDocument {
    pub glossary: Vec<TermRecord>,
}

// =====================================================
// Request Types
// =====================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTermRequest {
    pub title: String,
    pub definition: String,
    /// Omitted means "General"; an explicit `null` is rejected.
    #[serde(default = "default_category")]
    pub category: String,
    pub examples: Option<Vec<String>>,
    pub related_terms: Option<Vec<String>>,
    pub source: Option<String>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Partial update. `None` (omitted or JSON `null`) leaves the field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTermRequest {
    pub title: Option<String>,
    pub definition: Option<String>,
    pub category: Option<String>,
    pub examples: Option<Vec<String>>,
    pub related_terms: Option<Vec<String>>,
    pub source: Option<String>,
}

/// Query string of the list endpoint. Signed so that negative values
/// reach validation instead of failing to parse.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

// =====================================================
// Validation
// =====================================================

/// A single constraint violation on an input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Length check counted in characters, not bytes.
fn check_length(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = value.chars().count();
    if len < min {
        errors.push(FieldError::new(
            field,
            format!("must be at least {} characters (got {})", min, len),
        ));
    } else if len > max {
        errors.push(FieldError::new(
            field,
            format!("must be at most {} characters (got {})", max, len),
        ));
    }
}

fn into_result(errors: Vec<FieldError>) -> Result<(), Vec<FieldError>> {
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

impl CreateTermRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        check_length(&mut errors, "title", &self.title, TITLE_MIN_CHARS, TITLE_MAX_CHARS);
        check_length(
            &mut errors,
            "definition",
            &self.definition,
            DEFINITION_MIN_CHARS,
            DEFINITION_MAX_CHARS,
        );
        into_result(errors)
    }
}

impl UpdateTermRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            check_length(&mut errors, "title", title, TITLE_MIN_CHARS, TITLE_MAX_CHARS);
        }
        if let Some(definition) = &self.definition {
            check_length(
                &mut errors,
                "definition",
                definition,
                DEFINITION_MIN_CHARS,
                DEFINITION_MAX_CHARS,
            );
        }
        into_result(errors)
    }

    /// True when the update carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.definition.is_none()
            && self.category.is_none()
            && self.examples.is_none()
            && self.related_terms.is_none()
            && self.source.is_none()
    }
}

impl ListQuery {
    /// Resolve to `(skip, limit)`, applying defaults.
    pub fn validate(&self) -> Result<(usize, usize), Vec<FieldError>> {
        let mut errors = Vec::new();
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(DEFAULT_LIST_LIMIT as i64);
        if skip < 0 {
            errors.push(FieldError::new("skip", "must be greater than or equal to 0"));
        }
        if limit < 1 || limit > MAX_LIST_LIMIT as i64 {
            errors.push(FieldError::new(
                "limit",
                format!("must be between 1 and {}", MAX_LIST_LIMIT),
            ));
        }
        into_result(errors)?;
        Ok((skip as usize, limit as usize))
    }
}

pub fn validate_keyword(keyword: &str) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    check_length(&mut errors, "keyword", keyword, KEYWORD_MIN_CHARS, KEYWORD_MAX_CHARS);
    into_result(errors)
}

// =====================================================
// Response Types
// =====================================================

/// Uniform envelope returned by every glossary operation
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// One page of the unfiltered listing
#[derive(Debug, Serialize, Deserialize)]
pub struct TermPage {
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
    pub items: Vec<TermRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedTerm {
    pub deleted_id: i64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct GlossaryStatistics {
    pub total_terms: usize,
    pub categories: BTreeMap<String, usize>,
    pub categories_count: usize,
}

impl GlossaryStatistics {
    pub fn from_terms(terms: &[TermRecord]) -> Self {
        let mut categories: BTreeMap<String, usize> = BTreeMap::new();
        for term in terms {
            let category = term.category.as_deref().unwrap_or(UNKNOWN_CATEGORY);
            *categories.entry(category.to_string()).or_insert(0) += 1;
        }
        Self {
            total_terms: terms.len(),
            categories_count: categories.len(),
            categories,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

// =====================================================
// Timestamps
// =====================================================

/// RFC 3339 timestamps in UTC with fixed microsecond precision, so the
/// textual form sorts chronologically and survives a write/read cycle.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Accepts RFC 3339, or a naive ISO 8601 datetime read as UTC.
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => Ok(dt.with_timezone(&Utc)),
            Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc()),
        }
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}
