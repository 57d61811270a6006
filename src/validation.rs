//! Payload normalization and validation for todo requests.
//!
//! Due dates accept the extended ISO-8601 profile clients actually send:
//! RFC 3339, `YYYY-MM-DD[T| ]HH:MM[:SS[.f]]` with an optional `±HH:MM` or
//! `±HHMM` offset (trailing `Z` meaning `+00:00`), and a bare `YYYY-MM-DD`.
//! Hour-only times (`2025-01-02T03`) and the basic format without
//! separators (`20250102T030405`) are rejected.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::{
    error::AppError,
    models::{NewTodo, Priority, Status, TodoChanges, TodoCreate, TodoUpdate},
};

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;
pub const KEYWORD_MAX_CHARS: usize = 200;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

pub fn normalize_title(title: &str) -> Result<String, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("title is required"));
    }
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        return Err(AppError::validation(format!(
            "title must be at most {} characters",
            TITLE_MAX_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

pub fn check_description(description: &str) -> Result<(), AppError> {
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(AppError::validation(format!(
            "description must be at most {} characters",
            DESCRIPTION_MAX_CHARS
        )));
    }
    Ok(())
}

/// Empty or blank input clears the date. Anything else must parse as
/// ISO-8601 and is kept as the trimmed original text.
pub fn normalize_due_date(value: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(trimmed) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if !is_iso_datetime(trimmed) {
        return Err(AppError::validation(
            "dueDate must be a valid ISO8601 datetime string",
        ));
    }
    Ok(Some(trimmed.to_string()))
}

/// Search keyword for list queries. Blank input means no search.
pub fn normalize_keyword(value: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(keyword) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if keyword.chars().count() > KEYWORD_MAX_CHARS {
        return Err(AppError::validation("search keyword too long"));
    }
    Ok(Some(keyword.to_string()))
}

/// A trailing `Z` is read as `+00:00`.
pub fn is_iso_datetime(value: &str) -> bool {
    let normalized = match value.strip_suffix('Z') {
        Some(rest) => format!("{}+00:00", rest),
        None => value.to_string(),
    };
    let s = normalized.as_str();

    DateTime::parse_from_rfc3339(s).is_ok()
        || OFFSET_FORMATS
            .iter()
            .any(|fmt| DateTime::parse_from_str(s, fmt).is_ok())
        || NAIVE_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(s, fmt).is_ok())
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

pub fn validate_create(payload: TodoCreate) -> Result<NewTodo, AppError> {
    let title = normalize_title(payload.title.as_deref().unwrap_or_default())?;

    let description = payload.description.filter(|d| !d.is_empty());
    if let Some(description) = &description {
        check_description(description)?;
    }

    let status = match payload.status.as_deref() {
        None | Some("") => Status::default(),
        Some(value) => value.parse()?,
    };
    let priority = match payload.priority.as_deref() {
        None | Some("") => Priority::default(),
        Some(value) => value.parse()?,
    };
    let due_date = normalize_due_date(payload.due_date.as_deref())?;

    Ok(NewTodo {
        title,
        description,
        status,
        due_date,
        priority,
    })
}

/// Validates every present field before anything is written, so a bad
/// field rejects the whole patch.
pub fn validate_update(payload: TodoUpdate) -> Result<TodoChanges, AppError> {
    let title = match payload.title {
        None => None,
        Some(None) => return Err(AppError::validation("title must not be null")),
        Some(Some(title)) => Some(normalize_title(&title)?),
    };

    if let Some(Some(description)) = &payload.description {
        check_description(description)?;
    }

    let status = match payload.status {
        None => None,
        Some(None) => return Err(AppError::validation("status must not be null")),
        Some(Some(status)) => Some(status.parse()?),
    };
    let priority = match payload.priority {
        None => None,
        Some(None) => return Err(AppError::validation("priority must not be null")),
        Some(Some(priority)) => Some(priority.parse()?),
    };

    let due_date = match payload.due_date {
        None => None,
        Some(value) => Some(normalize_due_date(value.as_deref())?),
    };

    Ok(TodoChanges {
        title,
        description: payload.description,
        status,
        due_date,
        priority,
    })
}
