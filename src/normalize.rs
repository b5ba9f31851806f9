// ABOUTME: Response normalization for completion-service output
// ABOUTME: Markdown fence stripping, empty detection, JSON parsing, array sanitization, weekly folding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

//! # Response Normalization
//!
//! The completion service returns free text even when asked for JSON: output
//! may be wrapped in markdown code fences, carry null where the data model
//! expects arrays, or (for weekly plans) arrive as an array that the HTTP
//! contract exposes as a date-keyed map. This module owns that cleanup
//! pipeline. All steps are pure functions over text and
//! [`serde_json::Value`].

use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::{AppError, AppResult, ErrorCode};

/// Keys whose values must always be arrays in normalized output
///
/// The completion service occasionally emits `null` (or omits a scalar) for
/// these; downstream consumers iterate them unconditionally.
const ARRAY_KEYS: &[&str] = &[
    "meals",
    "items",
    "ingredients",
    "instructions",
    "recipes",
    "diets",
    "restrictions",
    "times",
];

/// Strip leading/trailing markdown code fences from completion output
///
/// Removes a leading triple-backtick (with optional `json` language tag) and
/// a trailing triple-backtick, trimming surrounding whitespace. Stripping is
/// idempotent: already-clean text passes through unchanged.
#[must_use]
pub fn strip_markdown_fences(text: &str) -> &str {
    let mut cleaned = text.trim();

    if let Some(rest) = cleaned.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        cleaned = rest.trim_start();
    }

    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest.trim_end();
    }

    cleaned
}

/// Parse completion output expected to be JSON
///
/// Pipeline: trim and strip fences, reject empty output before any parse
/// attempt, parse, then sanitize known array-valued keys.
///
/// # Errors
///
/// Returns the fixed empty-response error when nothing remains after fence
/// stripping, and the fixed malformed-JSON error when parsing fails.
pub fn parse_structured(text: &str) -> AppResult<Value> {
    let cleaned = strip_markdown_fences(text);

    if cleaned.is_empty() {
        return Err(AppError::empty_completion());
    }

    let value: Value = serde_json::from_str(cleaned).map_err(|e| {
        warn!(error = %e, "completion output failed JSON parsing");
        AppError::malformed_completion()
    })?;

    Ok(sanitize_arrays(value))
}

/// Recursively replace null or non-array values under known array keys with `[]`
///
/// Applies to every nesting level; array elements are sanitized in place.
#[must_use]
pub fn sanitize_arrays(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_arrays).collect()),
        Value::Object(fields) => {
            let sanitized = fields
                .into_iter()
                .map(|(key, field)| {
                    let field = if ARRAY_KEYS.contains(&key.as_str()) {
                        match field {
                            Value::Array(items) => {
                                Value::Array(items.into_iter().map(sanitize_arrays).collect())
                            }
                            _ => Value::Array(Vec::new()),
                        }
                    } else {
                        sanitize_arrays(field)
                    };
                    (key, field)
                })
                .collect();
            Value::Object(sanitized)
        }
        other => other,
    }
}

/// Fold an array of daily plans into a date-keyed map
///
/// Each element is keyed by its `date` string field. Duplicate dates
/// overwrite earlier entries (last-write-wins); elements lacking a `date`
/// are silently dropped.
///
/// # Errors
///
/// Returns an error if the value is not an array.
pub fn fold_weekly_plan(value: Value) -> AppResult<Value> {
    let Value::Array(days) = value else {
        return Err(AppError::new(
            ErrorCode::MalformedCompletion,
            "AI response was not an array of daily plans",
        ));
    };

    let mut week = Map::new();
    for day in days {
        let Some(date) = day.get("date").and_then(Value::as_str).map(str::to_owned) else {
            continue;
        };
        week.insert(date, day);
    }

    Ok(Value::Object(week))
}
