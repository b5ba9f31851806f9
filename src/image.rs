// ABOUTME: Data-URL decoding for photographed-meal submissions
// ABOUTME: Pure parsing with two well-defined failure modes, never a silent default
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

//! # Image Payload Decoder
//!
//! Clients submit photographed meals as data URLs
//! (`data:<mime>;base64,<payload>`). This module splits the URL into the
//! MIME type and the base64 payload for inline submission to the completion
//! service. The payload is relayed opaquely; its base64 content is not
//! validated here.

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// An inline base64 image with its declared MIME type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    /// Declared MIME type (e.g., `image/png`)
    pub mime_type: String,
    /// Base64-encoded image bytes
    pub data: String,
}

/// Decode a `data:<mime>;base64,<payload>` URL into an [`InlineImage`]
///
/// The URL is split on the first comma into header and payload; the MIME
/// type is the substring between `:` and the following `;` in the header.
///
/// # Errors
///
/// Returns an error if the URL has no comma-separated base64 payload, or if
/// the header carries no MIME type.
pub fn decode_data_url(data_url: &str) -> AppResult<InlineImage> {
    let (header, data) = data_url
        .split_once(',')
        .ok_or_else(|| AppError::invalid_format("Invalid image data: base64 payload is missing"))?;

    if data.is_empty() {
        return Err(AppError::invalid_format(
            "Invalid image data: base64 payload is missing",
        ));
    }

    let mime_type = header
        .split_once(':')
        .map(|(_, rest)| rest)
        .and_then(|rest| rest.split_once(';'))
        .map(|(mime, _)| mime)
        .filter(|mime| !mime.is_empty())
        .ok_or_else(|| AppError::invalid_format("Invalid image data: MIME type is missing"))?;

    Ok(InlineImage {
        mime_type: mime_type.to_owned(),
        data: data.to_owned(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn test_decode_valid_data_url() {
        let image = decode_data_url("data:image/png;base64,AAAA").unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "AAAA");
    }

    #[test]
    fn test_decode_jpeg_data_url() {
        let image = decode_data_url("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, "/9j/4AAQ");
    }

    #[test]
    fn test_missing_comma_fails() {
        let error = decode_data_url("not-a-data-url").unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidFormat);
        assert!(error.message.contains("Invalid image data"));
        assert!(error.message.contains("base64 payload"));
    }

    #[test]
    fn test_missing_mime_type_fails() {
        let error = decode_data_url("data:;base64,AAAA").unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidFormat);
        assert!(error.message.contains("MIME type"));
    }

    #[test]
    fn test_empty_payload_fails() {
        let error = decode_data_url("data:image/png;base64,").unwrap_err();
        assert!(error.message.contains("base64 payload"));
    }

    #[test]
    fn test_header_without_colon_fails() {
        let error = decode_data_url("image/png;base64,AAAA").unwrap_err();
        assert!(error.message.contains("MIME type"));
    }
}
