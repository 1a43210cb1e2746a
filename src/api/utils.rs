//! Request checks shared by handlers

use axum::BoxError;
use axum::http::{HeaderMap, header};
use http_body_util::LengthLimitError;

use crate::api::error::ApiError;

/// Require a JSON `Content-Type`, optionally with a charset parameter
///
/// Rejects look-alikes such as `application/jsonp`, `application/json-patch+json`
/// and `text/json`.
pub fn require_json(headers: &HeaderMap) -> Result<mime::Mime, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;

    parse_content_type(content_type)
}

pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type
        .parse()
        .map_err(|_| ApiError::InvalidPayload(format!("invalid Content-Type: {content_type}")))?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

/// Map a failed body read; hitting the length limit means 413
pub fn body_read_error(err: BoxError, max_size: usize) -> ApiError {
    if err.downcast_ref::<LengthLimitError>().is_some() {
        return ApiError::PayloadTooLarge(max_size);
    }
    ApiError::InvalidPayload(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_json_content_types() {
        assert!(parse_content_type("application/json").is_ok());
        assert!(parse_content_type("application/json; charset=utf-8").is_ok());

        for rejected in ["application/jsonp", "application/zip", "text/json", "invalid", ""] {
            assert!(parse_content_type(rejected).is_err(), "{rejected} accepted");
        }
    }

    #[test]
    fn test_missing_header() {
        let err = require_json(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.code(), "INVALID_PAYLOAD");

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(require_json(&headers).is_ok());
    }

    #[tokio::test]
    async fn test_body_read_errors() {
        use http_body_util::{BodyExt, Full, Limited};

        let err = Limited::new(Full::new(bytes::Bytes::from_static(b"0123456789")), 4)
            .collect()
            .await
            .unwrap_err();
        match body_read_error(err, 4) {
            ApiError::PayloadTooLarge(limit) => assert_eq!(limit, 4),
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }

        let err = body_read_error(Box::new(std::io::Error::other("connection reset")), 1000);
        assert_eq!(err.code(), "INVALID_PAYLOAD");
    }
}
