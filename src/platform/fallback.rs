//! Caller-chosen degradation for failed fetches.
//!
//! Data access functions always return `Result`. Views that prefer to keep
//! rendering with an empty result call [`OrFallback::or_fallback`] (logs and
//! swallows the error) or wrap the result in [`Loaded`] (keeps the error
//! next to the placeholder so it can still be shown).

use serde::Serialize;

use crate::errors::ClientError;
use crate::models::{LogPage, LogStats, PagedResponse};

/// The neutral value a view renders when its fetch failed.
pub trait Fallback {
    fn fallback() -> Self;
}

impl Fallback for LogPage {
    /// `{data: [], next: null}`.
    fn fallback() -> Self {
        LogPage::empty()
    }
}

impl<T> Fallback for PagedResponse<T> {
    fn fallback() -> Self {
        PagedResponse::empty()
    }
}

impl Fallback for LogStats {
    fn fallback() -> Self {
        LogStats::zero()
    }
}

pub trait OrFallback<T> {
    fn or_fallback(self) -> T;
}

impl<T: Fallback> OrFallback<T> for Result<T, ClientError> {
    fn or_fallback(self) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, code = e.code(), "Fetch failed, using empty result");
                T::fallback()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadError {
    pub code: &'static str,
    pub message: String,
}

impl From<&ClientError> for LoadError {
    fn from(e: &ClientError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

/// Response envelope: the data (or its fallback) plus the error that
/// caused the fallback, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Loaded<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LoadError>,
}

impl<T: Fallback> Loaded<T> {
    pub fn from_result(result: Result<T, ClientError>) -> Self {
        match result {
            Ok(data) => Self { data, error: None },
            Err(e) => {
                tracing::warn!(error = %e, code = e.code(), "Fetch failed, serving empty result");
                Self {
                    data: T::fallback(),
                    error: Some(LoadError::from(&e)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CustomObject;

    #[test]
    fn test_failed_log_fetch_falls_back_to_empty_page() {
        let result: Result<LogPage, ClientError> = Err(ClientError::Api {
            status: 500,
            status_text: "Internal Server Error".into(),
        });
        let page = result.or_fallback();
        assert!(page.data.is_empty());
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_ok_passes_through() {
        let page = LogPage {
            data: vec![],
            next: Some("c1".into()),
            total: None,
        };
        let result: Result<LogPage, ClientError> = Ok(page.clone());
        assert_eq!(result.or_fallback(), page);
    }

    #[test]
    fn test_loaded_keeps_error_next_to_placeholder() {
        let loaded: Loaded<PagedResponse<CustomObject>> =
            Loaded::from_result(Err(ClientError::NoActiveTenant));
        assert_eq!(loaded.data, PagedResponse::empty());
        let error = loaded.error.unwrap();
        assert_eq!(error.code, "no_active_tenant");

        let body = serde_json::to_value(Loaded::<LogStats>::from_result(Ok(LogStats::zero()))).unwrap();
        assert!(body.get("error").is_none());
        assert_eq!(body["data"]["totalLogs"], 0);
    }
}
