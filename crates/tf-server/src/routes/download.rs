//! Download request intake.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use tf_core::{DownloadRequest, Error};

use crate::context::AppContext;
use crate::error::AppError;

/// Query string of `GET /download`.
///
/// `a`, `d` and `s` are integers; non-zero means yes, absent means no.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadParams {
    /// Media id.
    pub v: Option<String>,
    /// Wants audio.
    pub a: Option<String>,
    /// Wants video.
    pub d: Option<String>,
    /// Wants subtitles.
    pub s: Option<String>,
}

impl DownloadParams {
    pub fn into_request(self) -> tf_core::Result<DownloadRequest> {
        let media_id = self
            .v
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Validation("Missing required query parameter 'v'".into()))?;

        Ok(DownloadRequest::new(
            media_id,
            flag("d", self.d.as_deref())?,
            flag("a", self.a.as_deref())?,
            flag("s", self.s.as_deref())?,
        ))
    }
}

fn flag(name: &str, value: Option<&str>) -> tf_core::Result<bool> {
    match value.map(str::trim) {
        None | Some("") => Ok(false),
        Some(raw) => raw
            .parse::<i64>()
            .map(|n| n != 0)
            .map_err(|_| Error::Validation(format!("Query parameter '{name}' must be an integer, got '{raw}'"))),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Accepted {
    pub vid: String,
}

/// GET /download
pub async fn enqueue_download(
    State(ctx): State<AppContext>,
    Query(params): Query<DownloadParams>,
) -> Result<Json<Accepted>, AppError> {
    let request = params.into_request()?;
    tracing::info!(
        media_id = %request.media_id,
        tracks = %request.track_spec(),
        subtitles = request.want_subtitles,
        "Download request queued"
    );

    let vid = request.media_id.clone();
    ctx.sender.push(request)?;
    Ok(Json(Accepted { vid }))
}

/// Any other method on /download.
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({ "message": "Should be GET" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(v: Option<&str>, a: Option<&str>, d: Option<&str>, s: Option<&str>) -> DownloadParams {
        DownloadParams {
            v: v.map(Into::into),
            a: a.map(Into::into),
            d: d.map(Into::into),
            s: s.map(Into::into),
        }
    }

    #[test]
    fn flags_map_to_request() {
        let req = params(Some("abc123"), Some("0"), Some("1"), Some("1"))
            .into_request()
            .unwrap();
        assert_eq!(req, DownloadRequest::new("abc123", true, false, true));
        assert_eq!(req.track_spec().as_str(), "v");
    }

    #[test]
    fn absent_flags_are_false() {
        let req = params(Some("x"), None, None, None).into_request().unwrap();
        assert!(!req.want_audio && !req.want_video && !req.want_subtitles);
    }

    #[test]
    fn any_nonzero_is_true() {
        let req = params(Some("x"), Some("2"), Some("-1"), Some("0"))
            .into_request()
            .unwrap();
        assert!(req.want_audio && req.want_video && !req.want_subtitles);
    }

    #[test]
    fn missing_id_is_rejected() {
        let err = params(None, Some("1"), None, None).into_request().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = params(Some("  "), None, None, None).into_request().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn non_integer_flag_is_rejected() {
        let err = params(Some("x"), Some("yes"), None, None)
            .into_request()
            .unwrap_err();
        assert!(err.to_string().contains("'a'"));
    }
}
