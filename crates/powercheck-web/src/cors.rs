//! CORS response headers. The allow-origin echoes the request's `Origin`,
//! falling back to the configured public origin; the advertised method and
//! headers follow the preflight's requested method.

use axum::http::{HeaderMap, HeaderValue, header};

use powercheck_core::config::PublicOriginConfig;

pub(crate) fn apply_cors_headers(
    request: &HeaderMap,
    origin: &PublicOriginConfig,
    response: &mut HeaderMap,
) {
    let allow_origin = request
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| origin.origin());
    let Ok(allow_origin) = HeaderValue::from_str(&allow_origin) else {
        return;
    };
    response.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);

    let requested_method = request
        .get(header::ACCESS_CONTROL_REQUEST_METHOD)
        .and_then(|value| value.to_str().ok());
    match requested_method {
        Some("GET") => {
            response.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET"),
            );
            response.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("range"),
            );
        }
        Some("POST") => {
            response.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("POST"),
            );
            response.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type"),
            );
        }
        Some("PUT") => {
            response.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("PUT"),
            );
            response.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type"),
            );
        }
        Some("DELETE") => {
            response.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("DELETE"),
            );
        }
        _ => {}
    }
}

/// Catch-all preflight response.
pub(crate) fn apply_permissive_cors(response: &mut HeaderMap) {
    response.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET"),
    );
    response.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Access-Control-Allow-Origin, range"),
    );
    response.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Content-Range"),
    );
}
