//! JSONP mock endpoint
//!
//! Any request carrying a `callback` query parameter is answered with one of
//! two configured payloads: the error payload (400) when the request target
//! mentions "error", the success payload (200) otherwise.

use axum::{
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
};

/// Query parameter marking a JSONP request
pub const CALLBACK_PARAM: &str = "callback";

/// The two canned responses of the mock endpoint
#[derive(Debug, Clone)]
pub struct MockPayloads {
    pub success: serde_json::Value,
    pub error: serde_json::Value,
}

impl MockPayloads {
    /// Answer a request that fell through static file serving.
    pub fn respond(&self, uri: &Uri) -> Response {
        let callback = match callback_param(uri) {
            Some(cb) => cb,
            None => return (StatusCode::NOT_FOUND, "Not found").into_response(),
        };

        let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("");
        let (status, body) = if target.contains("error") {
            (StatusCode::BAD_REQUEST, &self.error)
        } else {
            (StatusCode::OK, &self.success)
        };

        jsonp(status, body, &callback)
    }
}

/// Value of the callback query parameter, if present (possibly empty).
pub fn callback_param(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == CALLBACK_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Keep only characters valid in a JS callback reference.
pub fn sanitize_callback(callback: &str) -> String {
    callback
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '[' | ']'))
        .collect()
}

fn jsonp(status: StatusCode, body: &serde_json::Value, callback: &str) -> Response {
    let json = body.to_string();
    let callback = sanitize_callback(callback);

    if callback.is_empty() {
        return (
            status,
            [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
            json,
        )
            .into_response();
    }

    // U+2028/U+2029 are valid in JSON but terminate lines in JS.
    let json = json.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029");
    let script = format!(
        "/**/ typeof {cb} === 'function' && {cb}({json});",
        cb = callback,
        json = json
    );

    let mut response = (
        status,
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        script,
    )
        .into_response();
    response.headers_mut().insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
}
