use axum::{
    http::{
        header::{CONTENT_TYPE, ETAG},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn json_ok<T: Serialize>(data: &T) -> Response {
    json_with_status(StatusCode::OK, data)
}

pub fn json_with_status<T: Serialize>(status: StatusCode, data: &T) -> Response {
    let payload = match serde_json::to_vec(data) {
        Ok(payload) => payload,
        Err(err) => {
            return json_err(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("encode error: {err}"),
            )
        }
    };
    let etag = hex::encode(Sha256::digest(&payload));
    let mut response = (
        status,
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        payload,
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&format!("W/\"{etag}\"")) {
        response.headers_mut().insert(ETAG, value);
    }
    response
}

pub fn json_err(status: StatusCode, msg: &str) -> Response {
    (status, Json(serde_json::json!({ "error": msg }))).into_response()
}
