use crate::error::NetworkError;
use crate::model::Model;
use crate::request::{Request, epoch_millis};
use crate::transport::HttpMetadata;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;

/// Result of one completed exchange.
///
/// Holds the [`Request`] that produced it (with its trace fields filled in),
/// the raw body, and the HTTP status and headers. Body views are computed on
/// demand; nothing is parsed until asked for.
#[derive(Clone)]
pub struct Response {
    request: Request,
    body: Bytes,
    status: StatusCode,
    headers: HeaderMap,
    duration: Option<i64>,
    model: Option<Model>,
}

impl Response {
    /// Build a response; `duration` is measured from `request.start()` to now.
    #[must_use]
    pub fn new(request: Request, body: Bytes, metadata: HttpMetadata) -> Self {
        let duration = request.start().map(|start| epoch_millis() - start);
        Self {
            request,
            body,
            status: metadata.status,
            headers: metadata.headers,
            duration,
            model: None,
        }
    }

    /// Replace the body, keeping everything else (used by decryptors).
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Milliseconds between send start and response construction.
    #[must_use]
    pub fn duration(&self) -> Option<i64> {
        self.duration
    }

    /// `true` for any status in `[200, 300)`; the body is not consulted.
    #[must_use]
    pub fn succeed(&self) -> bool {
        (200..300).contains(&self.status.as_u16())
    }

    /// Body as UTF-8 text, or `None` if it is not valid UTF-8.
    #[must_use]
    pub fn body_string(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Body parsed as JSON, or `None` if it is not valid JSON.
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Body JSON unwrapped by the request's data key.
    ///
    /// Without a data key this is [`body_json`](Self::body_json). With one,
    /// a top-level field named exactly like the key wins; otherwise the key is
    /// walked as a dotted path through nested objects. Whenever the lookup
    /// cannot be completed the whole top-level JSON is returned instead, so
    /// this only yields `None` when the body is not JSON at all.
    #[must_use]
    pub fn data(&self) -> Option<Value> {
        let json = self.body_json()?;
        match self.request.data_key_path() {
            Some(key) => Some(extract_data(json, key)),
            None => Some(json),
        }
    }

    /// Decode [`data`](Self::data) into the request's model type and store it.
    ///
    /// The model is filled once: later calls keep the stored value. Does
    /// nothing when the body is not JSON, when no model type was requested,
    /// or when the extracted value is neither an object nor an array.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::Decode` if the value does not match the model shape.
    pub fn decode_model(&mut self) -> Result<(), NetworkError> {
        if self.model.is_some() {
            return Ok(());
        }
        let Some(data) = self.data() else {
            return Ok(());
        };
        let Some(model_type) = self.request.decode_target() else {
            return Ok(());
        };
        if !(data.is_object() || data.is_array()) {
            return Ok(());
        }
        let model = model_type.decode(data).map_err(NetworkError::Decode)?;
        self.model = Some(model);
        Ok(())
    }

    /// The decoded model, if one was stored and it is a `T`.
    #[must_use]
    pub fn model<T: Any>(&self) -> Option<&T> {
        self.model.as_deref()?.downcast_ref::<T>()
    }

    /// Decode [`data`](Self::data) into `T` without storing it.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::Decode` if the body is not JSON or does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, NetworkError> {
        let value = match self.data() {
            Some(value) => value,
            None => serde_json::from_slice(&self.body).map_err(NetworkError::Decode)?,
        };
        serde_json::from_value(value).map_err(NetworkError::Decode)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("request", &self.request)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("duration", &self.duration)
            .field("has_model", &self.model.is_some())
            .finish()
    }
}

/// Unwrap `json` by `key`, falling back to `json` itself when the key does
/// not resolve.
#[must_use]
pub fn extract_data(json: Value, key: &str) -> Value {
    let found = json
        .as_object()
        .and_then(|object| lookup(object, key))
        .cloned();
    found.unwrap_or(json)
}

fn lookup<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = object.get(key) {
        return Some(value);
    }
    let (parents, last) = key.rsplit_once('.')?;
    let mut current = object;
    for segment in parents.split('.') {
        current = current.get(segment)?.as_object()?;
    }
    current.get(last)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn response_with(request: Request, status: u16, body: &str) -> Response {
        Response::new(
            request,
            Bytes::from(body.to_owned()),
            HttpMetadata {
                status: StatusCode::from_u16(status).unwrap(),
                headers: HeaderMap::new(),
            },
        )
    }

    fn keyed(key: &str, body: &str) -> Response {
        response_with(Request::get("/").data_key(key), 200, body)
    }

    #[test]
    fn test_succeed_boundaries() {
        for (status, expected) in [(199, false), (200, true), (299, true), (300, false)] {
            let response = response_with(Request::get("/"), status, "");
            assert_eq!(response.succeed(), expected, "status {status}");
        }
    }

    #[test]
    fn test_succeed_ignores_body() {
        let response = response_with(Request::get("/"), 204, r#"{"error": "nope"}"#);
        assert!(response.succeed());
        let response = response_with(Request::get("/"), 500, r#"{"ok": true}"#);
        assert!(!response.succeed());
    }

    #[test]
    fn test_body_views() {
        let response = response_with(Request::get("/"), 200, r#"{"a": 1}"#);
        assert_eq!(response.body_string(), Some(r#"{"a": 1}"#));
        assert_eq!(response.body_json(), Some(json!({"a": 1})));

        let response = response_with(Request::get("/"), 200, "plain text");
        assert_eq!(response.body_string(), Some("plain text"));
        assert!(response.body_json().is_none());
        assert!(response.data().is_none());
    }

    #[test]
    fn test_body_string_rejects_invalid_utf8() {
        let response = Response::new(
            Request::get("/"),
            Bytes::from_static(&[0xff, 0xfe, 0x00]),
            HttpMetadata {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
            },
        );
        assert!(response.body_string().is_none());
    }

    #[test]
    fn test_data_without_key_is_whole_body() {
        let response = response_with(Request::get("/"), 200, "[1, 2]");
        assert_eq!(response.data(), Some(json!([1, 2])));
    }

    #[test]
    fn test_data_direct_key_wins_over_path() {
        let response = keyed("a.b", r#"{"a.b": 1, "a": {"b": 2}}"#);
        assert_eq!(response.data(), Some(json!(1)));
    }

    #[test]
    fn test_data_path_traversal() {
        let response = keyed("data.rows", r#"{"data": {"rows": [1, 2, 3]}}"#);
        assert_eq!(response.data(), Some(json!([1, 2, 3])));

        let response = keyed("a.b.c", r#"{"a": {"b": {"c": "deep"}}}"#);
        assert_eq!(response.data(), Some(json!("deep")));
    }

    #[test]
    fn test_data_missing_segment_returns_whole_body() {
        let response = keyed("data.rows", r#"{"data": {}}"#);
        assert_eq!(response.data(), Some(json!({"data": {}})));

        let response = keyed("data.rows", r#"{"other": 1}"#);
        assert_eq!(response.data(), Some(json!({"other": 1})));
    }

    #[test]
    fn test_data_non_object_intermediate_returns_whole_body() {
        let body = r#"{"data": [{"rows": 1}]}"#;
        let response = keyed("data.rows", body);
        assert_eq!(response.data(), Some(json!({"data": [{"rows": 1}]})));
    }

    #[test]
    fn test_data_simple_key() {
        let response = keyed("data", r#"{"code": 0, "data": {"id": 9}}"#);
        assert_eq!(response.data(), Some(json!({"id": 9})));

        let response = keyed("missing", r#"{"code": 0}"#);
        assert_eq!(response.data(), Some(json!({"code": 0})));
    }

    #[test]
    fn test_data_key_on_non_object_body() {
        let response = keyed("data", "[1, 2, 3]");
        assert_eq!(response.data(), Some(json!([1, 2, 3])));

        let response = keyed("data", "42");
        assert_eq!(response.data(), Some(json!(42)));
    }

    #[test]
    fn test_data_never_fails_for_odd_keys() {
        let body = r#"{"a": {"b": 1}, "": {"": 2}}"#;
        for key in ["", ".", "..", "a.", ".b", "a..b", "a.b.c.d", "a.b."] {
            assert!(keyed(key, body).data().is_some(), "key {key:?}");
        }
        assert_eq!(keyed(".", body).data(), Some(json!(2)));
    }

    #[test]
    fn test_duration_measured_from_start() {
        let mut request = Request::get("/");
        request.stamp_start();
        let before = epoch_millis();
        let response = response_with(request.clone(), 200, "");
        let after = epoch_millis();

        let duration = response.duration().unwrap();
        let start = request.start().unwrap();
        assert!(duration >= before - start && duration <= after - start);
        assert!(duration >= 0);
    }

    #[test]
    fn test_duration_absent_without_start() {
        let response = response_with(Request::get("/"), 200, "");
        assert!(response.duration().is_none());
    }

    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Row {
        id: u32,
    }

    #[test]
    fn test_decode_model_stores_typed_value() {
        let request = Request::get("/").data_key("data.rows").model::<Vec<Row>>();
        let mut response = response_with(request, 200, r#"{"data": {"rows": [{"id": 1}, {"id": 2}]}}"#);

        response.decode_model().unwrap();

        let rows = response.model::<Vec<Row>>().unwrap();
        assert_eq!(rows, &vec![Row { id: 1 }, Row { id: 2 }]);
        assert!(response.model::<String>().is_none());
    }

    #[test]
    fn test_decode_model_fills_once() {
        let request = Request::get("/").model::<Row>();
        let mut response = response_with(request, 200, r#"{"id": 1}"#);
        response.decode_model().unwrap();

        let mut response = response.with_body(r#"{"id": "not a number"}"#);
        response.decode_model().unwrap();

        assert_eq!(response.model::<Row>(), Some(&Row { id: 1 }));
    }

    #[test]
    fn test_decode_model_shape_mismatch_is_error() {
        let request = Request::get("/").model::<Row>();
        let mut response = response_with(request, 200, r#"{"id": "x"}"#);

        let err = response.decode_model().unwrap_err();
        assert!(matches!(err, NetworkError::Decode(_)));
        assert!(response.model::<Row>().is_none());
    }

    #[test]
    fn test_decode_model_noop_cases() {
        // no model type
        let mut response = response_with(Request::get("/"), 200, r#"{"id": 1}"#);
        response.decode_model().unwrap();
        assert!(response.model::<Row>().is_none());

        // body is not JSON
        let mut response = response_with(Request::get("/").model::<Row>(), 200, "oops");
        response.decode_model().unwrap();
        assert!(response.model::<Row>().is_none());

        // scalar data
        let request = Request::get("/").data_key("count").model::<u32>();
        let mut response = response_with(request, 200, r#"{"count": 3}"#);
        response.decode_model().unwrap();
        assert!(response.model::<u32>().is_none());
    }

    #[test]
    fn test_decode_typed_convenience() {
        let response = keyed("data", r#"{"data": {"id": 5}}"#);
        assert_eq!(response.decode::<Row>().unwrap(), Row { id: 5 });

        let response = response_with(Request::get("/"), 200, "not json");
        assert!(matches!(
            response.decode::<Row>(),
            Err(NetworkError::Decode(_))
        ));
    }

    #[test]
    fn test_with_body_keeps_metadata() {
        let response = response_with(Request::get("/").data_key("x"), 201, "cipher");
        let response = response.with_body(r#"{"x": true}"#);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.data(), Some(json!(true)));
    }
}
