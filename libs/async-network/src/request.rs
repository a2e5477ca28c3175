use crate::error::{InvalidUrlKind, NetworkError};
use crate::model::ModelType;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Current wall-clock time in epoch milliseconds.
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Wire-ready request handed to the [`Transport`](crate::Transport).
///
/// Produced from a [`Request`] by [`Networking::send`](crate::Networking::send)
/// and passed through the [`Encryptor`](crate::Encryptor), which may rewrite
/// any field.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RawRequest {
    /// Body as text, if there is a body and it is valid UTF-8.
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        self.body
            .as_deref()
            .and_then(|body| std::str::from_utf8(body).ok())
    }
}

/// Declarative description of one HTTP call.
///
/// `url` is either absolute or relative to the orchestrator's base URL.
/// Parameters are an opaque JSON value: methods without a body put a JSON
/// object into the query string, every other method sends it as a JSON body
/// (or sends [`params_string`](Self::params_string) verbatim when set).
///
/// # Example
///
/// ```ignore
/// let request = Request::post("/orders")
///     .header("x-request-id", "42")
///     .params(json!({"sku": "A-1", "qty": 2}))
///     .data_key("data.order")
///     .model::<Order>()
///     .print_log(true);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct Request {
    url: String,
    method: Method,
    headers: BTreeMap<String, String>,
    params: Option<Value>,
    params_string: Option<String>,
    print_log: bool,
    data_key: Option<String>,
    model_type: Option<ModelType>,
    start: Option<i64>,
    raw: Option<RawRequest>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            params: None,
            params_string: None,
            print_log: false,
            data_key: None,
            model_type: None,
            start: None,
            raw: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Set a header; a later call with the same name replaces the value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set several headers at once.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the parameter payload.
    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Set the parameter payload from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::ParamsEncode` if `params` cannot be represented as JSON.
    pub fn json<T: Serialize>(mut self, params: &T) -> Result<Self, NetworkError> {
        let value =
            serde_json::to_value(params).map_err(|e| NetworkError::ParamsEncode(Box::new(e)))?;
        self.params = Some(value);
        Ok(self)
    }

    /// Send this exact string as the body instead of encoding `params`.
    pub fn params_string(mut self, body: impl Into<String>) -> Self {
        self.params_string = Some(body.into());
        self
    }

    /// Emit a curl transcript for this call.
    pub fn print_log(mut self, enabled: bool) -> Self {
        self.print_log = enabled;
        self
    }

    /// Dotted path (e.g. `data.rows`) used by [`Response::data`](crate::Response::data).
    pub fn data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    /// Decode successful responses into `T` (see [`Response::model`](crate::Response::model)).
    pub fn model<T>(self) -> Self
    where
        T: serde::de::DeserializeOwned + Send + Sync + 'static,
    {
        self.model_type(ModelType::of::<T>())
    }

    pub fn model_type(mut self, model_type: ModelType) -> Self {
        self.model_type = Some(model_type);
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn header_fields(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn params_value(&self) -> Option<&Value> {
        self.params.as_ref()
    }

    /// Text form of the parameters: the explicit parameter string if set,
    /// else compact JSON of `params`, else empty.
    #[must_use]
    pub fn params_text(&self) -> String {
        match (&self.params_string, &self.params) {
            (Some(body), _) => body.clone(),
            (None, Some(params)) => params.to_string(),
            (None, None) => String::new(),
        }
    }

    #[must_use]
    pub fn is_print_log(&self) -> bool {
        self.print_log
    }

    #[must_use]
    pub fn data_key_path(&self) -> Option<&str> {
        self.data_key.as_deref()
    }

    #[must_use]
    pub fn decode_target(&self) -> Option<&ModelType> {
        self.model_type.as_ref()
    }

    /// Send start time in epoch milliseconds; set by the orchestrator.
    #[must_use]
    pub fn start(&self) -> Option<i64> {
        self.start
    }

    /// The raw request actually handed to the transport; set by the orchestrator.
    #[must_use]
    pub fn raw_request(&self) -> Option<&RawRequest> {
        self.raw.as_ref()
    }

    pub(crate) fn stamp_start(&mut self) {
        self.start = Some(epoch_millis());
    }

    pub(crate) fn set_raw_request(&mut self, raw: RawRequest) {
        self.raw = Some(raw);
    }

    /// Resolve against `base_url` and build the wire-ready request.
    ///
    /// # Errors
    ///
    /// - `InvalidUrl` / `InvalidScheme` if the resolved URL is not an absolute
    ///   `http`/`https` URL
    /// - `InvalidHeaderName` / `InvalidHeaderValue` for malformed headers
    /// - `ParamsEncode` if query parameters cannot be encoded
    pub fn to_raw(&self, base_url: &str) -> Result<RawRequest, NetworkError> {
        let mut url = resolve_url(base_url, &self.url);

        let body = if carries_body(&self.method) {
            self.body_bytes()?
        } else {
            if let Some(Value::Object(params)) = &self.params
                && !params.is_empty()
            {
                let pairs: Vec<(&str, String)> = params
                    .iter()
                    .map(|(key, value)| (key.as_str(), query_value(value)))
                    .collect();
                let query = serde_urlencoded::to_string(&pairs)
                    .map_err(|e| NetworkError::ParamsEncode(Box::new(e)))?;
                url.push(if url.contains('?') { '&' } else { '?' });
                url.push_str(&query);
            }
            None
        };

        let uri = validate_url(&url)?;

        let mut headers = HeaderMap::with_capacity(self.headers.len() + 1);
        for (name, value) in &self.headers {
            headers.append(
                HeaderName::try_from(name.as_str())?,
                HeaderValue::try_from(value.as_str())?,
            );
        }
        if body.is_some() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(RawRequest {
            method: self.method.clone(),
            uri,
            headers,
            body,
        })
    }

    fn body_bytes(&self) -> Result<Option<Bytes>, NetworkError> {
        if let Some(body) = &self.params_string {
            return Ok(Some(Bytes::from(body.clone())));
        }
        match &self.params {
            Some(params) => {
                let encoded = serde_json::to_vec(params)
                    .map_err(|e| NetworkError::ParamsEncode(Box::new(e)))?;
                Ok(Some(Bytes::from(encoded)))
            }
            None => Ok(None),
        }
    }
}

/// Methods whose parameters travel in the query string rather than the body.
fn carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::DELETE)
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_absolute(url: &str) -> bool {
    url.parse::<Uri>()
        .is_ok_and(|uri| uri.scheme().is_some() && uri.authority().is_some())
}

/// Join a relative `url` onto `base_url` with exactly one `/` between them.
fn resolve_url(base_url: &str, url: &str) -> String {
    if base_url.is_empty() || is_absolute(url) {
        return url.to_owned();
    }
    let base = base_url.trim_end_matches('/');
    let path = url.trim_start_matches('/');
    if path.is_empty() {
        base.to_owned()
    } else {
        format!("{base}/{path}")
    }
}

fn validate_url(url: &str) -> Result<Uri, NetworkError> {
    let uri: Uri = url
        .parse()
        .map_err(|e: http::uri::InvalidUri| NetworkError::InvalidUrl {
            url: url.to_owned(),
            kind: InvalidUrlKind::ParseError,
            reason: e.to_string(),
        })?;

    let Some(scheme) = uri.scheme_str() else {
        return Err(NetworkError::InvalidUrl {
            url: url.to_owned(),
            kind: InvalidUrlKind::MissingScheme,
            reason: "missing scheme (relative URL without a base URL?)".to_owned(),
        });
    };

    if scheme != "http" && scheme != "https" {
        return Err(NetworkError::InvalidScheme {
            scheme: scheme.to_owned(),
            reason: "only http:// and https:// schemes are supported".to_owned(),
        });
    }

    if uri.authority().is_none() {
        return Err(NetworkError::InvalidUrl {
            url: url.to_owned(),
            kind: InvalidUrlKind::MissingAuthority,
            reason: "missing host/authority".to_owned(),
        });
    }

    Ok(uri)
}
