use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A decoded model, stored type-erased on a [`Response`](crate::Response).
///
/// Use [`Response::model`](crate::Response::model) to get it back as `&T`.
pub type Model = Arc<dyn Any + Send + Sync>;

type DecodeFn = dyn Fn(Value) -> Result<Model, serde_json::Error> + Send + Sync;

/// Decode target attached to a request.
///
/// The target shape is chosen where the request is built; the pipeline only
/// knows that it can turn a JSON value into a [`Model`].
///
/// ```ignore
/// let request = Request::get("/users").data_key("data.rows").model::<Vec<User>>();
/// ```
#[derive(Clone)]
pub struct ModelType {
    name: &'static str,
    decode: Arc<DecodeFn>,
}

impl ModelType {
    /// Decode capability for `T`.
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        Self {
            name: std::any::type_name::<T>(),
            decode: Arc::new(|value| {
                let model: T = serde_json::from_value(value)?;
                Ok(Arc::new(model) as Model)
            }),
        }
    }

    /// Rust type name of the decode target (diagnostics only).
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn decode(&self, value: Value) -> Result<Model, serde_json::Error> {
        (self.decode)(value)
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
