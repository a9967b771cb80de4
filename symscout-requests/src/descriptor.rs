//! Request descriptors and the scalar-or-sequence batch normalizer.
//!
//! Callers pass each input (url, params, form, json body, key) either as a
//! single value or as a sequence. `BatchSpec::build` broadcasts length-1
//! inputs to the length of the longest input; an input whose length is
//! neither 1 nor the batch length is a configuration error. A missing input
//! defaults to a single `None` before broadcasting.

use crate::error::RequestError;
use reqwest::Method;
use serde_json::Value;
use std::collections::BTreeMap;

/// Query or form parameters for one request.
pub type Params = BTreeMap<String, String>;

/// How to decode a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseKind {
    #[default]
    Json,
    Text,
    Bytes,
}

/// One outbound HTTP call. Immutable once the batch is built.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub params: Option<Params>,
    pub form: Option<Params>,
    pub json: Option<Value>,
    /// Opaque identifier addressing this item's slot in the merged result.
    pub key: Option<String>,
    pub kind: ResponseKind,
}

/// A scalar-or-sequence input field.
#[derive(Debug, Clone)]
pub enum Field<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> Field<T> {
    pub fn len(&self) -> usize {
        match self {
            Field::One(_) => 1,
            Field::Many(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replicate a scalar to length `n`; pass a matching sequence through.
    fn broadcast(self, n: usize, name: &str) -> Result<Vec<T>, RequestError> {
        match self {
            Field::One(value) => Ok(vec![value; n]),
            Field::Many(values) if values.len() == n => Ok(values),
            Field::Many(values) => Err(RequestError::Configuration(format!(
                "input '{name}' has length {} but the batch has length {n}; \
                 inputs must be scalar or match the longest input",
                values.len()
            ))),
        }
    }
}

impl From<String> for Field<String> {
    fn from(value: String) -> Self {
        Field::One(value)
    }
}

impl From<&str> for Field<String> {
    fn from(value: &str) -> Self {
        Field::One(value.to_string())
    }
}

impl From<Params> for Field<Params> {
    fn from(value: Params) -> Self {
        Field::One(value)
    }
}

impl From<Value> for Field<Value> {
    fn from(value: Value) -> Self {
        Field::One(value)
    }
}

impl<T> From<Vec<T>> for Field<T> {
    fn from(values: Vec<T>) -> Self {
        Field::Many(values)
    }
}

/// A missing input becomes a single `None` placeholder.
fn lift<T>(field: Option<Field<T>>) -> Field<Option<T>> {
    match field {
        None => Field::One(None),
        Some(Field::One(value)) => Field::One(Some(value)),
        Some(Field::Many(values)) => Field::Many(values.into_iter().map(Some).collect()),
    }
}

/// Batch inputs before normalization.
#[derive(Debug, Clone)]
pub struct BatchSpec {
    method: Method,
    urls: Field<String>,
    params: Option<Field<Params>>,
    forms: Option<Field<Params>>,
    json_bodies: Option<Field<Value>>,
    keys: Option<Field<String>>,
    kind: ResponseKind,
}

impl BatchSpec {
    /// A GET batch expecting json responses.
    pub fn get(urls: impl Into<Field<String>>) -> Self {
        Self {
            method: Method::GET,
            urls: urls.into(),
            params: None,
            forms: None,
            json_bodies: None,
            keys: None,
            kind: ResponseKind::Json,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn params(mut self, params: impl Into<Field<Params>>) -> Self {
        self.params = Some(params.into());
        self
    }

    pub fn forms(mut self, forms: impl Into<Field<Params>>) -> Self {
        self.forms = Some(forms.into());
        self
    }

    pub fn json_bodies(mut self, bodies: impl Into<Field<Value>>) -> Self {
        self.json_bodies = Some(bodies.into());
        self
    }

    pub fn keys(mut self, keys: impl Into<Field<String>>) -> Self {
        self.keys = Some(keys.into());
        self
    }

    pub fn kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Normalize the inputs into an aligned batch of descriptors.
    pub fn build(self) -> Result<Batch, RequestError> {
        let urls = self.urls;
        let params = lift(self.params);
        let forms = lift(self.forms);
        let json_bodies = lift(self.json_bodies);
        let keys = lift(self.keys);

        let n = [
            urls.len(),
            params.len(),
            forms.len(),
            json_bodies.len(),
            keys.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(1);

        let urls = urls.broadcast(n, "url")?;
        let params = params.broadcast(n, "params")?;
        let forms = forms.broadcast(n, "form")?;
        let json_bodies = json_bodies.broadcast(n, "json")?;
        let keys = keys.broadcast(n, "key")?;

        let mut descriptors = Vec::with_capacity(n);
        for ((((url, params), form), json), key) in urls
            .into_iter()
            .zip(params)
            .zip(forms)
            .zip(json_bodies)
            .zip(keys)
        {
            descriptors.push(RequestDescriptor {
                method: self.method.clone(),
                url,
                params,
                form,
                json,
                key,
                kind: self.kind,
            });
        }

        Ok(Batch { descriptors })
    }
}

/// An aligned sequence of request descriptors submitted as one run.
#[derive(Debug, Clone)]
pub struct Batch {
    descriptors: Vec<RequestDescriptor>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptors(&self) -> &[RequestDescriptor] {
        &self.descriptors
    }

    /// True when every descriptor carries a result key.
    pub fn all_keyed(&self) -> bool {
        !self.descriptors.is_empty() && self.descriptors.iter().all(|d| d.key.is_some())
    }
}

impl IntoIterator for Batch {
    type Item = RequestDescriptor;
    type IntoIter = std::vec::IntoIter<RequestDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.into_iter()
    }
}
