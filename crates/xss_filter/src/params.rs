//! Request parameters.
//!
//! A reflected attack can only use data the attacker put into the request,
//! so every check compares against the parameters of the request that loaded
//! the page: the query string and, for POST, the form body.

use crate::detector::Detector;
use crate::error::ExtractionError;
use networking::upload::rewind;
use networking::HttpChannel;
use std::io::Read;
use url::Url;

/// A single request parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

/// Name/value pairs from the query string and POST body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.push(Parameter {
            name: name.into(),
            value: value.into(),
        });
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate in request order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }
}

impl<K, V> Extend<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.push(name, value);
        }
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

/// Gather the parameters of the request that loaded `uri`.
///
/// Body problems are logged and leave the query string parameters alone;
/// extraction itself never fails.
pub fn extract_parameters(
    uri: &Url,
    channel: Option<&dyn HttpChannel>,
    detector: &dyn Detector,
) -> ParameterSet {
    let mut params = ParameterSet::new();
    detector.parse_uri(uri, &mut params);

    let Some(channel) = channel else {
        tracing::debug!(target: "xss", "No channel for {}, using query parameters only", uri);
        return params;
    };

    if channel.is_post() {
        match read_post_body(channel) {
            Ok(body) => detector.parse_post(&body, &mut params),
            Err(err) => {
                tracing::warn!(target: "xss", "Ignoring POST parameters of {}: {}", uri, err);
            }
        }
    }

    tracing::debug!(target: "xss", "Collected {} parameters for {}", params.len(), uri);
    params
}

/// Read the whole upload stream of `channel` from its first byte.
///
/// The stream must deliver exactly as many bytes as it announced. Anything
/// less is a [`ExtractionError::ShortRead`] and the partial body is dropped.
pub fn read_post_body(channel: &dyn HttpChannel) -> Result<Vec<u8>, ExtractionError> {
    let mut stream = channel
        .upload_stream()
        .ok_or(ExtractionError::NoUploadStream)?;
    rewind(&mut stream)?;

    let expected = stream.available()?;
    let capacity = usize::try_from(expected).map_err(|_| ExtractionError::TooLarge(expected))?;

    let mut body = Vec::new();
    body.try_reserve_exact(capacity)
        .map_err(|_| ExtractionError::TooLarge(expected))?;

    let read = stream.by_ref().take(expected).read_to_end(&mut body)? as u64;
    if read != expected {
        return Err(ExtractionError::ShortRead { expected, read });
    }

    Ok(body)
}
