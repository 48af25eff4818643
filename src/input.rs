//! Raw inputs of one invocation: request parameters and the process environment.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ParamsError;

/// A request parameter as sent by the platform or a configuring caller.
///
/// `AllowedCallers` may arrive as a single number or a list, `Options` as a
/// single URL, a list, or a digits -> URL map. Downstream code never sees the
/// raw shape: the resolver turns it into `AllowedCallers` / `OptionMap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl ParamValue {
    /// Scalar view: the text itself, or the first list entry.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(text) => Some(text),
            ParamValue::List(items) => items.first().map(String::as_str),
            ParamValue::Map(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    /// Builder-style insert of a text value, handy for fixtures.
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.insert(name, ParamValue::Text(value.to_string()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// True when the parameter was sent at all, even as an empty string.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_text)
    }

    /// Text value with the empty string treated as absent.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.text(name).filter(|value| !value.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Later parameters win over earlier ones of the same name.
    pub fn merge(&mut self, other: Params) {
        self.0.extend(other.0);
    }

    /// Decodes `application/x-www-form-urlencoded` pairs (query string or body).
    /// Repeated keys and `key[]` keys collect into a list under the bare key.
    pub fn from_urlencoded(input: &[u8]) -> Self {
        let mut params = Params::new();
        for (key, value) in url::form_urlencoded::parse(input) {
            let (name, forced_list) = match key.strip_suffix("[]") {
                Some(bare) => (bare.to_string(), true),
                None => (key.into_owned(), false),
            };
            let value = value.into_owned();
            let merged = match params.0.remove(&name) {
                None if forced_list => ParamValue::List(vec![value]),
                None => ParamValue::Text(value),
                Some(ParamValue::Text(first)) => ParamValue::List(vec![first, value]),
                Some(ParamValue::List(mut items)) => {
                    items.push(value);
                    ParamValue::List(items)
                }
                Some(ParamValue::Map(_)) => ParamValue::Text(value),
            };
            params.0.insert(name, merged);
        }
        params
    }

    /// Decodes a JSON object body. Nested values are flattened to their text.
    pub fn from_json(body: &[u8]) -> Result<Self, ParamsError> {
        let object = match serde_json::from_slice::<Value>(body)? {
            Value::Object(object) => object,
            _ => return Err(ParamsError::NotAnObject),
        };
        let mut params = Params::new();
        for (name, value) in object {
            let value = match value {
                Value::Null => continue,
                Value::Array(items) => ParamValue::List(items.iter().filter_map(scalar_text).collect()),
                Value::Object(entries) => ParamValue::Map(
                    entries
                        .iter()
                        .filter_map(|(key, value)| scalar_text(value).map(|text| (key.clone(), text)))
                        .collect(),
                ),
                scalar => match scalar_text(&scalar) {
                    Some(text) => ParamValue::Text(text),
                    None => continue,
                },
            };
            params.0.insert(name, value);
        }
        Ok(params)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Snapshot of environment overrides, taken once per process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment(BTreeMap<String, String>);

impl Environment {
    pub fn from_process() -> Self {
        Self(std::env::vars().collect())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencoded_keeps_empty_values_present() {
        let params = Params::from_urlencoded(b"Dial=&Digits=12");
        assert!(params.contains("Dial"));
        assert_eq!(params.text("Dial"), Some(""));
        assert_eq!(params.non_empty("Dial"), None);
        assert_eq!(params.non_empty("Digits"), Some("12"));
    }

    #[test]
    fn urlencoded_collects_repeated_and_bracketed_keys() {
        let params = Params::from_urlencoded(
            b"AllowedCallers=%2B14155550100&AllowedCallers=5551234&Extra[]=x&Options%5B2%5D=https%3A%2F%2Fa",
        );
        assert_eq!(
            params.get("AllowedCallers"),
            Some(&ParamValue::List(vec!["+14155550100".into(), "5551234".into()]))
        );
        assert_eq!(params.get("Extra"), Some(&ParamValue::List(vec!["x".into()])));
        assert_eq!(params.text("Options[2]"), Some("https://a"));
    }

    #[test]
    fn json_body_maps_shapes_to_variants() {
        let params = Params::from_json(
            br#"{"Options":{"1":"https://one","2":"https://two"},"AllowedCallers":["1",2],"Timeout":30,"Skip":null}"#,
        )
        .unwrap();
        match params.get("Options") {
            Some(ParamValue::Map(map)) => assert_eq!(map.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            params.get("AllowedCallers"),
            Some(&ParamValue::List(vec!["1".into(), "2".into()]))
        );
        assert_eq!(params.text("Timeout"), Some("30"));
        assert!(!params.contains("Skip"));
    }

    #[test]
    fn json_body_must_be_an_object() {
        assert!(matches!(Params::from_json(b"[1,2]"), Err(ParamsError::NotAnObject)));
        assert!(matches!(Params::from_json(b"{oops"), Err(ParamsError::InvalidJson(_))));
    }

    #[test]
    fn merge_overwrites_same_name() {
        let mut params = Params::new().with("Message", "query");
        params.merge(Params::new().with("Message", "body"));
        assert_eq!(params.text("Message"), Some("body"));
    }
}
