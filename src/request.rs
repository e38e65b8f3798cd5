//! Wire shapes for navigation requests.
//!
//! A request is either a bare route name, a `{"route": name, "data": value}`
//! object, or an ordered array of either. `RouteRequest::parse` accepts the
//! JSON form; the `From` impls cover native Rust call sites.

use serde_json::{Value, json};

use crate::error::NavigationError;

/// A single item of a navigation request: a route name with optional
/// associated data.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteItem {
    /// A route without associated data.
    Name(String),

    /// A route carrying an opaque data value, passed to the view factory and
    /// used for cache keying.
    WithData { name: String, data: Value },
}

impl RouteItem {
    /// Create an item carrying associated data.
    pub fn with_data(name: impl Into<String>, data: impl Into<Value>) -> Self {
        RouteItem::WithData {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RouteItem::Name(name) => name,
            RouteItem::WithData { name, .. } => name,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            RouteItem::Name(_) => None,
            RouteItem::WithData { data, .. } => Some(data),
        }
    }

    fn parse(value: &Value) -> Result<Self, NavigationError> {
        match value {
            Value::String(name) => Ok(RouteItem::Name(name.clone())),
            Value::Object(map) => {
                let name = map
                    .get("route")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        NavigationError::MalformedRequest(
                            "object item requires a string 'route' field".into(),
                        )
                    })?;
                match map.get("data") {
                    Some(data) => Ok(RouteItem::with_data(name, data.clone())),
                    None => Ok(RouteItem::Name(name.to_string())),
                }
            }
            other => Err(NavigationError::MalformedRequest(format!(
                "item must be a route name or a {{route, data}} object, got {other}"
            ))),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            RouteItem::Name(name) => json!(name),
            RouteItem::WithData { name, data } => json!({ "route": name, "data": data }),
        }
    }
}

impl From<&str> for RouteItem {
    fn from(name: &str) -> Self {
        RouteItem::Name(name.to_string())
    }
}

impl From<String> for RouteItem {
    fn from(name: String) -> Self {
        RouteItem::Name(name)
    }
}

/// An ordered sequence of route items, root first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteRequest {
    items: Vec<RouteItem>,
}

impl RouteRequest {
    /// Parse the JSON wire shape: a string, a `{route, data}` object, or an
    /// array of either. Nested arrays and any other shape are malformed.
    pub fn parse(value: &Value) -> Result<Self, NavigationError> {
        let items = match value {
            Value::Array(values) => values
                .iter()
                .map(RouteItem::parse)
                .collect::<Result<Vec<_>, _>>()?,
            other => vec![RouteItem::parse(other)?],
        };
        Ok(RouteRequest { items })
    }

    /// Serialize back into the wire shape accepted by `parse`.
    pub fn to_value(&self) -> Value {
        Value::Array(self.items.iter().map(RouteItem::to_value).collect())
    }

    pub fn items(&self) -> &[RouteItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<RouteItem> for RouteRequest {
    fn from(item: RouteItem) -> Self {
        RouteRequest { items: vec![item] }
    }
}

impl From<&str> for RouteRequest {
    fn from(name: &str) -> Self {
        RouteItem::from(name).into()
    }
}

impl From<String> for RouteRequest {
    fn from(name: String) -> Self {
        RouteItem::from(name).into()
    }
}

impl From<Vec<RouteItem>> for RouteRequest {
    fn from(items: Vec<RouteItem>) -> Self {
        RouteRequest { items }
    }
}

impl From<&[&str]> for RouteRequest {
    fn from(names: &[&str]) -> Self {
        RouteRequest {
            items: names.iter().map(|name| RouteItem::from(*name)).collect(),
        }
    }
}

impl<const N: usize> From<[&str; N]> for RouteRequest {
    fn from(names: [&str; N]) -> Self {
        RouteRequest::from(&names[..])
    }
}

impl FromIterator<RouteItem> for RouteRequest {
    fn from_iter<I: IntoIterator<Item = RouteItem>>(iter: I) -> Self {
        RouteRequest {
            items: iter.into_iter().collect(),
        }
    }
}

/// Target selector for `bring_to_view`: a stack index, the first entry with a
/// given name, or the first entry matching a name plus associated data.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewTarget {
    Index(usize),
    Name(String),
    NameAndData { name: String, data: Value },
}

impl ViewTarget {
    pub fn with_data(name: impl Into<String>, data: impl Into<Value>) -> Self {
        ViewTarget::NameAndData {
            name: name.into(),
            data: data.into(),
        }
    }
}

impl From<usize> for ViewTarget {
    fn from(index: usize) -> Self {
        ViewTarget::Index(index)
    }
}

impl From<&str> for ViewTarget {
    fn from(name: &str) -> Self {
        ViewTarget::Name(name.to_string())
    }
}

impl From<RouteItem> for ViewTarget {
    fn from(item: RouteItem) -> Self {
        match item {
            RouteItem::Name(name) => ViewTarget::Name(name),
            RouteItem::WithData { name, data } => ViewTarget::NameAndData { name, data },
        }
    }
}
