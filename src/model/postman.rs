//! Postman collection model (JSON, schema v2.1.0).
//!
//! ```json
//! {
//!   "info": { "name": "My API", "schema": "https://schema.getpostman.com/…" },
//!   "item": [
//!     { "name": "Auth", "item": [
//!       { "name": "Login", "request": {
//!         "method": "POST",
//!         "header": [ { "key": "Accept", "value": "application/json" } ],
//!         "body": { "mode": "raw", "raw": "…", "options": { "raw": { "language": "json" } } },
//!         "url": { "raw": "{{endpoint}}/api/login", "host": ["{{endpoint}}"], "path": ["api", "login"] }
//!       } }
//!     ] }
//!   ],
//!   "variable": [ { "key": "endpoint", "value": "https://api.test" } ]
//! }
//! ```
//!
//! An item with a `request` is a leaf; any other item is a group whose
//! (possibly empty) `item` list holds its children.

use serde::{Deserialize, Deserializer, Serialize};

use crate::model::{POSTMAN_SCHEMA_V2_1, TreeStats};

/// A complete Postman collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostmanCollection {
    pub info: Info,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub item: Vec<Item>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub variable: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub schema: String,
}

impl Info {
    /// Info block for a generated v2.1 collection.
    pub fn v2_1(name: &str) -> Self {
        Self {
            name: name.to_string(),
            schema: POSTMAN_SCHEMA_V2_1.to_string(),
        }
    }
}

/// A collection entry: a request leaf or a group of further items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ItemRecord", into = "ItemRecord")]
pub enum Item {
    Request { name: String, request: PostmanRequest },
    Group { name: String, item: Vec<Item> },
}

impl Item {
    pub fn name(&self) -> &str {
        match self {
            Item::Request { name, .. } | Item::Group { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PostmanRequest {
    #[serde(default)]
    pub method: String,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub header: Vec<PostmanHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<PostmanBody>,
    #[serde(default)]
    pub url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostmanHeader {
    #[serde(default, alias = "name", alias = "Name")]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Request body. Generated bodies are always raw JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostmanBody {
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub raw: String,
    #[serde(default)]
    pub options: BodyOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BodyOptions {
    #[serde(default)]
    pub raw: RawOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawOptions {
    #[serde(default)]
    pub language: String,
}

impl PostmanBody {
    pub const RAW_MODE: &'static str = "raw";
    pub const JSON_LANGUAGE: &'static str = "json";

    /// A raw body annotated as JSON, whatever the payload really is.
    pub fn raw_json(text: &str) -> Self {
        Self {
            mode: Self::RAW_MODE.to_string(),
            raw: text.to_string(),
            options: BodyOptions {
                raw: RawOptions {
                    language: Self::JSON_LANGUAGE.to_string(),
                },
            },
        }
    }
}

fn default_mode() -> String {
    PostmanBody::RAW_MODE.to_string()
}

/// Structured URL. `raw` is authoritative whenever it is present.
///
/// On input the whole URL may also be a bare string, and `host`/`path` may
/// each be a single string instead of a list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "UrlRepr")]
pub struct Url {
    pub raw: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub port: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
}

impl Url {
    /// URL carrying only its raw form, with no decomposition.
    pub fn raw_only(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            ..Self::default()
        }
    }

    /// True when nothing beyond the raw string is known.
    pub fn is_raw_only(&self) -> bool {
        self.protocol.is_empty()
            && self.host.is_empty()
            && self.port.is_empty()
            && self.path.is_empty()
    }
}

/// A collection-level variable. Values may be any JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Variable {
    /// Value rendered as plain text; `null` becomes an empty string.
    pub fn value_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl PostmanCollection {
    /// Count groups (at every depth) and requests.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        tally(&self.item, &mut stats);
        stats
    }

    /// All requests in document order, depth first, with their item names.
    pub fn requests(&self) -> Vec<(&str, &PostmanRequest)> {
        let mut out = Vec::new();
        collect_requests(&self.item, &mut out);
        out
    }
}

fn tally(items: &[Item], stats: &mut TreeStats) {
    for item in items {
        match item {
            Item::Request { .. } => stats.requests += 1,
            Item::Group { item, .. } => {
                stats.folders += 1;
                tally(item, stats);
            }
        }
    }
}

fn collect_requests<'a>(items: &'a [Item], out: &mut Vec<(&'a str, &'a PostmanRequest)>) {
    for item in items {
        match item {
            Item::Request { name, request } => out.push((name, request)),
            Item::Group { item, .. } => collect_requests(item, out),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemRecord {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request: Option<PostmanRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    item: Option<Vec<Item>>,
}

impl From<ItemRecord> for Item {
    fn from(record: ItemRecord) -> Self {
        match record.request {
            Some(request) => Item::Request {
                name: record.name,
                request,
            },
            None => Item::Group {
                name: record.name,
                item: record.item.unwrap_or_default(),
            },
        }
    }
}

impl From<Item> for ItemRecord {
    fn from(item: Item) -> Self {
        match item {
            Item::Request { name, request } => ItemRecord {
                name,
                request: Some(request),
                item: None,
            },
            Item::Group { name, item } => ItemRecord {
                name,
                request: None,
                item: Some(item),
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UrlRepr {
    Raw(String),
    Structured {
        #[serde(default)]
        raw: String,
        #[serde(default)]
        protocol: String,
        #[serde(default, deserialize_with = "one_or_many")]
        host: Vec<String>,
        #[serde(default)]
        port: String,
        #[serde(default, deserialize_with = "one_or_many")]
        path: Vec<String>,
    },
}

impl From<UrlRepr> for Url {
    fn from(repr: UrlRepr) -> Self {
        match repr {
            UrlRepr::Raw(raw) => Url::raw_only(&raw),
            UrlRepr::Structured {
                raw,
                protocol,
                host,
                port,
                path,
            } => Url {
                raw,
                protocol,
                host,
                port,
                path,
            },
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) if s.is_empty() => Vec::new(),
        Some(OneOrMany::One(s)) => s.split('.').map(str::to_string).collect(),
        Some(OneOrMany::Many(v)) => v,
    })
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
