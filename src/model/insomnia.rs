//! Insomnia export model (YAML, `collection.insomnia.rest/5.0`).
//!
//! ```yaml
//! type: collection.insomnia.rest/5.0
//! name: My API
//! meta: { id: …, created: …, modified: … }
//! collection:
//!   - name: Auth
//!     meta: { id: …, created: …, modified: …, sortKey: … }
//!     children:
//!       - name: Login
//!         url: "{{ _.base_url }}/api/login"
//!         method: POST
//!         body: { mimeType: application/json, text: … }
//!         headers: [ { name: …, value: … } ]
//!       - name: Nested folder
//!         children: []
//! environment:
//!   data: { base_url: … }
//! ```
//!
//! Children carry no discriminant field. A child with both a non-empty `url`
//! and a non-empty `method` is a request; anything else is a folder. The rule
//! is applied once, while decoding, to produce [`Node`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::model::{INSOMNIA_EXPORT_TYPE, TreeStats};

/// A complete Insomnia export document.
///
/// The root may only hold folders. A request found at the root is wrapped in
/// a folder of the same name while decoding and its name is recorded in
/// `wrapped_requests`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ExportRecord")]
pub struct InsomniaExport {
    #[serde(rename = "type")]
    pub export_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    pub collection: Vec<Folder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(skip)]
    pub wrapped_requests: Vec<String>,
}

fn default_export_type() -> String {
    INSOMNIA_EXPORT_TYPE.to_string()
}

/// Document-level identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub id: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub modified: i64,
}

/// Identity and ordering of a folder or request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMeta {
    pub id: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub modified: i64,
    #[serde(rename = "sortKey", default)]
    pub sort_key: i64,
}

/// A named folder holding requests and sub-folders in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<FolderMeta>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub children: Vec<Node>,
}

/// A child of a folder: either a request leaf or a nested folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NodeRecord", into = "NodeRecord")]
pub enum Node {
    Request(InsomniaRequest),
    Folder(Folder),
}

/// A single HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct InsomniaRequest {
    pub name: String,
    pub meta: Option<FolderMeta>,
    pub url: String,
    pub method: String,
    pub body: Option<RequestBody>,
    pub headers: Vec<Header>,
}

/// Request payload as Insomnia stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(default)]
    pub text: String,
}

/// One request header. Order is significant and names may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Template variables, nested under `data` the way Insomnia expects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default, deserialize_with = "scalar_map")]
    pub data: BTreeMap<String, String>,
}

impl Environment {
    /// Variable holding the templated root endpoint.
    pub const BASE_URL: &'static str = "base_url";

    pub fn base_url(&self) -> Option<&str> {
        self.data.get(Self::BASE_URL).map(String::as_str)
    }
}

impl InsomniaExport {
    /// Count folders (at every depth) and requests.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        for folder in &self.collection {
            folder.tally(&mut stats);
        }
        stats
    }

    /// All requests in document order, depth first.
    pub fn requests(&self) -> Vec<&InsomniaRequest> {
        let mut out = Vec::new();
        for folder in &self.collection {
            folder.collect_requests(&mut out);
        }
        out
    }
}

impl Folder {
    fn tally(&self, stats: &mut TreeStats) {
        stats.folders += 1;
        for child in &self.children {
            match child {
                Node::Request(_) => stats.requests += 1,
                Node::Folder(sub) => sub.tally(stats),
            }
        }
    }

    fn collect_requests<'a>(&'a self, out: &mut Vec<&'a InsomniaRequest>) {
        for child in &self.children {
            match child {
                Node::Request(req) => out.push(req),
                Node::Folder(sub) => sub.collect_requests(out),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ExportRecord {
    #[serde(rename = "type", default = "default_export_type")]
    export_type: String,
    name: String,
    #[serde(default)]
    meta: Option<Meta>,
    #[serde(default, deserialize_with = "null_as_empty")]
    collection: Vec<Node>,
    #[serde(default)]
    environment: Option<Environment>,
}

impl From<ExportRecord> for InsomniaExport {
    fn from(record: ExportRecord) -> Self {
        let mut wrapped_requests = Vec::new();
        let collection = record
            .collection
            .into_iter()
            .map(|node| match node {
                Node::Folder(folder) => folder,
                Node::Request(request) => {
                    warn!(
                        name = request.name,
                        "top-level request has no folder; wrapping it in one of the same name"
                    );
                    wrapped_requests.push(request.name.clone());
                    Folder {
                        name: request.name.clone(),
                        meta: None,
                        children: vec![Node::Request(request)],
                    }
                }
            })
            .collect();
        Self {
            export_type: record.export_type,
            name: record.name,
            meta: record.meta,
            collection,
            environment: record.environment,
            wrapped_requests,
        }
    }
}

/// Flat on-disk shape shared by requests and folders.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeRecord {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<FolderMeta>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<RequestBody>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    headers: Vec<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<Node>>,
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        if !record.url.is_empty() && !record.method.is_empty() {
            return Node::Request(InsomniaRequest {
                name: record.name,
                meta: record.meta,
                url: record.url,
                method: record.method,
                body: record.body,
                headers: record.headers,
            });
        }
        if !record.url.is_empty() || !record.method.is_empty() {
            debug!(
                name = record.name,
                url = record.url,
                method = record.method,
                "node lacks url or method; treating as folder"
            );
        }
        Node::Folder(Folder {
            name: record.name,
            meta: record.meta,
            children: record.children.unwrap_or_default(),
        })
    }
}

impl From<Node> for NodeRecord {
    fn from(node: Node) -> Self {
        match node {
            Node::Request(req) => NodeRecord {
                name: req.name,
                meta: req.meta,
                url: req.url,
                method: req.method,
                body: req.body,
                headers: req.headers,
                children: None,
            },
            Node::Folder(folder) => NodeRecord {
                name: folder.name,
                meta: folder.meta,
                url: String::new(),
                method: String::new(),
                body: None,
                headers: Vec::new(),
                children: Some(folder.children),
            },
        }
    }
}

/// Treat an explicit YAML `~`/null list the same as a missing one.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept any scalar environment value, rendering it as a string.
fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_yaml::Value>>::deserialize(deserializer)?;
    let mut out = BTreeMap::new();
    for (key, value) in raw.unwrap_or_default() {
        let rendered = match value {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Null => String::new(),
            other => {
                debug!(key, ?other, "skipping non-scalar environment value");
                continue;
            }
        };
        out.insert(key, rendered);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_with_url_and_method_is_request() {
        let yaml = r#"
name: Login
url: https://api.example.com/login
method: POST
headers:
  - name: Accept
    value: application/json
  - name: Accept
    value: text/plain
"#;
        let node: Node = serde_yaml::from_str(yaml).expect("decode node");
        let Node::Request(req) = node else {
            panic!("expected request, got {node:?}");
        };
        assert_eq!(req.method, "POST");
        assert_eq!(req.headers.len(), 2);
        assert_eq!(req.headers[1].value, "text/plain");
    }

    #[test]
    fn child_missing_method_is_folder_and_keeps_children() {
        let yaml = r#"
name: Half request
url: https://api.example.com/login
children:
  - name: Inner
    url: /inner
    method: GET
"#;
        let node: Node = serde_yaml::from_str(yaml).expect("decode node");
        let Node::Folder(folder) = node else {
            panic!("expected folder, got {node:?}");
        };
        assert_eq!(folder.name, "Half request");
        assert_eq!(folder.children.len(), 1);
        assert!(matches!(folder.children[0], Node::Request(_)));
    }

    #[test]
    fn child_missing_url_is_folder() {
        let node: Node = serde_yaml::from_str("name: Only method\nmethod: GET\n").expect("decode");
        assert!(matches!(node, Node::Folder(ref f) if f.children.is_empty()));
    }

    #[test]
    fn empty_folder_serializes_children_key() {
        let node = Node::Folder(Folder {
            name: "Empty".to_string(),
            meta: None,
            children: vec![],
        });
        let yaml = serde_yaml::to_string(&node).expect("encode");
        assert!(yaml.contains("children: []"), "got:\n{yaml}");
        assert!(!yaml.contains("url"));
    }

    #[test]
    fn environment_accepts_non_string_scalars() {
        let env: Environment =
            serde_yaml::from_str("data:\n  base_url: http://localhost\n  port: 3000\n  debug: true\n")
                .expect("decode environment");
        assert_eq!(env.base_url(), Some("http://localhost"));
        assert_eq!(env.data["port"], "3000");
        assert_eq!(env.data["debug"], "true");
    }

    #[test]
    fn stats_count_nested_folders_and_requests() {
        let yaml = r#"
name: Doc
collection:
  - name: A
    children:
      - name: r1
        url: /one
        method: GET
      - name: B
        children:
          - name: r2
            url: /two
            method: DELETE
  - name: C
"#;
        let export: InsomniaExport = serde_yaml::from_str(yaml).expect("decode export");
        let stats = export.stats();
        assert_eq!(stats.folders, 3);
        assert_eq!(stats.requests, 2);
        let names: Vec<_> = export.requests().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["r1", "r2"]);
        assert_eq!(export.export_type, INSOMNIA_EXPORT_TYPE);
    }
}
