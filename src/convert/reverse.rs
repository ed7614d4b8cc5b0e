//! Postman → Insomnia.
//!
//! Insomnia wants an id, timestamps and a sort key on every folder and
//! request. Postman carries none of these, so they are synthesized from the
//! [`RunContext`]: one fresh id per node, one shared timestamp and sort key
//! for the whole run.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::model::insomnia::{
    Environment, Folder, Header, InsomniaExport, InsomniaRequest, Node, RequestBody,
};
use crate::model::postman::{Item, PostmanCollection, PostmanRequest, Variable};
use crate::model::{INSOMNIA_EXPORT_TYPE, RunContext};
use crate::urls::reconstruct_url;

/// Postman variable renamed to [`Environment::BASE_URL`] on the way in.
pub const ENDPOINT_VARIABLE: &str = "endpoint";

/// MIME type given to every converted body.
pub const JSON_MIME_TYPE: &str = "application/json";

/// Convert a Postman collection into an Insomnia export.
pub fn postman_to_insomnia(collection: &PostmanCollection, ctx: &RunContext) -> InsomniaExport {
    info!(
        name = collection.info.name,
        items = collection.item.len(),
        variables = collection.variable.len(),
        "converting Postman collection to Insomnia export"
    );

    let folders = collection
        .item
        .iter()
        .map(|item| top_level_folder(item, ctx))
        .collect();

    InsomniaExport {
        export_type: INSOMNIA_EXPORT_TYPE.to_string(),
        name: collection.info.name.clone(),
        meta: Some(ctx.export_meta()),
        collection: folders,
        environment: Some(variables_to_environment(&collection.variable)),
        wrapped_requests: Vec::new(),
    }
}

/// Build the Insomnia environment from Postman's flat variable list.
///
/// `endpoint` is renamed to `base_url`; every other key passes through.
/// A later duplicate key overwrites an earlier one.
pub fn variables_to_environment(variables: &[Variable]) -> Environment {
    let mut data = BTreeMap::new();
    for variable in variables {
        let key = if variable.key == ENDPOINT_VARIABLE {
            Environment::BASE_URL.to_string()
        } else {
            variable.key.clone()
        };
        data.insert(key, variable.value_text());
    }
    Environment { data }
}

/// Re-indent a JSON object body; leave anything else untouched.
///
/// Object keys come out sorted, so even an already-pretty body can change
/// byte for byte. Arrays, scalars and invalid JSON are returned as given.
pub fn pretty_body(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw.trim()) {
        Ok(object) => match serde_json::to_string_pretty(&object) {
            Ok(pretty) => pretty,
            Err(error) => {
                debug!(%error, "failed to re-encode body; keeping original");
                raw.to_string()
            }
        },
        Err(error) => {
            debug!(%error, "body is not a JSON object; keeping original");
            raw.to_string()
        }
    }
}

fn top_level_folder(item: &Item, ctx: &RunContext) -> Folder {
    match item {
        Item::Group { name, item } => folder(name, item, ctx),
        Item::Request { name, request } => {
            warn!(
                name,
                "top-level request has no folder; wrapping it in one of the same name"
            );
            Folder {
                name: name.clone(),
                meta: Some(ctx.node_meta()),
                children: vec![Node::Request(convert_request(name, request, ctx))],
            }
        }
    }
}

fn folder(name: &str, items: &[Item], ctx: &RunContext) -> Folder {
    let mut children = Vec::with_capacity(items.len());
    convert_items(items, ctx, &mut children);
    debug!(folder = name, children = children.len(), "converted group");
    Folder {
        name: name.to_string(),
        meta: Some(ctx.node_meta()),
        children,
    }
}

fn convert_items(items: &[Item], ctx: &RunContext, out: &mut Vec<Node>) {
    for item in items {
        let node = match item {
            Item::Request { name, request } => Node::Request(convert_request(name, request, ctx)),
            Item::Group { name, item } => Node::Folder(folder(name, item, ctx)),
        };
        out.push(node);
    }
}

fn convert_request(name: &str, request: &PostmanRequest, ctx: &RunContext) -> InsomniaRequest {
    let headers = request
        .header
        .iter()
        .map(|h| Header {
            name: h.key.clone(),
            value: h.value.clone(),
        })
        .collect();

    InsomniaRequest {
        name: name.to_string(),
        meta: Some(ctx.node_meta()),
        url: reconstruct_url(&request.url),
        method: request.method.clone(),
        body: request.body.as_ref().map(|b| RequestBody {
            mime_type: JSON_MIME_TYPE.to_string(),
            text: pretty_body(&b.raw),
        }),
        headers,
    }
}
