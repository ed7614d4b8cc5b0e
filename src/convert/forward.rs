//! Insomnia → Postman.
//!
//! Folders become groups, requests become leaf items. Nothing from Insomnia's
//! `meta` blocks or environment survives: Postman has nowhere to put them.

use tracing::{debug, info};

use crate::model::insomnia::{Folder, InsomniaExport, InsomniaRequest, Node};
use crate::model::postman::{
    Info, Item, PostmanBody, PostmanCollection, PostmanHeader, PostmanRequest,
};
use crate::urls::parse_url;

/// Convert an Insomnia export into a Postman v2.1 collection.
pub fn insomnia_to_postman(export: &InsomniaExport) -> PostmanCollection {
    info!(
        name = export.name,
        folders = export.collection.len(),
        "converting Insomnia export to Postman collection"
    );

    let item = export.collection.iter().map(convert_folder).collect();

    PostmanCollection {
        info: Info::v2_1(&export.name),
        item,
        variable: Vec::new(),
    }
}

fn convert_folder(folder: &Folder) -> Item {
    let mut item = Vec::with_capacity(folder.children.len());
    convert_nodes(&folder.children, &mut item);
    debug!(folder = folder.name, children = item.len(), "converted folder");
    Item::Group {
        name: folder.name.clone(),
        item,
    }
}

fn convert_nodes(nodes: &[Node], out: &mut Vec<Item>) {
    for node in nodes {
        let item = match node {
            Node::Request(request) => convert_request(request),
            Node::Folder(folder) => convert_folder(folder),
        };
        out.push(item);
    }
}

fn convert_request(request: &InsomniaRequest) -> Item {
    let header = request
        .headers
        .iter()
        .map(|h| PostmanHeader {
            key: h.name.clone(),
            value: h.value.clone(),
        })
        .collect();

    Item::Request {
        name: request.name.clone(),
        request: PostmanRequest {
            method: request.method.clone(),
            header,
            body: request.body.as_ref().map(|b| PostmanBody::raw_json(&b.text)),
            url: parse_url(&request.url),
        },
    }
}
