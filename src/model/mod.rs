//! Document model for both sides of the conversion.
//!
//! Insomnia exports ([`insomnia`]) and Postman collections ([`postman`]) are
//! isomorphic trees: folders/groups containing requests and further folders.
//! Both are decoded into explicit sum types at parse time, so the converters
//! never re-check the "is this a request or a folder" heuristic themselves.
//!
//! Insomnia requires bookkeeping that Postman does not carry (ids, timestamps,
//! sort keys). Those values come from a [`RunContext`] created once per
//! conversion and threaded through the reverse converter.

pub mod insomnia;
pub mod postman;

use chrono::{DateTime, Utc};

use crate::model::insomnia::{FolderMeta, Meta};

/// Postman collection schema URI written into every generated collection.
pub const POSTMAN_SCHEMA_V2_1: &str =
    "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

/// Export `type` written into every generated Insomnia document.
pub const INSOMNIA_EXPORT_TYPE: &str = "collection.insomnia.rest/5.0";

/// Values shared by every node synthesized during one conversion run.
///
/// All folders and requests created in a run carry the same `created`,
/// `modified` and `sortKey`; only the id differs per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    /// Creation time as Unix epoch seconds.
    pub created: i64,
    /// Modification time as Unix epoch seconds.
    pub modified: i64,
    /// Insomnia ordering key (negated run start in epoch milliseconds).
    pub sort_key: i64,
}

impl RunContext {
    /// Context stamped with the current wall-clock time.
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Context stamped with a fixed instant.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            created: instant.timestamp(),
            modified: instant.timestamp(),
            sort_key: -instant.timestamp_millis(),
        }
    }

    /// Document-level metadata with a fresh id.
    pub fn export_meta(&self) -> Meta {
        Meta {
            id: fresh_id(),
            created: self.created,
            modified: self.modified,
        }
    }

    /// Folder/request metadata with a fresh id.
    pub fn node_meta(&self) -> FolderMeta {
        FolderMeta {
            id: fresh_id(),
            created: self.created,
            modified: self.modified,
            sort_key: self.sort_key,
        }
    }
}

fn fresh_id() -> String {
    uuid::Uuid::new_v4().as_hyphenated().to_string()
}

/// Folder and request counts of a converted tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TreeStats {
    pub folders: usize,
    pub requests: usize,
}
