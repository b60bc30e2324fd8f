//! Document store gateway: a minimal CRUD facade over one document database,
//! with ID normalization between the external string form and the internal
//! ObjectId form.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document, oid::ObjectId};

use crate::error::{PowercheckError, Result};
use crate::query::FindSettings;

pub const REPORTS_COLLECTION: &str = "reports";
pub const PLUGINS_COLLECTION: &str = "plugins";
pub const SCRIPTS_COLLECTION: &str = "scripts";

/// Matching documents plus the total match count. For `find` the total is an
/// independent count that ignores skip/limit; for `aggregate` it is simply
/// the number of documents the pipeline produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindResult {
    pub documents: Vec<Document>,
    pub total: u64,
}

/// Contract shared by the MongoDB gateway and the in-process store the test
/// harnesses use. Handlers receive this behind an `Arc` from the composition
/// root.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Count and fetch against the same predicate; the count ignores
    /// skip/limit, the fetch applies them. Any `id` key in the predicate is
    /// internalized first.
    async fn find(
        &self,
        filter: Document,
        collection: &str,
        options: FindSettings,
    ) -> Result<FindResult>;

    /// Run an ordered pipeline of stages.
    async fn aggregate(&self, stages: Vec<Document>, collection: &str) -> Result<FindResult>;

    /// Insert-if-absent-else-update keyed by the predicate. Returns the new
    /// external ID on insert and `None` on update; callers must handle the
    /// asymmetry.
    async fn upsert(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> Result<Option<String>>;
}

/// Total conversion from the external string form to an ObjectId.
pub fn to_object_id(raw: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw)
        .map_err(|err| PowercheckError::InvalidIdentifier(format!("{raw}: {err}")))
}

/// Rewrite an `id` (or `_id`) key in a predicate to its internal form. The
/// value may be a single external ID or a set form such as
/// `{ "$in": ["...", "..."] }`.
pub fn internalize_id_filter(mut filter: Document) -> Result<Document> {
    let Some(value) = filter.remove("id").or_else(|| filter.remove("_id")) else {
        return Ok(filter);
    };
    let internal = internalize_id_value(value)?;
    filter.insert("_id", internal);
    Ok(filter)
}

fn internalize_id_value(value: Bson) -> Result<Bson> {
    match value {
        Bson::String(raw) => Ok(Bson::ObjectId(to_object_id(&raw)?)),
        Bson::ObjectId(oid) => Ok(Bson::ObjectId(oid)),
        Bson::Document(ops) => {
            let mut converted = Document::new();
            for (op, operand) in ops {
                let operand = match operand {
                    Bson::Array(items) => Bson::Array(
                        items
                            .into_iter()
                            .map(internalize_id_value)
                            .collect::<Result<Vec<_>>>()?,
                    ),
                    other => internalize_id_value(other)?,
                };
                converted.insert(op, operand);
            }
            Ok(Bson::Document(converted))
        }
        other => Err(PowercheckError::InvalidIdentifier(format!(
            "unsupported identifier value: {other}"
        ))),
    }
}

/// Rename `_id` to `id` and render every ObjectId in its external string
/// form, recursively; linkage arrays carry ObjectIds too.
#[must_use]
pub fn externalize_id(mut document: Document) -> Document {
    if let Some(id) = document.remove("_id") {
        let mut renamed = Document::new();
        renamed.insert("id", id);
        renamed.extend(document);
        document = renamed;
    }
    externalize_values(document)
}

fn externalize_values(document: Document) -> Document {
    document
        .into_iter()
        .map(|(key, value)| (key, externalize_bson(value)))
        .collect()
}

fn externalize_bson(value: Bson) -> Bson {
    match value {
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        Bson::Array(items) => Bson::Array(items.into_iter().map(externalize_bson).collect()),
        Bson::Document(inner) => Bson::Document(externalize_values(inner)),
        other => other,
    }
}

/// A document's identifier is immutable once created; drop any identity key
/// from an upsert's `$set` payload.
fn strip_update_identity(update: &mut Document) {
    if let Some(Bson::Document(set)) = update.get_mut("$set") {
        set.remove("_id");
        set.remove("id");
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    #[test]
    fn to_object_id_rejects_malformed_strings() {
        assert!(to_object_id("0123456789abcdef01234567").is_ok());
        assert!(matches!(
            to_object_id("not-an-id"),
            Err(PowercheckError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn internalize_rewrites_single_id() {
        let oid = ObjectId::new();
        let filter = internalize_id_filter(doc! { "id": oid.to_hex() }).expect("internalize");
        assert_eq!(filter, doc! { "_id": oid });
    }

    #[test]
    fn internalize_rewrites_id_sets() {
        let first = ObjectId::new();
        let second = ObjectId::new();
        let filter = internalize_id_filter(doc! {
            "id": { "$in": [first.to_hex(), second.to_hex()] }
        })
        .expect("internalize");
        assert_eq!(filter, doc! { "_id": { "$in": [first, second] } });
    }

    #[test]
    fn internalize_signals_on_malformed_ids() {
        assert!(matches!(
            internalize_id_filter(doc! { "id": "nope" }),
            Err(PowercheckError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn externalize_renames_and_stringifies_ids() {
        let id = ObjectId::new();
        let linked = ObjectId::new();
        let document = externalize_id(doc! {
            "_id": id,
            "Plugin": "P1",
            "ids": [linked],
        });

        assert_eq!(document.get_str("id").expect("id"), id.to_hex());
        assert!(!document.contains_key("_id"));
        let ids = document.get_array("ids").expect("ids");
        assert_eq!(ids, &vec![Bson::String(linked.to_hex())]);
    }

    #[test]
    fn update_identity_is_stripped() {
        let mut update = doc! { "$set": { "_id": "x", "id": "y", "Title": "t" } };
        strip_update_identity(&mut update);
        assert_eq!(update, doc! { "$set": { "Title": "t" } });
    }
}
