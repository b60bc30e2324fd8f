//! In-process implementation of the store contract, used by the test
//! harnesses. Interprets the slice of the MongoDB query/update language this
//! API relies on: equality with dotted paths, `$or`, `$regex`, `$in`,
//! `$set`/`$push` updates, and skip/limit/sort/projection.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document, oid::ObjectId};
use regex::RegexBuilder;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::query::FindSettings;

use super::{DocumentStore, FindResult, internalize_id_filter, strip_update_identity};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw snapshot of one collection, in insertion order.
    pub async fn dump(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        filter: Document,
        collection: &str,
        options: FindSettings,
    ) -> Result<FindResult> {
        let filter = internalize_id_filter(filter)?;
        let collections = self.collections.read().await;
        let mut matched: Vec<Document> = collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| matches_filter(document, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let total = matched.len() as u64;

        if let Some(sort) = &options.sort {
            sort_documents(&mut matched, sort);
        }

        let skip = options.skip.unwrap_or(0) as usize;
        let take = match options.limit {
            Some(limit) if limit > 0 => limit as usize,
            _ => usize::MAX,
        };
        let documents: Vec<Document> = matched
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|document| match &options.projection {
                Some(projection) => project(document, projection),
                None => document,
            })
            .collect();

        Ok(FindResult { documents, total })
    }

    async fn aggregate(&self, stages: Vec<Document>, collection: &str) -> Result<FindResult> {
        let collections = self.collections.read().await;
        let mut documents = collections.get(collection).cloned().unwrap_or_default();

        for stage in &stages {
            for (name, operand) in stage {
                match name.as_str() {
                    "$match" => {
                        if let Some(filter) = operand.as_document() {
                            documents.retain(|document| matches_filter(document, filter));
                        }
                    }
                    "$skip" => {
                        let skip = bson_number(operand).unwrap_or(0.0).max(0.0) as usize;
                        documents = documents.split_off(skip.min(documents.len()));
                    }
                    "$limit" => {
                        let limit = bson_number(operand).unwrap_or(0.0).max(0.0) as usize;
                        documents.truncate(limit);
                    }
                    "$sort" => {
                        if let Some(sort) = operand.as_document() {
                            sort_documents(&mut documents, sort);
                        }
                    }
                    _ => {}
                }
            }
        }

        let total = documents.len() as u64;
        Ok(FindResult { documents, total })
    }

    async fn upsert(
        &self,
        filter: Document,
        mut update: Document,
        collection: &str,
    ) -> Result<Option<String>> {
        let filter = internalize_id_filter(filter)?;
        strip_update_identity(&mut update);

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        if let Some(existing) = documents
            .iter_mut()
            .find(|document| matches_filter(document, &filter))
        {
            apply_update(existing, &update);
            return Ok(None);
        }

        // New documents start from the predicate's equality fields, the way
        // a MongoDB upsert seeds the inserted document.
        let id = ObjectId::new();
        let mut inserted = Document::new();
        inserted.insert("_id", id);
        for (key, value) in &filter {
            if !key.starts_with('$') && !is_operator_document(value) {
                set_path(&mut inserted, key, value.clone());
            }
        }
        apply_update(&mut inserted, &update);
        documents.push(inserted);

        Ok(Some(id.to_hex()))
    }
}

fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, condition)| match key.as_str() {
        "$or" => condition.as_array().is_some_and(|arms| {
            arms.iter().any(|arm| {
                arm.as_document()
                    .is_some_and(|inner| matches_filter(document, inner))
            })
        }),
        _ => condition_matches(lookup_path(document, key), condition),
    })
}

fn condition_matches(value: Option<&Bson>, condition: &Bson) -> bool {
    if is_operator_document(condition) {
        let Some(ops) = condition.as_document() else {
            return false;
        };
        return ops
            .iter()
            .filter(|(op, _)| op.as_str() != "$options")
            .all(|(op, operand)| match op.as_str() {
                "$regex" => regex_matches(value, operand, ops),
                "$in" => operand.as_array().is_some_and(|items| {
                    items
                        .iter()
                        .any(|item| value.is_some_and(|existing| bson_eq(existing, item)))
                }),
                "$eq" => value.is_some_and(|existing| bson_eq(existing, operand)),
                "$ne" => !value.is_some_and(|existing| bson_eq(existing, operand)),
                _ => false,
            });
    }
    value.is_some_and(|existing| bson_eq(existing, condition))
}

fn is_operator_document(value: &Bson) -> bool {
    value
        .as_document()
        .is_some_and(|ops| ops.keys().any(|key| key.starts_with('$')))
}

fn regex_matches(value: Option<&Bson>, pattern: &Bson, ops: &Document) -> bool {
    let Some(Bson::String(target)) = value else {
        return false;
    };
    let Some(pattern) = pattern.as_str() else {
        return false;
    };
    let case_insensitive = ops
        .get_str("$options")
        .map(|options| options.contains('i'))
        .unwrap_or(false);

    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map(|regex| regex.is_match(target))
        .unwrap_or(false)
}

fn bson_eq(left: &Bson, right: &Bson) -> bool {
    match (bson_number(left), bson_number(right)) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

fn bson_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn lookup_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut current = document;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        let value = current.get(part)?;
        if parts.peek().is_none() {
            return Some(value);
        }
        current = value.as_document()?;
    }
    None
}

fn set_path(document: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, Document::new());
            }
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                set_path(inner, rest, value);
            }
        }
    }
}

fn apply_update(document: &mut Document, update: &Document) {
    if let Ok(set) = update.get_document("$set") {
        for (key, value) in set {
            set_path(document, key, value.clone());
        }
    }
    if let Ok(push) = update.get_document("$push") {
        for (key, value) in push {
            match document.get_mut(key) {
                Some(Bson::Array(items)) => items.push(value.clone()),
                _ => {
                    document.insert(key, Bson::Array(vec![value.clone()]));
                }
            }
        }
    }
}

fn sort_documents(documents: &mut [Document], sort: &Document) {
    documents.sort_by(|left, right| {
        for (field, direction) in sort {
            let mut ordering = compare_values(lookup_path(left, field), lookup_path(right, field));
            if bson_number(direction).unwrap_or(1.0) < 0.0 {
                ordering = ordering.reverse();
            }
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn compare_values(left: Option<&Bson>, right: Option<&Bson>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(l), Some(r)) => match (bson_number(l), bson_number(r)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => match (l, r) {
                (Bson::String(a), Bson::String(b)) => a.cmp(b),
                (Bson::Boolean(a), Bson::Boolean(b)) => a.cmp(b),
                _ => Ordering::Equal,
            },
        },
    }
}

fn project(document: Document, projection: &Document) -> Document {
    let keep_id = projection
        .get("_id")
        .and_then(bson_number)
        .is_none_or(|flag| flag != 0.0);

    let mut projected = Document::new();
    if keep_id {
        if let Some(id) = document.get("_id") {
            projected.insert("_id", id.clone());
        }
    }
    for (key, flag) in projection {
        if key == "_id" {
            continue;
        }
        if bson_number(flag).is_some_and(|flag| flag != 0.0) {
            if let Some(value) = lookup_path(&document, key) {
                set_path(&mut projected, key, value.clone());
            }
        }
    }
    projected
}
