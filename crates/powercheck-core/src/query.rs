//! Translation of dashboard query-string parameters into document store
//! query settings. `filter`, `range`, and `sort` each arrive JSON-encoded;
//! malformed values signal `Validation` instead of panicking.

use mongodb::bson::{Document, doc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{PowercheckError, Result};

/// Raw query-string parameters accepted by the list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub filter: Option<String>,
    pub range: Option<String>,
    pub sort: Option<String>,
}

impl ListParams {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filter.is_none() && self.range.is_none() && self.sort.is_none()
    }
}

/// Sort/pagination/projection options for a `find` against one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindSettings {
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
    pub projection: Option<Document>,
}

/// Translator output: the decoded predicate, the find options, and the
/// `from-to` window echoed in `Content-Range` (always present, `0-0` when no
/// range was supplied).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySettings {
    pub range: String,
    pub filter: Document,
    pub options: FindSettings,
}

/// Translator output for aggregation-style queries: the same parameter
/// semantics expressed as an ordered pipeline of stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateSettings {
    pub range: String,
    pub stages: Vec<Document>,
}

/// Decode `filter`/`range`/`sort` into find settings.
///
/// - `filter`: JSON object, used verbatim as the predicate; missing means
///   match-all.
/// - `range`: JSON `[from, to]`, inclusive on both ends; `skip = from`,
///   `limit = to - from + 1`.
/// - `sort`: JSON `[field, "asc" | "desc"]`, direction case-insensitive.
pub fn find_settings(params: &ListParams) -> Result<QuerySettings> {
    let filter = match params.filter.as_deref() {
        Some(raw) => decode_filter(raw)?,
        None => Document::new(),
    };

    let mut options = FindSettings::default();
    let mut from = 0_i64;
    let mut to = 0_i64;

    if let Some(raw) = params.range.as_deref() {
        (from, to) = decode_range(raw)?;
        options.skip = Some(from.max(0) as u64);
        options.limit = Some((to - from + 1).max(0));
    }

    if let Some(raw) = params.sort.as_deref() {
        options.sort = Some(decode_sort(raw)?);
    }

    Ok(QuerySettings {
        range: format!("{from}-{to}"),
        filter,
        options,
    })
}

/// Decode the same parameters into `$skip`/`$limit`/`$sort` pipeline stages,
/// in that order, each present only when its parameter was supplied.
pub fn aggregate_settings(params: &ListParams) -> Result<AggregateSettings> {
    let mut stages = Vec::new();
    let mut from = 0_i64;
    let mut to = 0_i64;

    if let Some(raw) = params.range.as_deref() {
        (from, to) = decode_range(raw)?;
        stages.push(doc! { "$skip": from.max(0) });
        stages.push(doc! { "$limit": (to - from + 1).max(0) });
    }

    if let Some(raw) = params.sort.as_deref() {
        stages.push(doc! { "$sort": decode_sort(raw)? });
    }

    Ok(AggregateSettings {
        range: format!("{from}-{to}"),
        stages,
    })
}

fn decode_filter(raw: &str) -> Result<Document> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| PowercheckError::Validation(format!("filter is not valid JSON: {err}")))?;
    if !value.is_object() {
        return Err(PowercheckError::Validation(
            "filter must be a JSON object".to_string(),
        ));
    }
    mongodb::bson::to_document(&value)
        .map_err(|err| PowercheckError::Validation(format!("filter is not a valid predicate: {err}")))
}

fn decode_range(raw: &str) -> Result<(i64, i64)> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| PowercheckError::Validation(format!("range is not valid JSON: {err}")))?;
    let items = value
        .as_array()
        .filter(|items| items.len() == 2)
        .ok_or_else(|| {
            PowercheckError::Validation("range must be a two-element array".to_string())
        })?;

    let from = range_bound(&items[0], "from")?;
    let to = range_bound(&items[1], "to")?;
    Ok((from, to))
}

fn range_bound(value: &Value, name: &str) -> Result<i64> {
    match value {
        Value::Number(number) => number.as_i64().ok_or_else(|| {
            PowercheckError::Validation(format!("range {name} must be an integer"))
        }),
        Value::String(raw) => raw.trim().parse::<i64>().map_err(|_| {
            PowercheckError::Validation(format!("range {name} must be an integer"))
        }),
        _ => Err(PowercheckError::Validation(format!(
            "range {name} must be an integer"
        ))),
    }
}

fn decode_sort(raw: &str) -> Result<Document> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| PowercheckError::Validation(format!("sort is not valid JSON: {err}")))?;
    let items = value
        .as_array()
        .filter(|items| items.len() == 2)
        .ok_or_else(|| {
            PowercheckError::Validation("sort must be a [field, direction] array".to_string())
        })?;

    let field = items[0]
        .as_str()
        .filter(|field| !field.is_empty())
        .ok_or_else(|| PowercheckError::Validation("sort field must be a string".to_string()))?;
    let direction = items[1]
        .as_str()
        .ok_or_else(|| PowercheckError::Validation("sort direction must be a string".to_string()))?;

    let order = if direction.eq_ignore_ascii_case("asc") {
        1
    } else {
        -1
    };
    Ok(doc! { field: order })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(filter: Option<&str>, range: Option<&str>, sort: Option<&str>) -> ListParams {
        ListParams {
            filter: filter.map(str::to_string),
            range: range.map(str::to_string),
            sort: sort.map(str::to_string),
        }
    }

    #[test]
    fn missing_parameters_produce_match_all_defaults() {
        let settings = find_settings(&ListParams::default()).expect("settings");
        assert_eq!(settings.range, "0-0");
        assert!(settings.filter.is_empty());
        assert_eq!(settings.options, FindSettings::default());
    }

    #[test]
    fn filter_is_used_verbatim() {
        let settings =
            find_settings(&params(Some(r#"{"Plugin":"P1"}"#), None, None)).expect("settings");
        assert_eq!(settings.filter, doc! { "Plugin": "P1" });
    }

    #[test]
    fn range_maps_to_skip_and_inclusive_limit() {
        let settings = find_settings(&params(None, Some("[10,19]"), None)).expect("settings");
        assert_eq!(settings.range, "10-19");
        assert_eq!(settings.options.skip, Some(10));
        assert_eq!(settings.options.limit, Some(10));
    }

    #[test]
    fn range_accepts_numeric_strings() {
        let settings =
            find_settings(&params(None, Some(r#"["0","4"]"#), None)).expect("settings");
        assert_eq!(settings.options.skip, Some(0));
        assert_eq!(settings.options.limit, Some(5));
    }

    #[test]
    fn sort_direction_is_case_insensitive() {
        let asc = find_settings(&params(None, None, Some(r#"["Title","ASC"]"#))).expect("asc");
        assert_eq!(asc.options.sort, Some(doc! { "Title": 1 }));

        let desc = find_settings(&params(None, None, Some(r#"["Title","desc"]"#))).expect("desc");
        assert_eq!(desc.options.sort, Some(doc! { "Title": -1 }));
    }

    #[test]
    fn malformed_parameters_signal_validation() {
        assert!(matches!(
            find_settings(&params(Some("{not json"), None, None)),
            Err(PowercheckError::Validation(_))
        ));
        assert!(matches!(
            find_settings(&params(None, Some("[1]"), None)),
            Err(PowercheckError::Validation(_))
        ));
        assert!(matches!(
            find_settings(&params(None, None, Some(r#"["Title"]"#))),
            Err(PowercheckError::Validation(_))
        ));
        assert!(matches!(
            find_settings(&params(Some(r#"[1,2]"#), None, None)),
            Err(PowercheckError::Validation(_))
        ));
    }

    #[test]
    fn aggregate_stages_keep_skip_limit_sort_order() {
        let settings = aggregate_settings(&params(
            None,
            Some("[5,14]"),
            Some(r#"["Version","desc"]"#),
        ))
        .expect("settings");

        assert_eq!(settings.range, "5-14");
        assert_eq!(
            settings.stages,
            vec![
                doc! { "$skip": 5_i64 },
                doc! { "$limit": 10_i64 },
                doc! { "$sort": { "Version": -1 } },
            ]
        );
    }

    #[test]
    fn aggregate_without_parameters_is_an_empty_pipeline() {
        let settings = aggregate_settings(&ListParams::default()).expect("settings");
        assert_eq!(settings.range, "0-0");
        assert!(settings.stages.is_empty());
    }
}
