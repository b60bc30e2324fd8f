use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use mongodb::bson::{Bson, Document, doc};
use serde_json::Value;

use powercheck_core::PowercheckError;
use powercheck_core::ingest::ingest_report;
use powercheck_core::query::{FindSettings, ListParams, find_settings};
use powercheck_core::store::{
    PLUGINS_COLLECTION, REPORTS_COLLECTION, SCRIPTS_COLLECTION, externalize_id,
};

use crate::AppState;
use crate::cors::{apply_cors_headers, apply_permissive_cors};
use crate::dto::{UploadResponse, UploadedReport};
use crate::error::error_response;

/// Per-resource listing policy: which collection backs it, which fields the
/// free-text `q` filter searches, and where its logical `Date` sort field
/// actually points.
struct ResourcePolicy {
    collection: &'static str,
    text_fields: &'static [&'static str],
    date_field: Option<&'static str>,
}

const REPORTS: ResourcePolicy = ResourcePolicy {
    collection: REPORTS_COLLECTION,
    text_fields: &["Title", "Plugin", "Version"],
    date_field: Some("Runtime.Start"),
};

const PLUGINS: ResourcePolicy = ResourcePolicy {
    collection: PLUGINS_COLLECTION,
    text_fields: &["Plugin", "Version"],
    date_field: Some("LastReport"),
};

const SCRIPTS: ResourcePolicy = ResourcePolicy {
    collection: SCRIPTS_COLLECTION,
    text_fields: &["Name", "Author", "Category"],
    date_field: None,
};

impl ResourcePolicy {
    /// Options applied when the request carries no query parameters at all.
    fn default_options(&self) -> FindSettings {
        match self.collection {
            REPORTS_COLLECTION => FindSettings {
                sort: Some(doc! { "Runtime.Start": -1 }),
                skip: Some(0),
                limit: Some(10),
                projection: Some(doc! {
                    "_id": 1, "Title": 1, "Version": 1, "Plugin": 1, "Runtime.Start": 1,
                }),
            },
            PLUGINS_COLLECTION => FindSettings {
                sort: Some(doc! { "Version": -1 }),
                skip: Some(0),
                limit: Some(10),
                projection: None,
            },
            _ => FindSettings {
                sort: Some(doc! { "Name": 1 }),
                skip: Some(0),
                limit: Some(10),
                projection: None,
            },
        }
    }
}

pub(crate) async fn create_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let operation = "reports.create";
    let bytes = match read_report_file(multipart).await {
        Ok(bytes) => bytes,
        Err(err) => return error_response(&err, operation, Some(REPORTS_COLLECTION.to_string())),
    };

    match ingest_report(state.store.as_ref(), &bytes).await {
        Ok(id) => {
            let mut response = (
                StatusCode::OK,
                Json(UploadResponse {
                    data: UploadedReport { id },
                }),
            )
                .into_response();
            apply_cors_headers(&headers, &state.origin, response.headers_mut());
            response
        }
        Err(err) => error_response(&err, operation, Some(REPORTS_COLLECTION.to_string())),
    }
}

async fn read_report_file(mut multipart: Multipart) -> powercheck_core::Result<Vec<u8>> {
    loop {
        let field = multipart.next_field().await.map_err(|err| {
            PowercheckError::MalformedInput(format!("invalid multipart upload: {err}"))
        })?;
        let Some(field) = field else {
            return Err(PowercheckError::MalformedInput(
                "upload is missing a `file` field".to_string(),
            ));
        };
        if field.name() == Some("file") {
            let bytes = field.bytes().await.map_err(|err| {
                PowercheckError::MalformedInput(format!("failed to read upload: {err}"))
            })?;
            return Ok(bytes.to_vec());
        }
    }
}

pub(crate) async fn list_reports(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    list_resource(&state, &headers, &params, &REPORTS).await
}

pub(crate) async fn show_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    show_resource(&state, &headers, &id, &REPORTS).await
}

pub(crate) async fn list_plugins(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    list_resource(&state, &headers, &params, &PLUGINS).await
}

pub(crate) async fn show_plugin(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    show_resource(&state, &headers, &id, &PLUGINS).await
}

pub(crate) async fn list_scripts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    list_resource(&state, &headers, &params, &SCRIPTS).await
}

pub(crate) async fn show_script(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    show_resource(&state, &headers, &id, &SCRIPTS).await
}

pub(crate) async fn preflight(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut response = StatusCode::OK.into_response();
    apply_cors_headers(&headers, &state.origin, response.headers_mut());
    response
}

pub(crate) async fn catch_all(method: Method) -> Response {
    if method == Method::OPTIONS {
        let mut response = StatusCode::OK.into_response();
        apply_permissive_cors(response.headers_mut());
        response
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn list_resource(
    state: &AppState,
    headers: &HeaderMap,
    params: &ListParams,
    policy: &ResourcePolicy,
) -> Response {
    let operation = format!("{}.list", policy.collection);
    let resource = || Some(policy.collection.to_string());

    let (mut filter, mut options, range) = if params.is_empty() {
        (Document::new(), policy.default_options(), "0-9".to_string())
    } else {
        match find_settings(params) {
            Ok(settings) => (settings.filter, settings.options, settings.range),
            Err(err) => return error_response(&err, &operation, resource()),
        }
    };

    // A `q` key replaces the structural predicate with a substring search
    // over this resource's text fields.
    let free_text = filter.get_str("q").ok().map(str::to_string);
    if let Some(q) = free_text {
        filter = free_text_filter(policy.text_fields, &q);
    }

    // Dashboards sort on a logical `Date` field; point it at the resource's
    // actual timestamp path, newest first.
    if let Some(date_field) = policy.date_field {
        let sorts_on_date = options
            .sort
            .as_ref()
            .is_some_and(|sort| sort.contains_key("Date"));
        if sorts_on_date {
            options.sort = Some(doc! { date_field: -1 });
        }
    }

    let result = match state.store.find(filter, policy.collection, options).await {
        Ok(result) => result,
        Err(err) => return error_response(&err, &operation, resource()),
    };

    let body: Vec<Value> = result
        .documents
        .into_iter()
        .map(|document| Bson::Document(externalize_id(document)).into_relaxed_extjson())
        .collect();

    let mut response = (StatusCode::OK, Json(body)).into_response();
    let response_headers = response.headers_mut();
    apply_cors_headers(headers, &state.origin, response_headers);
    response_headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Content-Range"),
    );
    let content_range = format!("{} {}/{}", policy.collection, range, result.total);
    if let Ok(value) = HeaderValue::from_str(&content_range) {
        response_headers.insert(header::CONTENT_RANGE, value);
    }
    response
}

async fn show_resource(
    state: &AppState,
    headers: &HeaderMap,
    id: &str,
    policy: &ResourcePolicy,
) -> Response {
    let operation = format!("{}.show", policy.collection);

    let result = match state
        .store
        .find(doc! { "id": id }, policy.collection, FindSettings::default())
        .await
    {
        Ok(result) => result,
        Err(err) => {
            return error_response(&err, &operation, Some(policy.collection.to_string()));
        }
    };

    let body = result
        .documents
        .into_iter()
        .next()
        .map(|document| Bson::Document(externalize_id(document)).into_relaxed_extjson())
        .unwrap_or(Value::Null);

    let mut response = (StatusCode::OK, Json(body)).into_response();
    apply_cors_headers(headers, &state.origin, response.headers_mut());
    response
}

fn free_text_filter(fields: &[&str], q: &str) -> Document {
    let pattern = format!(".*{q}.*");
    let arms: Vec<Document> = fields
        .iter()
        .map(|field| doc! { *field: { "$regex": &pattern, "$options": "i" } })
        .collect();
    doc! { "$or": arms }
}
