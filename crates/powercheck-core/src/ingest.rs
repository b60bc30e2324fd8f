//! Report ingestion: decode the uploaded bytes, upsert the report, then fan
//! the linkage out to the plugins and scripts collections.

use mongodb::bson::doc;

use crate::error::{PowercheckError, Result};
use crate::models::Report;
use crate::store::{
    DocumentStore, PLUGINS_COLLECTION, REPORTS_COLLECTION, SCRIPTS_COLLECTION, to_object_id,
};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Ingest one uploaded report body.
///
/// The report is upserted keyed by `(Plugin, Version, Runtime.Start)`. A new
/// insert returns the external report ID and cascades: the owning plugin is
/// upserted with `LastReport` and the report ID appended to its linkage list,
/// and every script in `Data` is upserted the same way. When the upsert
/// matched an existing report the cascade is skipped entirely and `None` is
/// returned; duplicate uploads do not re-register plugin/script linkage.
///
/// The cascade runs to completion before this returns, so a cascade failure
/// is observable to the caller.
pub async fn ingest_report(store: &dyn DocumentStore, bytes: &[u8]) -> Result<Option<String>> {
    let body = decode_upload(bytes)?;
    let report: Report = serde_json::from_str(&body)
        .map_err(|err| PowercheckError::MalformedInput(format!("report is not valid JSON: {err}")))?;

    let identity = doc! {
        "Plugin": &report.plugin,
        "Version": &report.version,
        "Runtime.Start": report.runtime.start,
    };
    let payload = mongodb::bson::to_document(&report)?;

    let Some(report_id) = store
        .upsert(identity, doc! { "$set": payload }, REPORTS_COLLECTION)
        .await?
    else {
        tracing::debug!(
            plugin = %report.plugin,
            version = %report.version,
            "duplicate report upload, linkage cascade skipped"
        );
        return Ok(None);
    };
    let linked_id = to_object_id(&report_id)?;

    store
        .upsert(
            doc! { "Plugin": &report.plugin, "Version": &report.version },
            doc! {
                "$set": { "LastReport": report.runtime.start },
                "$push": { "ids": linked_id },
            },
            PLUGINS_COLLECTION,
        )
        .await?;

    for script in &report.data {
        store
            .upsert(
                doc! { "Name": &script.name, "Version": &script.version },
                doc! {
                    "$set": { "Author": &script.author, "Category": &script.category },
                    "$push": { "ids": linked_id },
                },
                SCRIPTS_COLLECTION,
            )
            .await?;
    }

    Ok(Some(report_id))
}

/// Decode an upload as UTF-8 or UTF-16, stripping a leading byte-order mark.
fn decode_upload(bytes: &[u8]) -> Result<String> {
    if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
        return decode_utf16(rest, u16::from_be_bytes);
    }

    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    String::from_utf8(bytes.to_vec())
        .map_err(|err| PowercheckError::MalformedInput(format!("upload is not UTF-8: {err}")))
}

fn decode_utf16(bytes: &[u8], combine: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(PowercheckError::MalformedInput(
            "UTF-16 upload has an odd byte length".to_string(),
        ));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| combine([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
        .map_err(|err| PowercheckError::MalformedInput(format!("upload is not UTF-16: {err}")))
}
