//! Typed wire contracts for uploaded reports. Field names keep the
//! PascalCase form the reporting clients emit.

use serde::{Deserialize, Serialize};

/// One uploaded test report. Upsert identity is
/// `(Plugin, Version, Runtime.Start)`; everything else is payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "Plugin")]
    pub plugin: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Runtime")]
    pub runtime: ReportRuntime,
    #[serde(rename = "Data", default)]
    pub data: Vec<ScriptEntry>,
    #[serde(rename = "ScriptList", default)]
    pub script_list: Vec<serde_json::Value>,
}

/// Epoch timestamps bracketing the report run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReportRuntime {
    #[serde(rename = "Start")]
    pub start: f64,
    #[serde(rename = "Finish")]
    pub finish: f64,
}

/// One script execution inside a report's `Data` array. Upsert identity in
/// the scripts collection is `(Name, Version)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "Author", default)]
    pub author: String,
    #[serde(rename = "Category", default)]
    pub category: String,
}
