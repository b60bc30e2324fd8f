use serde::Serialize;

/// Envelope returned by the report upload endpoint. `id` is the new report's
/// external ID, or null when the upload matched an already-stored report.
#[derive(Debug, Serialize)]
pub(crate) struct UploadResponse {
    pub data: UploadedReport,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadedReport {
    pub id: Option<String>,
}
