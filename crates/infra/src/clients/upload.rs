//! Archive upload to storage.

use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::ACCEPT;
use serde::Deserialize;

use ufbatch_core::error::MSG_INTERNAL_API_ERROR;
use ufbatch_core::model::UploadRequest;
use ufbatch_core::{BatchError, BatchResult, Uploader};

use super::{CommonApi, is_error_status, read_error};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "filePath")]
    file_path: String,
}

impl Uploader for CommonApi {
    fn upload(&self, request: &UploadRequest) -> BatchResult<String> {
        let bytes = std::fs::read(&request.archive_path).map_err(|e| {
            BatchError::upload(format!(
                "failed to read {}: {e}",
                request.archive_path.display()
            ))
        })?;

        let file_name = request
            .archive_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.zip")
            .to_string();

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/zip")
            .map_err(|e| BatchError::upload(e.to_string()))?;

        let form = Form::new()
            .part("uploadFile", part)
            .text("taskId", request.task_id.clone())
            .text("servicerId", request.servicer_id.clone());

        let response = self
            .http
            .post(self.url(&self.settings.s3_path))
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .map_err(|e| BatchError::upload(e.to_string()))?;

        if is_error_status(&response) {
            read_error(response).map_err(BatchError::upload)?;
            return Err(BatchError::upload(MSG_INTERNAL_API_ERROR));
        }

        let body: UploadResponse = response
            .json()
            .map_err(|e| BatchError::upload(e.to_string()))?;
        Ok(body.file_path)
    }
}
