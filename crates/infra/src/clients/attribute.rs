//! Spatial id attribute lookup.

use reqwest::header::ACCEPT;

use ufbatch_core::error::MSG_INTERNAL_API_ERROR;
use ufbatch_core::model::{AttributeList, AttributeQuery, AttributeRecord, ErrorResponse};
use ufbatch_core::{AttributeService, BatchError, BatchResult};

use super::{CommonApi, is_error_status, read_error};

impl CommonApi {
    /// Lock is checked before range.
    fn classify_attribute_error(&self, body: ErrorResponse) -> BatchError {
        match body.message {
            Some(message) if self.locked.is_match(&message) => {
                BatchError::attribute_locked(message)
            }
            Some(message) if self.out_of_range.is_match(&message) => {
                BatchError::attribute_out_of_range(message)
            }
            _ => BatchError::attribute_lookup(MSG_INTERNAL_API_ERROR),
        }
    }
}

impl AttributeService for CommonApi {
    fn fetch_attributes(&self, query: &AttributeQuery) -> BatchResult<Vec<AttributeRecord>> {
        let response = self
            .http
            .post(self.url(&self.settings.sid_attribute_path))
            .header(ACCEPT, "application/json")
            .json(query)
            .send()
            .map_err(|e| BatchError::attribute_lookup(e.to_string()))?;

        if is_error_status(&response) {
            let body = read_error(response).map_err(BatchError::attribute_lookup)?;
            return Err(self.classify_attribute_error(body));
        }

        let list: AttributeList = response
            .json()
            .map_err(|e| BatchError::attribute_lookup(e.to_string()))?;
        Ok(list.sid_attribute_list)
    }
}
