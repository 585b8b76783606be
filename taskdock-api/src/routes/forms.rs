/// Multipart form collection
///
/// The upload endpoints all accept `multipart/form-data` carrying a mix of
/// text fields and files. This module flattens a request into text fields
/// and [`IncomingFile`] candidates for the intake filter; a part with a
/// filename is a file, everything else is text. Files are only accepted
/// under the endpoint's designated field name; a file under any other
/// field fails the request. Empty text fields are treated as absent so
/// partial updates leave the record untouched.
use std::collections::HashMap;

use axum::extract::Multipart;
use taskdock_shared::upload::IncomingFile;

use crate::error::ApiError;

/// Collected multipart form content
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,

    /// File candidates in the order they appeared in the request
    pub files: Vec<IncomingFile>,
}

impl FormData {
    /// Returns a text field's value, None when absent or empty.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Returns an owned copy of a text field's value.
    pub fn text_owned(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }
}

/// Drains a multipart request into a [`FormData`], accepting files only
/// under `file_field`.
///
/// # Errors
///
/// `ApiError::BadRequest` when the multipart stream is malformed, a part
/// exceeds the request body limit, or a file arrives under any field
/// other than `file_field`.
pub async fn collect_multipart(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<FormData, ApiError> {
    let mut form = FormData::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(filename) = field.file_name().map(str::to_string) {
            if name != file_field {
                return Err(ApiError::BadRequest(format!(
                    "Unexpected file field: {}",
                    name
                )));
            }

            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await?;

            form.files.push(IncomingFile {
                filename,
                content_type,
                data,
            });
        } else {
            let value = field.text().await?;
            if !value.is_empty() {
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}
