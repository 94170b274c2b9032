use serde::Deserialize;

/// Body of `DELETE /uploads`.
#[derive(Debug, Deserialize)]
pub struct RemoveFilesRequest {
    pub files: Vec<String>,
}
