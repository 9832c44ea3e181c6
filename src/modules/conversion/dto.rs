use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub storage_url: String,
    pub file_id: Uuid,
}

#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct ConvertForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Optional; protects the resulting PDF when non-empty.
    pub password: Option<String>,
}
