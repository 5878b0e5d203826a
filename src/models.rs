use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub original_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<bson::DateTime>,
}

impl UrlRecord {
    /// The redirect target in normalized form, safe to place in a `Location` header.
    ///
    /// # Errors
    ///
    /// Fails if the stored string no longer parses as a URL.
    pub fn target(&self) -> Result<Url, url::ParseError> {
        self.original_url.parse()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShortenRequest {
    pub original_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_url: String,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}
