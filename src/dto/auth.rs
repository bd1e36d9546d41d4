use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by the bearer token. Issuance lives outside this service;
/// only verification happens here.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub role: String,
    pub exp: usize,
}
