use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
}
