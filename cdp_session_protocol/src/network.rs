//! `Network` domain: request/response observation used by the
//! request/response expectation primitives.

use serde::{Deserialize, Serialize};

use crate::empty_result::EmptyResult;

#[derive(Debug, Clone, Serialize)]
pub struct EnableParams {}

impl_command!(EnableParams, "Network.enable", EmptyResult);

#[derive(Debug, Clone, Serialize)]
pub struct DisableParams {}

impl_command!(DisableParams, "Network.disable", EmptyResult);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUserAgentOverrideParams {
    pub user_agent: String,
}

impl SetUserAgentOverrideParams {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

impl_command!(
    SetUserAgentOverrideParams,
    "Network.setUserAgentOverride",
    EmptyResult
);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

#[derive(Debug, Clone, Deserialize)]
pub struct RequestPayload {
    pub url: String,
    pub method: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestWillBeSent {
    pub request_id: RequestId,
    pub loader_id: String,
    pub document_url: String,
    pub request: RequestPayload,
    pub timestamp: f64,
}
impl_method!(EventRequestWillBeSent, "Network.requestWillBeSent");

#[derive(Debug, Clone, Deserialize)]
pub struct ResponsePayload {
    pub url: String,
    pub status: i64,
    #[serde(rename = "statusText")]
    pub status_text: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponseReceived {
    pub request_id: RequestId,
    pub loader_id: String,
    pub timestamp: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub response: ResponsePayload,
}
impl_method!(EventResponseReceived, "Network.responseReceived");

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResponseBodyParams {
    pub request_id: RequestId,
}

impl GetResponseBodyParams {
    pub fn new(request_id: RequestId) -> Self {
        Self { request_id }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResponseBodyResult {
    pub body: String,
    pub base64_encoded: bool,
}

impl_command!(
    GetResponseBodyParams,
    "Network.getResponseBody",
    GetResponseBodyResult
);
