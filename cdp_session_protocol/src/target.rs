//! `Target` domain: discovery and lifecycle of browser targets (tabs,
//! workers, iframes).

use serde::{Deserialize, Serialize};

use crate::empty_result;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub String);

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        TargetId(s.to_string())
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The mirror of a browser target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: TargetId,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub url: String,
    pub attached: bool,
    #[serde(default)]
    pub opener_id: Option<TargetId>,
    #[serde(default)]
    pub browser_context_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDiscoverTargetsParams {
    pub discover: bool,
}

impl SetDiscoverTargetsParams {
    pub fn new(discover: bool) -> Self {
        Self { discover }
    }
}

impl_command!(
    SetDiscoverTargetsParams,
    "Target.setDiscoverTargets",
    empty_result::EmptyResult
);

#[derive(Debug, Clone, Serialize)]
pub struct GetTargetsParams {}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetsResult {
    pub target_infos: Vec<TargetInfo>,
}

impl_command!(GetTargetsParams, "Target.getTargets", GetTargetsResult);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetParams {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_window: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<bool>,
}

impl CreateTargetParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            new_window: None,
            background: None,
        }
    }
}

impl<T: Into<String>> From<T> for CreateTargetParams {
    fn from(url: T) -> Self {
        CreateTargetParams::new(url)
    }
}

impl Default for CreateTargetParams {
    fn default() -> Self {
        CreateTargetParams::new("about:blank")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetResult {
    pub target_id: TargetId,
}

impl_command!(CreateTargetParams, "Target.createTarget", CreateTargetResult);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTargetParams {
    pub target_id: TargetId,
}

impl CloseTargetParams {
    pub fn new(target_id: TargetId) -> Self {
        Self { target_id }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTargetResult {
    pub success: bool,
}

impl_command!(CloseTargetParams, "Target.closeTarget", CloseTargetResult);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTargetCreated {
    pub target_info: TargetInfo,
}
impl_method!(EventTargetCreated, "Target.targetCreated");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTargetInfoChanged {
    pub target_info: TargetInfo,
}
impl_method!(EventTargetInfoChanged, "Target.targetInfoChanged");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTargetDestroyed {
    pub target_id: TargetId,
}
impl_method!(EventTargetDestroyed, "Target.targetDestroyed");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTargetCrashed {
    pub target_id: TargetId,
    pub status: String,
    pub error_code: i64,
}
impl_method!(EventTargetCrashed, "Target.targetCrashed");
