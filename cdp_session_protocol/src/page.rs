//! `Page` domain: navigation, download interception, and init scripts.

use serde::{Deserialize, Serialize};

use crate::empty_result::EmptyResult;

#[derive(Debug, Clone, Serialize)]
pub struct NavigateParams {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

impl NavigateParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referrer: None,
        }
    }
}

impl<T: Into<String>> From<T> for NavigateParams {
    fn from(url: T) -> Self {
        NavigateParams::new(url)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateResult {
    pub frame_id: String,
    #[serde(default)]
    pub loader_id: Option<String>,
    #[serde(default)]
    pub error_text: Option<String>,
}

impl_command!(NavigateParams, "Page.navigate", NavigateResult);

/// `Page.setDownloadBehavior` behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadBehavior {
    Deny,
    Allow,
    Default,
}

impl DownloadBehavior {
    fn as_str(self) -> &'static str {
        match self {
            DownloadBehavior::Deny => "deny",
            DownloadBehavior::Allow => "allow",
            DownloadBehavior::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDownloadBehaviorParams {
    pub behavior: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_path: Option<String>,
}

impl SetDownloadBehaviorParams {
    pub fn new(behavior: DownloadBehavior) -> Self {
        Self {
            behavior: behavior.as_str().to_string(),
            download_path: None,
        }
    }
}

impl_command!(
    SetDownloadBehaviorParams,
    "Page.setDownloadBehavior",
    EmptyResult
);

#[derive(Debug, Clone, Serialize)]
pub struct EnableParams {}

impl_command!(EnableParams, "Page.enable", EmptyResult);

#[derive(Debug, Clone, Serialize)]
pub struct DisableParams {}

impl_command!(DisableParams, "Page.disable", EmptyResult);

#[derive(Debug, Clone, Serialize)]
pub struct AddScriptToEvaluateOnNewDocumentParams {
    pub source: String,
}

impl AddScriptToEvaluateOnNewDocumentParams {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddScriptToEvaluateOnNewDocumentResult {
    pub identifier: String,
}

impl_command!(
    AddScriptToEvaluateOnNewDocumentParams,
    "Page.addScriptToEvaluateOnNewDocument",
    AddScriptToEvaluateOnNewDocumentResult
);

#[derive(Debug, Clone, Serialize)]
pub struct RemoveScriptToEvaluateOnNewDocumentParams {
    pub identifier: String,
}

impl RemoveScriptToEvaluateOnNewDocumentParams {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }
}

impl_command!(
    RemoveScriptToEvaluateOnNewDocumentParams,
    "Page.removeScriptToEvaluateOnNewDocument",
    EmptyResult
);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDownloadWillBegin {
    pub frame_id: String,
    pub guid: String,
    pub url: String,
    pub suggested_filename: String,
}
impl_method!(EventDownloadWillBegin, "Page.downloadWillBegin");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrameNavigated {
    pub frame_id: String,
    pub url: String,
}
impl_method!(EventFrameNavigated, "Page.frameNavigated");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLoadEventFired {
    pub timestamp: f64,
}
impl_method!(EventLoadEventFired, "Page.loadEventFired");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLifecycleEvent {
    pub frame_id: String,
    pub name: String,
    pub timestamp: f64,
}
impl_method!(EventLifecycleEvent, "Page.lifecycleEvent");
