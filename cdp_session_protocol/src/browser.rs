//! `Browser` domain: the handful of browser-target-wide commands the
//! core issues directly against the root connection.

use serde::Serialize;

use crate::empty_result::EmptyResult;
use crate::page::DownloadBehavior;

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
            behavior: match behavior {
                DownloadBehavior::Deny => "deny",
                DownloadBehavior::Allow => "allow",
                DownloadBehavior::Default => "default",
            }
            .to_string(),
            download_path: None,
        }
    }
}

impl_command!(
    SetDownloadBehaviorParams,
    "Browser.setDownloadBehavior",
    EmptyResult
);

#[derive(Debug, Clone, Serialize)]
pub struct CloseParams {}

impl_command!(CloseParams, "Browser.close", EmptyResult);
