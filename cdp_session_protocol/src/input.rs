//! `Input` domain: synthetic keyboard dispatch. `DispatchKeyEventParams`
//! is the payload shape the key-event compiler produces.

use serde::Serialize;

use crate::empty_result::EmptyResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKeyEventType {
    KeyDown,
    KeyUp,
    RawKeyDown,
    Char,
}

impl DispatchKeyEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchKeyEventType::KeyDown => "keyDown",
            DispatchKeyEventType::KeyUp => "keyUp",
            DispatchKeyEventType::RawKeyDown => "rawKeyDown",
            DispatchKeyEventType::Char => "char",
        }
    }
}

/// Field names are the literal CDP names. Absent optional fields are
/// omitted from the wire payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchKeyEventParams {
    #[serde(rename = "type")]
    pub kind: String,
    pub modifiers: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "windowsVirtualKeyCode")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_virtual_key_code: Option<i64>,
    #[serde(rename = "nativeVirtualKeyCode")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_virtual_key_code: Option<i64>,
}

impl_command!(
    DispatchKeyEventParams,
    "Input.dispatchKeyEvent",
    EmptyResult
);
