//! Minimal trait/wire-type layer shared by the hand-written CDP domain
//! types and the transport core.
//!
//! This is deliberately small: every concrete `Domain.method` type lives
//! one layer up, in `cdp_session_protocol`.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one outbound `MethodCall` on a single `Connection`.
///
/// Unique while pending; the core resets its counter once the pending map
/// drains.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(i64);

impl CallId {
    pub fn new(id: usize) -> Self {
        CallId(id as i64)
    }

    /// The id reserved for best-effort "oneshot" internal sends (domain
    /// reconciliation, headless preparation) whose result is tolerated to
    /// fail.
    pub const ONESHOT: CallId = CallId(-2);

    pub fn raw(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallId({})", self.0)
    }
}

/// A `Domain.method` identifier, e.g. `Target.setDiscoverTargets`.
pub trait Method {
    /// The whole string identifier for this method, e.g. `DOM.removeNode`.
    fn identifier(&self) -> Cow<'static, str>;

    /// The domain this method belongs to, e.g. `DOM`.
    fn domain_name(&self) -> Cow<'static, str> {
        self.split().0
    }

    /// The method name inside its domain, e.g. `removeNode`.
    fn method_name(&self) -> Cow<'static, str> {
        self.split().1
    }

    fn split(&self) -> (Cow<'static, str>, Cow<'static, str>) {
        match self.identifier() {
            Cow::Borrowed(id) => {
                let mut iter = id.splitn(2, '.');
                (
                    iter.next().unwrap_or("").into(),
                    iter.next().unwrap_or("").into(),
                )
            }
            Cow::Owned(id) => {
                let mut iter = id.splitn(2, '.');
                (
                    Cow::Owned(iter.next().unwrap_or("").to_owned()),
                    Cow::Owned(iter.next().unwrap_or("").to_owned()),
                )
            }
        }
    }
}

/// A command: one outbound `(method, params)` pair consuming a single JSON
/// result object to produce a typed response.
pub trait Command: Serialize + Method {
    type Response: serde::de::DeserializeOwned + fmt::Debug;
}

/// An inbound CDP event: carries its own method identifier for dispatch.
pub trait Event: Method + serde::de::DeserializeOwned + fmt::Debug {}

/// A command response, still tagged with the id/method it answers.
#[derive(Debug)]
pub struct CommandResponse<T: fmt::Debug> {
    pub id: CallId,
    pub method: Cow<'static, str>,
    pub result: T,
}

impl<T: fmt::Debug> std::ops::Deref for CommandResponse<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.result
    }
}

/// The wire error carried by a `{id, error}` response frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    pub code: i64,
    pub message: String,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for WireError {}

/// A raw, not-yet-typed response frame: `{id, result?, error?}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub id: CallId,
    pub result: Option<serde_json::Value>,
    pub error: Option<WireError>,
}

/// A raw, not-yet-typed event frame: `{method, params}` (no id).
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub method: Cow<'static, str>,
    pub params: serde_json::Value,
}

/// Either half of an inbound frame, disambiguated by the presence of `id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Response(Response),
    Event(RawEvent),
}

/// An outbound `{id, method, params}` frame.
#[derive(Debug, Serialize)]
pub struct MethodCall {
    pub id: CallId,
    pub method: Cow<'static, str>,
    pub params: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;
    impl Method for Dummy {
        fn identifier(&self) -> Cow<'static, str> {
            Cow::Borrowed("Network.requestWillBeSent")
        }
    }

    #[test]
    fn splits_domain_and_method() {
        let d = Dummy;
        assert_eq!(d.domain_name().as_ref(), "Network");
        assert_eq!(d.method_name().as_ref(), "requestWillBeSent");
    }

    #[test]
    fn message_discriminates_on_id() {
        let resp: Message = serde_json::from_str(r#"{"id":3,"result":{}}"#).unwrap();
        assert!(matches!(resp, Message::Response(_)));
        let ev: Message =
            serde_json::from_str(r#"{"method":"Page.loadEventFired","params":{}}"#).unwrap();
        assert!(matches!(ev, Message::Event(_)));
    }
}
