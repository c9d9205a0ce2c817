//! `Tab`: a per-target convenience facade over a [`Connection`], carrying
//! navigate/evaluate/type convenience methods.

use cdp_session_protocol::page::NavigateParams;
use cdp_session_protocol::runtime::EvaluateParams;
use cdp_session_protocol::target::TargetInfo;

use crate::connection::Connection;
use crate::error::{CdpError, Result};
use crate::eval::{self, ParsedValue};
use crate::keys::{self, Key, Modifiers};

/// A single browser target, wrapping the [`Connection`] attached to it
/// with navigation/evaluation/input convenience methods.
///
/// Exposes the held `TargetInfo` via `Deref<Target = TargetInfo>` plus an
/// explicit [`Tab::target`] accessor.
pub struct Tab {
    connection: Connection,
    target: TargetInfo,
}

impl Tab {
    pub fn new(connection: Connection, target: TargetInfo) -> Self {
        Self { connection, target }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// The [`TargetInfo`] this tab was opened with. Kept as a snapshot;
    /// callers tracking live updates should consult the owning
    /// [`crate::target::TargetRegistry`] instead.
    pub fn target(&self) -> &TargetInfo {
        &self.target
    }

    /// Navigates to `url` and waits for the connection to go idle
    /// afterwards.
    pub async fn navigate(&self, url: impl Into<String>) -> Result<()> {
        let result = self.connection.send(NavigateParams::new(url)).await?;
        if let Some(error_text) = result.error_text {
            return Err(CdpError::Usage(format!("navigation failed: {error_text}")));
        }
        self.connection.wait(None).await;
        Ok(())
    }

    /// Evaluates `expression` and parses the tagged evaluation result.
    pub async fn evaluate(&self, expression: impl Into<String>) -> Result<ParsedValue> {
        let mut params = EvaluateParams::new(expression);
        params.return_by_value = Some(true);
        params.await_promise = Some(true);
        let result = self.connection.send(params).await?;
        if let Some(exception) = result.exception_details {
            return Err(CdpError::Usage(format!(
                "evaluation threw: {}",
                exception.text
            )));
        }
        let value = result.result.value.unwrap_or(serde_json::Value::Null);
        eval::parse(&value, &[])
    }

    /// Types `text` into whatever currently has focus, compiling each
    /// character into a synthetic key-event sequence.
    pub async fn type_text(&self, text: &str) -> Result<()> {
        for event in keys::compile_str(text, Modifiers::NONE)? {
            self.connection.send(event).await?;
        }
        Ok(())
    }

    /// Dispatches a single named key press with the given modifiers.
    pub async fn press_key(&self, key: Key, modifiers: Modifiers) -> Result<()> {
        for event in keys::compile(key, modifiers)? {
            self.connection.send(event).await?;
        }
        Ok(())
    }

    /// Waits for the connection to go idle, widening the window while
    /// interactive.
    pub async fn wait(&self, timeout: Option<std::time::Duration>) {
        self.connection.wait(timeout).await;
    }

    /// Updates the target info then sleeps.
    pub async fn sleep(&mut self, duration: std::time::Duration, refreshed: Option<TargetInfo>) {
        if let Some(info) = refreshed {
            self.target = info;
        }
        crate::runtime::sleep(duration).await;
    }
}

impl std::ops::Deref for Tab {
    type Target = TargetInfo;

    fn deref(&self) -> &TargetInfo {
        &self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_target() -> TargetInfo {
        TargetInfo {
            target_id: cdp_session_protocol::target::TargetId::from("T1"),
            kind: "page".to_string(),
            title: "".to_string(),
            url: "about:blank".to_string(),
            attached: true,
            opener_id: None,
            browser_context_id: None,
        }
    }

    #[test]
    fn tab_wraps_a_single_connection() {
        // Construction only; exercising navigate/evaluate needs a live
        // websocket endpoint and is covered by the connection-level tests.
        fn assert_send<T: Send>() {}
        assert_send::<Tab>();
    }

    #[test]
    fn tab_derefs_to_its_target_info() {
        fn make(target: TargetInfo) -> TargetInfo {
            target
        }
        let info = stub_target();
        assert_eq!(make(info.clone()).url, "about:blank");
        assert_eq!(info.kind, "page");
    }
}
