use async_tungstenite::tungstenite;
use futures::channel::mpsc::SendError;
use futures::channel::oneshot::Canceled;
use thiserror::Error;

use cdp_session_types::WireError;

pub type Result<T, E = CdpError> = std::result::Result<T, E>;

/// The unified error type for every failure mode the session layer can
/// surface.
#[derive(Debug, Error)]
pub enum CdpError {
    #[error("{0}")]
    Ws(#[from] tungstenite::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
    /// The browser replied with a CDP protocol error (non-zero `error`
    /// field on the response).
    #[error("protocol error: {0}")]
    Protocol(#[from] WireError),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("received no response from the browser")]
    NoResponse,
    #[error("{0}")]
    ChannelSendError(#[from] ChannelError),
    /// The debugger endpoint never came up within the retry budget.
    /// Since launching the process is out of scope here, this carries the
    /// last `/json/version` probe failure rather than sampled process
    /// stderr.
    #[error("browser did not become ready: {0}")]
    BrowserStartup(String),
    #[error("{0}")]
    Usage(String),
    #[error("could not compile key event: {0}")]
    KeyCompile(String),
    #[error("binding error: {0}")]
    Binding(String),
    #[error("timed out waiting for a response")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("{0}")]
    Send(#[from] SendError),
    #[error("{0}")]
    Canceled(#[from] Canceled),
}

impl From<Canceled> for CdpError {
    fn from(err: Canceled) -> Self {
        ChannelError::from(err).into()
    }
}

impl From<SendError> for CdpError {
    fn from(err: SendError) -> Self {
        ChannelError::from(err).into()
    }
}

impl From<crate::runtime::Elapsed> for CdpError {
    fn from(_: crate::runtime::Elapsed) -> Self {
        CdpError::Timeout
    }
}
