//! The `Connection` type: one multiplexed JSON-RPC-over-WebSocket
//! session talking to a single CDP debugger endpoint.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use fnv::FnvHashMap;
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, trace, warn};

use cdp_session_protocol::{CdpEvent, EventKind, ALWAYS_ENABLED_DOMAINS};
use cdp_session_types::{CallId, Command, Message, WireError};

use crate::error::{CdpError, Result};
use crate::runtime;
use crate::ws::{self, WsSink};

/// Idle window used by [`Connection::wait`] when no explicit duration is
/// given: non-interactive callers wait for a 100ms quiet period.
pub const IDLE_WINDOW_NON_INTERACTIVE: Duration = Duration::from_millis(100);
/// Idle window used while an interactive session (e.g. a REPL) is
/// attached: events are expected more often, so idle detection backs off.
pub const IDLE_WINDOW_INTERACTIVE: Duration = Duration::from_millis(750);

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(20);

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// An event handler: either invoked inline on the listener task, or
/// spawned as its own task when it needs to await.
enum HandlerFn {
    Sync(Box<dyn Fn(&CdpEvent) + Send + Sync>),
    Async(Box<dyn Fn(CdpEvent) -> BoxFuture + Send + Sync>),
}

impl std::fmt::Debug for HandlerFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerFn::Sync(_) => f.write_str("HandlerFn::Sync"),
            HandlerFn::Async(_) => f.write_str("HandlerFn::Async"),
        }
    }
}

struct Handler {
    id: HandlerId,
    f: HandlerFn,
}

/// Identifies one registered handler so it can be removed individually
/// without disturbing the others registered for the same event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Transaction {
    sender: futures::channel::oneshot::Sender<Result<Value>>,
}

impl Transaction {
    fn complete(self, result: std::result::Result<Value, WireError>) {
        let _ = self.sender.send(result.map_err(CdpError::Protocol));
    }
}

#[derive(Default)]
struct State {
    pending: FnvHashMap<i64, Transaction>,
    next_id: i64,
    handlers: HashMap<EventKind, Vec<Handler>>,
    next_handler_id: u64,
    enabled_domains: Vec<&'static str>,
    /// Last `Browser.setDownloadBehavior` value this connection is known
    /// to have requested, tracked so [`crate::expectations::DownloadExpectation`]
    /// can restore it instead of hardcoding `"default"`.
    download_behavior: Option<String>,
}

struct Shared {
    state: Mutex<State>,
    sink: futures::lock::Mutex<WsSink>,
    last_activity: Mutex<Instant>,
    closed: AtomicBool,
    interactive: AtomicBool,
}

/// A single websocket connection to a CDP debugger endpoint. Every
/// browser target owns one of these.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

impl Connection {
    pub async fn connect(debug_ws_url: impl AsRef<str>) -> Result<Self> {
        let ws = ws::connect(debug_ws_url.as_ref()).await?;
        let (sink, source) = ws::split(ws);

        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            sink: futures::lock::Mutex::new(sink),
            last_activity: Mutex::new(Instant::now()),
            closed: AtomicBool::new(false),
            interactive: AtomicBool::new(false),
        });

        runtime::spawn(listener_loop(shared.clone(), source));

        Ok(Self { shared })
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Marks the connection as interactive, widening the idle window used
    /// by [`Connection::wait`].
    pub fn set_interactive(&self, interactive: bool) {
        self.shared.interactive.store(interactive, Ordering::SeqCst);
    }

    /// Sends a command and awaits its typed response.
    ///
    /// Id allocation and the pending-map insert happen under a single lock
    /// acquisition with no `.await` in between, so a second call racing
    /// this one can never observe an empty pending map (and reset the
    /// counter) before this call's id is recorded, and can never be handed
    /// the same id.
    pub async fn send<C: Command>(&self, cmd: C) -> Result<C::Response> {
        if self.is_closed() {
            return Err(CdpError::ConnectionClosed);
        }
        self.register_handlers_for_send().await;

        let method = cmd.identifier();
        let params = serde_json::to_value(&cmd)?;

        let (id, rx) = {
            let mut state = self.shared.state.lock().unwrap();
            if state.pending.is_empty() {
                state.next_id = 0;
            }
            let id = state.next_id;
            state.next_id = state.next_id.wrapping_add(1);
            let (tx, rx) = futures::channel::oneshot::channel();
            state.pending.insert(id, Transaction { sender: tx });
            (id, rx)
        };

        let call = cdp_session_types::MethodCall {
            id: CallId::new(id as usize),
            method,
            params,
        };
        let payload = serde_json::to_string(&call)?;
        debug!(id, method = %call.method, "sending command");
        {
            let mut sink = self.shared.sink.lock().await;
            ws::send_text(&mut sink, payload).await?;
        }

        let raw = rx.await??;
        Ok(serde_json::from_value(raw)?)
    }

    /// Sends a best-effort command under the reserved oneshot id (-2),
    /// used for domain reconciliation and headless preparation that must
    /// not interfere with the caller's own id sequence.
    pub async fn send_oneshot<C: Command>(&self, cmd: C) -> Result<C::Response> {
        if self.is_closed() {
            return Err(CdpError::ConnectionClosed);
        }
        let method = cmd.identifier();
        let params = serde_json::to_value(&cmd)?;
        let id = CallId::ONESHOT.raw();

        let (tx, rx) = futures::channel::oneshot::channel();
        {
            let mut state = self.shared.state.lock().unwrap();
            state.pending.insert(id, Transaction { sender: tx });
        }
        let call = cdp_session_types::MethodCall {
            id: CallId::ONESHOT,
            method,
            params,
        };
        let payload = serde_json::to_string(&call)?;
        {
            let mut sink = self.shared.sink.lock().await;
            ws::send_text(&mut sink, payload).await?;
        }
        let raw = rx.await??;
        Ok(serde_json::from_value(raw)?)
    }

    /// Installs the documented, optional headless-detection patches:
    /// overrides `navigator.webdriver` for the current and future
    /// documents, and, if `user_agent` is given, strips it of anything
    /// identifying the browser as headless. Sent under the reserved
    /// oneshot id; failures are logged and otherwise tolerated.
    pub async fn apply_headless_patch(&self, user_agent: Option<&str>) {
        const PATCH: &str =
            "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

        if let Err(err) = self
            .send_oneshot(cdp_session_protocol::page::AddScriptToEvaluateOnNewDocumentParams::new(
                PATCH,
            ))
            .await
        {
            warn!(%err, "failed to install navigator.webdriver patch for future documents");
        }
        if let Err(err) = self
            .send_oneshot(cdp_session_protocol::runtime::EvaluateParams::new(PATCH))
            .await
        {
            warn!(%err, "failed to apply navigator.webdriver patch to the current document");
        }
        if let Some(ua) = user_agent {
            let patched = ua.replace("Headless", "");
            if let Err(err) = self
                .send_oneshot(cdp_session_protocol::network::SetUserAgentOverrideParams::new(patched))
                .await
            {
                warn!(%err, "failed to override user agent");
            }
        }
    }

    fn next_handler_id(state: &mut State) -> HandlerId {
        let id = state.next_handler_id;
        state.next_handler_id += 1;
        HandlerId(id)
    }

    /// Registers an inline handler for every event of kind `kind`.
    /// Returns a [`HandlerId`] so the caller can later remove just this
    /// handler via [`Connection::remove_handler`].
    pub fn add_handler_sync(
        &self,
        kind: EventKind,
        handler: impl Fn(&CdpEvent) + Send + Sync + 'static,
    ) -> HandlerId {
        let mut state = self.shared.state.lock().unwrap();
        let id = Self::next_handler_id(&mut state);
        state.handlers.entry(kind).or_default().push(Handler {
            id,
            f: HandlerFn::Sync(Box::new(handler)),
        });
        id
    }

    /// Registers an async handler for every event of kind `kind`; it runs
    /// as its own spawned task so it may await freely.
    pub fn add_handler_async<F>(
        &self,
        kind: EventKind,
        handler: impl Fn(CdpEvent) -> F + Send + Sync + 'static,
    ) -> HandlerId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.shared.state.lock().unwrap();
        let id = Self::next_handler_id(&mut state);
        state.handlers.entry(kind).or_default().push(Handler {
            id,
            f: HandlerFn::Async(Box::new(move |ev| Box::pin(handler(ev)) as BoxFuture)),
        });
        id
    }

    /// Removes every handler registered for `kind`.
    pub fn remove_handlers(&self, kind: EventKind) {
        let mut state = self.shared.state.lock().unwrap();
        state.handlers.remove(&kind);
    }

    /// Removes a single handler previously returned by
    /// [`Connection::add_handler_sync`]/[`Connection::add_handler_async`],
    /// leaving every other handler registered for `kind` untouched.
    pub fn remove_handler(&self, kind: EventKind, id: HandlerId) {
        let mut state = self.shared.state.lock().unwrap();
        if let Some(handlers) = state.handlers.get_mut(&kind) {
            handlers.retain(|h| h.id != id);
        }
    }

    /// Removes every handler on this connection, for every event kind.
    pub fn remove_all_handlers(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.handlers.clear();
    }

    /// Ensures the protocol domain needed by the currently registered
    /// handlers is enabled, and domains no longer needed are forgotten.
    ///
    /// `Target`/`Storage` are always considered enabled and never touched.
    /// Failures enabling a domain are logged and backed out; they never
    /// abort the in-flight `send`.
    async fn register_handlers_for_send(&self) {
        let (needed, mut stale): (Vec<&'static str>, Vec<&'static str>) = {
            let state = self.shared.state.lock().unwrap();
            let needed: Vec<&'static str> = state
                .handlers
                .iter()
                .filter(|(_, hs)| !hs.is_empty())
                .map(|(kind, _)| kind.domain())
                .filter(|d| !ALWAYS_ENABLED_DOMAINS.contains(d))
                .collect();
            (needed.clone(), state.enabled_domains.clone())
        };
        stale.retain(|d| !needed.contains(d));

        for domain in needed {
            let already = {
                let state = self.shared.state.lock().unwrap();
                state.enabled_domains.contains(&domain)
            };
            if already {
                continue;
            }
            let enabled = match domain {
                "Page" => self
                    .send_oneshot(cdp_session_protocol::page::EnableParams {})
                    .await
                    .is_ok(),
                "Network" => self
                    .send_oneshot(cdp_session_protocol::network::EnableParams {})
                    .await
                    .is_ok(),
                "Runtime" => self
                    .send_oneshot(cdp_session_protocol::runtime::EnableParams {})
                    .await
                    .is_ok(),
                _ => true,
            };
            if enabled {
                let mut state = self.shared.state.lock().unwrap();
                state.enabled_domains.push(domain);
                debug!(domain, "enabled domain");
            } else {
                warn!(domain, "failed to enable domain, leaving disabled");
            }
        }

        for domain in &stale {
            let disabled = match *domain {
                "Page" => self
                    .send_oneshot(cdp_session_protocol::page::DisableParams {})
                    .await
                    .is_ok(),
                "Network" => self
                    .send_oneshot(cdp_session_protocol::network::DisableParams {})
                    .await
                    .is_ok(),
                "Runtime" => self
                    .send_oneshot(cdp_session_protocol::runtime::DisableParams {})
                    .await
                    .is_ok(),
                _ => true,
            };
            if disabled {
                debug!(domain, "disabled domain");
            } else {
                warn!(domain, "failed to disable domain");
            }
        }

        let mut state = self.shared.state.lock().unwrap();
        state.enabled_domains.retain(|d| !stale.contains(d));
    }

    /// Last download behavior this connection is known to have requested
    /// via `Browser.setDownloadBehavior`, or `None` if it was never set.
    pub fn last_download_behavior(&self) -> Option<String> {
        self.shared.state.lock().unwrap().download_behavior.clone()
    }

    pub(crate) fn note_download_behavior(&self, behavior: impl Into<String>) {
        self.shared.state.lock().unwrap().download_behavior = Some(behavior.into());
    }

    /// Closes the underlying websocket. Idempotent.
    pub async fn close(&self) -> Result<()> {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut sink = self.shared.sink.lock().await;
        futures::SinkExt::close(&mut *sink).await?;
        Ok(())
    }

    /// Waits until the connection has been quiet (no inbound messages)
    /// for its idle window, or until `t` elapses, whichever the caller
    /// asked for.
    pub async fn wait(&self, t: Option<Duration>) {
        let idle_window = if self.shared.interactive.load(Ordering::SeqCst) {
            IDLE_WINDOW_INTERACTIVE
        } else {
            IDLE_WINDOW_NON_INTERACTIVE
        };

        match t {
            Some(explicit) => {
                let start = Instant::now();
                let _ = runtime::timeout(explicit, self.idle(idle_window)).await;
                while start.elapsed() < explicit {
                    runtime::sleep(IDLE_POLL_INTERVAL).await;
                }
            }
            None => self.idle(idle_window).await,
        }
    }

    async fn idle(&self, idle_window: Duration) {
        loop {
            let quiet_for = {
                let last = self.shared.last_activity.lock().unwrap();
                last.elapsed()
            };
            if quiet_for >= idle_window {
                return;
            }
            runtime::sleep(IDLE_POLL_INTERVAL).await;
        }
    }
}

async fn listener_loop(shared: Arc<Shared>, mut source: ws::WsSource) {
    while let Some(msg) = source.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(err) => {
                warn!(%err, "websocket read error, closing connection");
                break;
            }
        };
        if !msg.is_text() && !msg.is_binary() {
            continue;
        }
        let data = msg.into_data();
        *shared.last_activity.lock().unwrap() = Instant::now();

        let message: Message = match serde_json::from_slice(&data) {
            Ok(message) => message,
            Err(err) => {
                warn!(%err, "failed to parse incoming message");
                continue;
            }
        };

        match message {
            Message::Response(resp) => {
                let transaction = {
                    let mut state = shared.state.lock().unwrap();
                    state.pending.remove(&resp.id.raw())
                };
                if let Some(transaction) = transaction {
                    match resp.error {
                        Some(err) => transaction.complete(Err(err)),
                        None => transaction.complete(Ok(resp.result.unwrap_or(Value::Null))),
                    }
                }
            }
            Message::Event(raw) => {
                trace!(method = %raw.method, "received event");
                match CdpEvent::parse(&raw.method, raw.params) {
                    Ok(Some(event)) => dispatch_event(&shared, event),
                    Ok(None) => {}
                    Err(err) => warn!(method = %raw.method, %err, "failed to parse event payload"),
                }
            }
        }
    }

    shared.closed.store(true, Ordering::SeqCst);
    let mut state = shared.state.lock().unwrap();
    for (_, tx) in state.pending.drain() {
        tx.complete(Err(WireError {
            code: -1,
            message: "connection closed".to_string(),
        }));
    }
}

fn dispatch_event(shared: &Arc<Shared>, event: CdpEvent) {
    let kind = event.kind();
    let state = shared.state.lock().unwrap();
    let Some(handlers) = state.handlers.get(&kind) else {
        return;
    };
    for handler in handlers {
        match &handler.f {
            HandlerFn::Sync(f) => f(&event),
            HandlerFn::Async(f) => {
                let fut = f(event.clone());
                runtime::spawn(fut);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_windows_distinct() {
        assert!(IDLE_WINDOW_INTERACTIVE > IDLE_WINDOW_NON_INTERACTIVE);
    }
}
