//! `Browser`: the root of the target graph, owning the browser-level
//! [`Connection`] and the [`TargetRegistry`].
//!
//! Attaching to an already-running endpoint works by requesting
//! `/json/version` for `webSocketDebuggerUrl`, then turning on
//! `Target.setDiscoverTargets`; each page target is then reached at
//! `ws://{host}:{port}/devtools/page/{target_id}`. Launching the browser
//! process itself is out of scope here: `Browser::connect` always attaches
//! to an endpoint that is already listening.

use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use serde::Deserialize;
use tracing::info;

use cdp_session_protocol::browser::CloseParams;
use cdp_session_protocol::target::{CreateTargetParams, TargetId};
use cdp_session_protocol::{CdpEvent, EventKind};

use crate::connection::Connection;
use crate::error::{CdpError, Result};
use crate::runtime;
use crate::tab::Tab;
use crate::target::{self, TargetRegistry};

/// Timeout for [`Browser::get`]'s wait for the target's navigation to
/// settle.
const TARGET_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Session-layer settings. Deliberately excludes the browser-process
/// launcher concerns (executable path, profile directory, extensions);
/// those belong to a separate process launcher/profile manager, out of
/// scope for this crate.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub host: String,
    pub port: u16,
    /// Whether the target browser is running headless; used to decide
    /// whether the session layer should patch the `navigator.webdriver`/UA
    /// surface.
    pub headless: bool,
    pub idle_browser_timeout: Duration,
    /// How many times to retry the `/json/version` probe before giving up
    /// with [`CdpError::BrowserStartup`].
    pub connect_retries: u32,
    /// Delay between probe attempts.
    pub connect_retry_delay: Duration,
}

impl BrowserConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            headless: false,
            idle_browser_timeout: Duration::from_secs(30),
            connect_retries: 1,
            connect_retry_delay: Duration::from_millis(250),
        }
    }

    fn http_base(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    fn page_ws_url(&self, target_id: &TargetId) -> String {
        format!("ws://{}:{}/devtools/page/{}", self.host, self.port, target_id)
    }
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    websocket_debugger_url: String,
    #[serde(rename = "User-Agent")]
    user_agent: String,
}

/// Polls `/json/version` up to `config.connect_retries` times. Unlike
/// ordinary command `send`s, which are uncapped by design, startup
/// connectivity gets an explicit retry budget.
async fn probe_version(config: &BrowserConfig) -> Result<VersionInfo> {
    let version_url = format!("{}/json/version", config.http_base());
    let mut last_err = None;
    for attempt in 0..config.connect_retries.max(1) {
        if attempt > 0 {
            runtime::sleep(config.connect_retry_delay).await;
        }
        match reqwest::get(&version_url).await {
            Ok(resp) => match resp.json::<VersionInfo>().await {
                Ok(version) => return Ok(version),
                Err(err) => last_err = Some(format!("malformed /json/version response: {err}")),
            },
            Err(err) => last_err = Some(format!("could not reach {version_url}: {err}")),
        }
    }
    Err(CdpError::BrowserStartup(
        last_err.unwrap_or_else(|| "no probe attempts were made".to_string()),
    ))
}

/// The root of the target graph: one browser-level [`Connection`] plus
/// every target discovered or created through it.
pub struct Browser {
    config: BrowserConfig,
    connection: Connection,
    targets: Arc<TargetRegistry>,
    user_agent: String,
}

impl Browser {
    /// Attaches to a browser already listening on `config.host:config.port`
    /// by resolving its debugger websocket URL over HTTP, then turns on
    /// target discovery and installs the internal handlers that keep the
    /// target registry mirrored.
    pub async fn connect(config: BrowserConfig) -> Result<Self> {
        let version = probe_version(&config).await?;
        let connection = Connection::connect(&version.websocket_debugger_url).await?;
        let targets = Arc::new(TargetRegistry::new());
        targets.discover(&connection).await?;
        install_registry_handlers(&connection, &targets);
        info!(targets = targets.len(), "attached to browser");

        Ok(Self {
            config,
            connection,
            targets,
            user_agent: version.user_agent,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn targets(&self) -> &TargetRegistry {
        &self.targets
    }

    /// Opens a page and navigates it to `url`. Always creates a fresh
    /// target rather than reusing an existing blank tab, keeping the
    /// result unambiguous. Resolves once a `Target.targetInfoChanged` for
    /// the new target arrives whose URL is not `about:blank`, or, if `url`
    /// itself is `about:blank`, on the first such event; times out after
    /// 10s.
    pub async fn get(&self, url: impl Into<String>, new_tab: bool, new_window: bool) -> Result<Tab> {
        let url = url.into();
        let wants_blank = url == "about:blank";

        let (ready_tx, ready_rx) = oneshot::channel();
        let ready_tx = std::sync::Mutex::new(Some(ready_tx));
        let target_id_slot: Arc<std::sync::Mutex<Option<TargetId>>> = Arc::new(std::sync::Mutex::new(None));

        let watch_id = {
            let target_id_slot = target_id_slot.clone();
            self.connection
                .add_handler_sync(EventKind::TargetInfoChanged, move |event| {
                    let CdpEvent::TargetInfoChanged(ev) = event else {
                        return;
                    };
                    let is_watched = target_id_slot
                        .lock()
                        .unwrap()
                        .as_ref()
                        .is_some_and(|id| *id == ev.target_info.target_id);
                    if !is_watched {
                        return;
                    }
                    if !wants_blank && ev.target_info.url == "about:blank" {
                        return;
                    }
                    if let Some(tx) = ready_tx.lock().unwrap().take() {
                        let _ = tx.send(ev.target_info.clone());
                    }
                })
        };

        let mut params = CreateTargetParams::new(url.clone());
        if new_window {
            params.new_window = Some(true);
        } else if new_tab {
            params.background = Some(false);
        }
        let target_id = target::create_target(&self.connection, params).await?;
        *target_id_slot.lock().unwrap() = Some(target_id.clone());

        let ws_url = self.config.page_ws_url(&target_id);
        let conn = Connection::connect(ws_url).await?;
        if self.config.headless {
            conn.apply_headless_patch(Some(&self.user_agent)).await;
        }
        self.targets.attach(target_id.clone(), Arc::new(conn.clone()));

        let info = runtime::timeout(TARGET_READY_TIMEOUT, ready_rx).await;
        self.connection.remove_handler(EventKind::TargetInfoChanged, watch_id);
        let info = match info {
            Ok(Ok(info)) => info,
            _ => return Err(CdpError::Usage(format!("timed out waiting for {url} to load"))),
        };
        self.targets.note_info_changed(info.clone());
        Ok(Tab::new(conn, info))
    }

    /// Closes the target `target_id` and forgets it.
    pub async fn close_target(&self, target_id: TargetId) -> Result<bool> {
        let closed = target::close_target(&self.connection, target_id.clone()).await?;
        self.targets.note_destroyed(&target_id);
        Ok(closed)
    }

    /// Closes the browser-level connection. Does not terminate the
    /// browser process; launching and killing the process is out of scope
    /// here.
    pub async fn stop(&self) -> Result<()> {
        let _ = self.connection.send(CloseParams {}).await;
        self.connection.close().await
    }
}

/// Subscribes the internal handlers that keep [`TargetRegistry`] mirrored
/// against `Target.targetCreated`/`targetInfoChanged`/`targetDestroyed`/
/// `targetCrashed`. Registered once, for the lifetime of the
/// browser-level connection, distinct from the short-lived watcher
/// [`Browser::get`] installs per call.
fn install_registry_handlers(connection: &Connection, targets: &Arc<TargetRegistry>) {
    {
        let targets = targets.clone();
        connection.add_handler_sync(EventKind::TargetCreated, move |event| {
            if let CdpEvent::TargetCreated(ev) = event {
                targets.note_created(ev.target_info.clone());
            }
        });
    }
    {
        let targets = targets.clone();
        connection.add_handler_sync(EventKind::TargetInfoChanged, move |event| {
            if let CdpEvent::TargetInfoChanged(ev) = event {
                targets.note_info_changed(ev.target_info.clone());
            }
        });
    }
    {
        let targets = targets.clone();
        connection.add_handler_sync(EventKind::TargetDestroyed, move |event| {
            if let CdpEvent::TargetDestroyed(ev) = event {
                targets.note_destroyed(&ev.target_id);
            }
        });
    }
    {
        let targets = targets.clone();
        connection.add_handler_sync(EventKind::TargetCrashed, move |event| {
            if let CdpEvent::TargetCrashed(ev) = event {
                tracing::warn!(target_id = %ev.target_id, status = %ev.status, "target crashed");
                targets.note_destroyed(&ev.target_id);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_devtools_page_url() {
        let config = BrowserConfig::new("127.0.0.1", 9222);
        let url = config.page_ws_url(&TargetId::from("ABC123"));
        assert_eq!(url, "ws://127.0.0.1:9222/devtools/page/ABC123");
    }

    #[test]
    fn config_defaults_are_non_headless() {
        let config = BrowserConfig::new("localhost", 9222);
        assert!(!config.headless);
        assert_eq!(config.idle_browser_timeout, Duration::from_secs(30));
    }
}
