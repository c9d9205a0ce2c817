//! Event expectation primitives: register handlers on enter, resolve a
//! value on first match, remove the handlers on scope exit.
//!
//! A guard whose `Drop` unregisters the handlers, backed by a write-once
//! cache so `value()`/`response_body()` can each await the same result.
//!
//! `Connection::remove_handlers` removes every handler for an
//! [`EventKind`], not a single one, so only one expectation of a given
//! kind should be live on a connection at a time.

use std::sync::{Arc, Mutex};

use futures::channel::oneshot;
use regex::Regex;

use cdp_session_protocol::browser::SetDownloadBehaviorParams;
use cdp_session_protocol::network::{self, RequestId};
use cdp_session_protocol::page::{DownloadBehavior, EventDownloadWillBegin};
use cdp_session_protocol::{CdpEvent, EventKind};

use crate::connection::Connection;
use crate::error::{CdpError, Result};

fn anchored(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|err| CdpError::Usage(err.to_string()))
}

/// A value resolved exactly once by an event handler, awaitable any
/// number of times afterwards.
struct Awaitable<T: Clone> {
    cache: Arc<Mutex<Option<T>>>,
    ready_rx: Mutex<Option<oneshot::Receiver<()>>>,
}

impl<T: Clone> Awaitable<T> {
    fn new() -> (Self, Arc<Mutex<Option<T>>>, oneshot::Sender<()>) {
        let cache = Arc::new(Mutex::new(None));
        let (tx, rx) = oneshot::channel();
        (
            Self {
                cache: cache.clone(),
                ready_rx: Mutex::new(Some(rx)),
            },
            cache,
            tx,
        )
    }

    async fn get(&self) -> Result<T> {
        if let Some(v) = self.cache.lock().unwrap().clone() {
            return Ok(v);
        }
        let rx = self.ready_rx.lock().unwrap().take();
        if let Some(rx) = rx {
            let _ = rx.await;
        }
        self.cache
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CdpError::Usage("expectation never matched".to_string()))
    }
}

/// Resolves a value once, and fires `ready` the first time it is set;
/// later calls are ignored.
fn resolve_once<T>(cache: &Arc<Mutex<Option<T>>>, ready: &Arc<Mutex<Option<oneshot::Sender<()>>>>, value: T) {
    let mut slot = cache.lock().unwrap();
    if slot.is_some() {
        return;
    }
    *slot = Some(value);
    drop(slot);
    if let Some(tx) = ready.lock().unwrap().take() {
        let _ = tx.send(());
    }
}

/// Shared machinery behind [`RequestExpectation`] and [`ResponseExpectation`]:
/// a matching `Network.requestWillBeSent`/`Network.responseReceived` pair
/// keyed by the same request id.
pub struct NetworkExpectation {
    connection: Connection,
    request: Awaitable<network::EventRequestWillBeSent>,
    response: Awaitable<network::EventResponseReceived>,
}

impl NetworkExpectation {
    pub async fn new(tab: &Connection, url_pattern: &str) -> Result<Self> {
        let pattern = anchored(url_pattern)?;

        let (request, req_cache, req_ready) = Awaitable::new();
        let (response, resp_cache, resp_ready) = Awaitable::new();
        let req_ready = Arc::new(Mutex::new(Some(req_ready)));
        let resp_ready = Arc::new(Mutex::new(Some(resp_ready)));
        let request_id: Arc<Mutex<Option<RequestId>>> = Arc::new(Mutex::new(None));

        {
            let request_id = request_id.clone();
            tab.add_handler_sync(EventKind::NetworkRequestWillBeSent, move |event| {
                let CdpEvent::NetworkRequestWillBeSent(ev) = event else {
                    return;
                };
                if !pattern.is_match(&ev.request.url) {
                    return;
                }
                *request_id.lock().unwrap() = Some(ev.request_id.clone());
                resolve_once(&req_cache, &req_ready, ev.clone());
            });
        }
        {
            let request_id = request_id.clone();
            tab.add_handler_sync(EventKind::NetworkResponseReceived, move |event| {
                let CdpEvent::NetworkResponseReceived(ev) = event else {
                    return;
                };
                let matches = request_id
                    .lock()
                    .unwrap()
                    .as_ref()
                    .is_some_and(|id| *id == ev.request_id);
                if !matches {
                    return;
                }
                resolve_once(&resp_cache, &resp_ready, ev.clone());
            });
        }

        Ok(Self {
            connection: tab.clone(),
            request,
            response,
        })
    }

    /// Awaits the matching `Network.requestWillBeSent` event.
    pub async fn request(&self) -> Result<network::EventRequestWillBeSent> {
        self.request.get().await
    }

    /// Awaits the matching `Network.responseReceived` event.
    pub async fn response(&self) -> Result<network::EventResponseReceived> {
        self.response.get().await
    }

    /// Fetches the response body for the matched request.
    pub async fn response_body(&self) -> Result<network::GetResponseBodyResult> {
        let request = self.request().await?;
        self.connection
            .send(network::GetResponseBodyParams::new(request.request_id))
            .await
    }
}

impl Drop for NetworkExpectation {
    fn drop(&mut self) {
        self.connection.remove_handlers(EventKind::NetworkRequestWillBeSent);
        self.connection.remove_handlers(EventKind::NetworkResponseReceived);
    }
}

/// Waits for a request matching `url_pattern`.
pub struct RequestExpectation(NetworkExpectation);

impl RequestExpectation {
    pub async fn new(tab: &Connection, url_pattern: &str) -> Result<Self> {
        Ok(Self(NetworkExpectation::new(tab, url_pattern).await?))
    }

    pub async fn value(&self) -> Result<network::EventRequestWillBeSent> {
        self.0.request().await
    }
}

/// Waits for a response matching `url_pattern`.
pub struct ResponseExpectation(NetworkExpectation);

impl ResponseExpectation {
    pub async fn new(tab: &Connection, url_pattern: &str) -> Result<Self> {
        Ok(Self(NetworkExpectation::new(tab, url_pattern).await?))
    }

    pub async fn value(&self) -> Result<network::EventResponseReceived> {
        self.0.response().await
    }

    pub async fn response_body(&self) -> Result<network::GetResponseBodyResult> {
        self.0.response_body().await
    }
}

/// Forces downloads to be denied while in scope, resolving once one was
/// attempted, and restores whatever `Browser.setDownloadBehavior` value
/// was in effect before entering.
pub struct DownloadExpectation {
    connection: Connection,
    previous: DownloadBehavior,
    download: Awaitable<EventDownloadWillBegin>,
}

impl DownloadExpectation {
    pub async fn enter(tab: &Connection) -> Result<Self> {
        let previous = match tab.last_download_behavior().as_deref() {
            Some("allow") => DownloadBehavior::Allow,
            Some("deny") => DownloadBehavior::Deny,
            _ => DownloadBehavior::Default,
        };

        tab.send(SetDownloadBehaviorParams::new(DownloadBehavior::Deny)).await?;
        tab.note_download_behavior("deny");

        let (download, cache, ready) = Awaitable::new();
        let ready = Arc::new(Mutex::new(Some(ready)));
        tab.add_handler_sync(EventKind::PageDownloadWillBegin, move |event| {
            let CdpEvent::PageDownloadWillBegin(ev) = event else {
                return;
            };
            resolve_once(&cache, &ready, ev.clone());
        });

        Ok(Self {
            connection: tab.clone(),
            previous,
            download,
        })
    }

    pub async fn value(&self) -> Result<EventDownloadWillBegin> {
        self.download.get().await
    }
}

impl Drop for DownloadExpectation {
    fn drop(&mut self) {
        self.connection.remove_handlers(EventKind::PageDownloadWillBegin);
        let connection = self.connection.clone();
        let previous = self.previous;
        crate::runtime::spawn(async move {
            let behavior_str = match previous {
                DownloadBehavior::Allow => "allow",
                DownloadBehavior::Deny => "deny",
                DownloadBehavior::Default => "default",
            };
            if connection
                .send(SetDownloadBehaviorParams::new(previous))
                .await
                .is_ok()
            {
                connection.note_download_behavior(behavior_str);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_fullmatch_semantics() {
        let re = anchored("https://example\\.com/.*").unwrap();
        assert!(re.is_match("https://example.com/path"));
        assert!(!re.is_match("prefix-https://example.com/path"));
    }

    #[test]
    fn awaitable_resolves_once() {
        let (awaitable, cache, ready) = Awaitable::new();
        let ready = Arc::new(Mutex::new(Some(ready)));
        resolve_once(&cache, &ready, 1);
        resolve_once(&cache, &ready, 2);
        assert_eq!(*awaitable.cache.lock().unwrap(), Some(1));
    }
}
