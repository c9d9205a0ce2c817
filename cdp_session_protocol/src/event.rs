//! Tagged union over every event this core understands, plus the
//! domain table used for handler-driven enable/disable reconciliation.

use crate::{network, page, runtime, target};

/// A type-safe discriminant for `CdpEvent`, used as the handler-table key
/// instead of a dynamic type lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TargetCreated,
    TargetInfoChanged,
    TargetDestroyed,
    TargetCrashed,
    PageDownloadWillBegin,
    PageFrameNavigated,
    PageLoadEventFired,
    PageLifecycleEvent,
    RuntimeConsoleApiCalled,
    RuntimeBindingCalled,
    RuntimeExecutionContextCreated,
    NetworkRequestWillBeSent,
    NetworkResponseReceived,
}

/// The CDP domain a command/event belongs to, e.g. `Target`, `Network`.
pub type Domain = &'static str;

/// Domains that are always enabled implicitly and never disabled by
/// reconciliation.
pub const ALWAYS_ENABLED_DOMAINS: &[Domain] = &["Target", "Storage"];

impl EventKind {
    pub fn domain(self) -> Domain {
        match self {
            EventKind::TargetCreated
            | EventKind::TargetInfoChanged
            | EventKind::TargetDestroyed
            | EventKind::TargetCrashed => "Target",
            EventKind::PageDownloadWillBegin
            | EventKind::PageFrameNavigated
            | EventKind::PageLoadEventFired
            | EventKind::PageLifecycleEvent => "Page",
            EventKind::RuntimeConsoleApiCalled
            | EventKind::RuntimeBindingCalled
            | EventKind::RuntimeExecutionContextCreated => "Runtime",
            EventKind::NetworkRequestWillBeSent | EventKind::NetworkResponseReceived => {
                "Network"
            }
        }
    }

    pub fn from_identifier(method: &str) -> Option<Self> {
        Some(match method {
            "Target.targetCreated" => EventKind::TargetCreated,
            "Target.targetInfoChanged" => EventKind::TargetInfoChanged,
            "Target.targetDestroyed" => EventKind::TargetDestroyed,
            "Target.targetCrashed" => EventKind::TargetCrashed,
            "Page.downloadWillBegin" => EventKind::PageDownloadWillBegin,
            "Page.frameNavigated" => EventKind::PageFrameNavigated,
            "Page.loadEventFired" => EventKind::PageLoadEventFired,
            "Page.lifecycleEvent" => EventKind::PageLifecycleEvent,
            "Runtime.consoleAPICalled" => EventKind::RuntimeConsoleApiCalled,
            "Runtime.bindingCalled" => EventKind::RuntimeBindingCalled,
            "Runtime.executionContextCreated" => EventKind::RuntimeExecutionContextCreated,
            "Network.requestWillBeSent" => EventKind::NetworkRequestWillBeSent,
            "Network.responseReceived" => EventKind::NetworkResponseReceived,
            _ => return None,
        })
    }
}

/// Every event variant this core can parse and dispatch.
#[derive(Debug, Clone)]
pub enum CdpEvent {
    TargetCreated(target::EventTargetCreated),
    TargetInfoChanged(target::EventTargetInfoChanged),
    TargetDestroyed(target::EventTargetDestroyed),
    TargetCrashed(target::EventTargetCrashed),
    PageDownloadWillBegin(page::EventDownloadWillBegin),
    PageFrameNavigated(page::EventFrameNavigated),
    PageLoadEventFired(page::EventLoadEventFired),
    PageLifecycleEvent(page::EventLifecycleEvent),
    RuntimeConsoleApiCalled(runtime::EventConsoleApiCalled),
    RuntimeBindingCalled(runtime::EventBindingCalled),
    RuntimeExecutionContextCreated(runtime::EventExecutionContextCreated),
    NetworkRequestWillBeSent(network::EventRequestWillBeSent),
    NetworkResponseReceived(network::EventResponseReceived),
}

impl CdpEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CdpEvent::TargetCreated(_) => EventKind::TargetCreated,
            CdpEvent::TargetInfoChanged(_) => EventKind::TargetInfoChanged,
            CdpEvent::TargetDestroyed(_) => EventKind::TargetDestroyed,
            CdpEvent::TargetCrashed(_) => EventKind::TargetCrashed,
            CdpEvent::PageDownloadWillBegin(_) => EventKind::PageDownloadWillBegin,
            CdpEvent::PageFrameNavigated(_) => EventKind::PageFrameNavigated,
            CdpEvent::PageLoadEventFired(_) => EventKind::PageLoadEventFired,
            CdpEvent::PageLifecycleEvent(_) => EventKind::PageLifecycleEvent,
            CdpEvent::RuntimeConsoleApiCalled(_) => EventKind::RuntimeConsoleApiCalled,
            CdpEvent::RuntimeBindingCalled(_) => EventKind::RuntimeBindingCalled,
            CdpEvent::RuntimeExecutionContextCreated(_) => {
                EventKind::RuntimeExecutionContextCreated
            }
            CdpEvent::NetworkRequestWillBeSent(_) => EventKind::NetworkRequestWillBeSent,
            CdpEvent::NetworkResponseReceived(_) => EventKind::NetworkResponseReceived,
        }
    }

    /// Parses `{method, params}` into a typed event, or `None` for a
    /// method this core doesn't subscribe to (unrecognized events are
    /// dropped, not an error).
    pub fn parse(method: &str, params: serde_json::Value) -> serde_json::Result<Option<Self>> {
        Ok(Some(match EventKind::from_identifier(method) {
            Some(EventKind::TargetCreated) => CdpEvent::TargetCreated(serde_json::from_value(params)?),
            Some(EventKind::TargetInfoChanged) => {
                CdpEvent::TargetInfoChanged(serde_json::from_value(params)?)
            }
            Some(EventKind::TargetDestroyed) => {
                CdpEvent::TargetDestroyed(serde_json::from_value(params)?)
            }
            Some(EventKind::TargetCrashed) => CdpEvent::TargetCrashed(serde_json::from_value(params)?),
            Some(EventKind::PageDownloadWillBegin) => {
                CdpEvent::PageDownloadWillBegin(serde_json::from_value(params)?)
            }
            Some(EventKind::PageFrameNavigated) => {
                CdpEvent::PageFrameNavigated(serde_json::from_value(params)?)
            }
            Some(EventKind::PageLoadEventFired) => {
                CdpEvent::PageLoadEventFired(serde_json::from_value(params)?)
            }
            Some(EventKind::PageLifecycleEvent) => {
                CdpEvent::PageLifecycleEvent(serde_json::from_value(params)?)
            }
            Some(EventKind::RuntimeConsoleApiCalled) => {
                CdpEvent::RuntimeConsoleApiCalled(serde_json::from_value(params)?)
            }
            Some(EventKind::RuntimeBindingCalled) => {
                CdpEvent::RuntimeBindingCalled(serde_json::from_value(params)?)
            }
            Some(EventKind::RuntimeExecutionContextCreated) => {
                CdpEvent::RuntimeExecutionContextCreated(serde_json::from_value(params)?)
            }
            Some(EventKind::NetworkRequestWillBeSent) => {
                CdpEvent::NetworkRequestWillBeSent(serde_json::from_value(params)?)
            }
            Some(EventKind::NetworkResponseReceived) => {
                CdpEvent::NetworkResponseReceived(serde_json::from_value(params)?)
            }
            None => return Ok(None),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_event() {
        let params = serde_json::json!({"type": "log", "args": [], "executionContextId": 1, "timestamp": 0.0});
        let ev = CdpEvent::parse("Runtime.consoleAPICalled", params)
            .unwrap()
            .unwrap();
        assert_eq!(ev.kind(), EventKind::RuntimeConsoleApiCalled);
        assert_eq!(ev.kind().domain(), "Runtime");
    }

    #[test]
    fn unknown_method_is_none() {
        assert!(CdpEvent::parse("Foo.bar", serde_json::json!({}))
            .unwrap()
            .is_none());
    }
}
