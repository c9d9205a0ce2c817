//! Page binding bridge: exposes host functions to in-page JS via a small
//! injected controller script plus `Runtime.addBinding`/
//! `Runtime.bindingCalled`.
//!
//! One low-level CDP binding bridges every exposed function into the
//! page, a page-side controller object fans calls back out by name and
//! sequence number, and the host resolves each call and delivers the
//! result back into the matching JS promise.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::warn;

use cdp_session_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, RemoveScriptToEvaluateOnNewDocumentParams,
};
use cdp_session_protocol::runtime::{
    AddBindingParams, CallArgument, CallFunctionOnParams, EvaluateParams, EventBindingCalled,
};
use cdp_session_protocol::{CdpEvent, EventKind};

use crate::connection::Connection;
use crate::error::{CdpError, Result};

const CONTROLLER_GLOBAL: &str = "__cdp_session_binding_controller__";
const BRIDGE_BINDING_NAME: &str = "__cdp_session_binding__";

fn controller_init_script() -> String {
    format!(
        r#"(() => {{
  if (globalThis['{CONTROLLER_GLOBAL}']) return;
  class BindingsController {{
    constructor(global, bridgeName) {{
      this._bindings = new Map();
      this._global = global;
      this._bridgeName = bridgeName;
    }}
    addBinding(name, needsHandle) {{
      const data = {{ callbacks: new Map(), lastSeq: 0, handles: new Map(), removed: false }};
      this._bindings.set(name, data);
      this._global[name] = (...args) => {{
        if (data.removed) throw new Error(`binding "${{name}}" has been removed`);
        const seq = ++data.lastSeq;
        const promise = new Promise((resolve, reject) => data.callbacks.set(seq, {{ resolve, reject }}));
        let payload;
        if (needsHandle) {{
          data.handles.set(seq, args[0]);
          payload = {{ name, seq }};
        }} else {{
          payload = {{ name, seq, serializedArgs: args }};
        }}
        this._global[this._bridgeName](JSON.stringify(payload));
        return promise;
      }};
    }}
    removeBinding(name) {{
      const data = this._bindings.get(name);
      if (data) data.removed = true;
      this._bindings.delete(name);
      delete this._global[name];
    }}
    takeBindingHandle(arg) {{
      const handles = this._bindings.get(arg.name).handles;
      const handle = handles.get(arg.seq);
      handles.delete(arg.seq);
      return handle;
    }}
    deliverBindingResult(arg) {{
      const callbacks = this._bindings.get(arg.name).callbacks;
      if ('error' in arg) callbacks.get(arg.seq).reject(arg.error);
      else callbacks.get(arg.seq).resolve(arg.result);
      callbacks.delete(arg.seq);
    }}
  }}
  globalThis['{CONTROLLER_GLOBAL}'] = new BindingsController(globalThis, '{BRIDGE_BINDING_NAME}');
}})();"#
    )
}

fn add_binding_script(name: &str, needs_handle: bool) -> String {
    format!(
        "(() => {{ globalThis['{CONTROLLER_GLOBAL}'].addBinding({}, {}); }})();",
        serde_json::to_string(name).unwrap_or_default(),
        needs_handle
    )
}

fn remove_binding_script(name: &str) -> String {
    format!(
        "(() => {{ globalThis['{CONTROLLER_GLOBAL}'].removeBinding({}); }})();",
        serde_json::to_string(name).unwrap_or_default()
    )
}

/// Arguments handed to an exposed function: either the JSON-decoded call
/// arguments, or the object id of a single handle argument when the
/// binding was exposed with `needs_handle: true`.
pub enum BindingArgs {
    Values(Vec<Value>),
    Handle(Option<String>),
}

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type BindingFn = dyn Fn(BindingArgs) -> BoxFuture<Result<Value>> + Send + Sync;

struct ExposedFunction {
    needs_handle: bool,
    handler: Arc<BindingFn>,
    script_id: String,
}

/// A bridge from in-page JS calls to host-side async functions, scoped to
/// one target's [`Connection`].
pub struct Bindings {
    connection: Connection,
    functions: Arc<Mutex<HashMap<String, ExposedFunction>>>,
}

impl Bindings {
    pub async fn new(tab: &Connection) -> Result<Self> {
        let init = controller_init_script();
        tab.send(AddScriptToEvaluateOnNewDocumentParams::new(init.clone()))
            .await?;
        tab.send(EvaluateParams::new(init)).await?;
        tab.send(AddBindingParams::new(BRIDGE_BINDING_NAME)).await?;

        let functions: Arc<Mutex<HashMap<String, ExposedFunction>>> = Arc::new(Mutex::new(HashMap::new()));

        let connection = tab.clone();
        let dispatch_table = functions.clone();
        tab.add_handler_async(EventKind::RuntimeBindingCalled, move |event| {
            let connection = connection.clone();
            let dispatch_table = dispatch_table.clone();
            async move {
                let CdpEvent::RuntimeBindingCalled(ev) = event else {
                    return;
                };
                if ev.name != BRIDGE_BINDING_NAME {
                    return;
                }
                if let Err(err) = dispatch_call(&connection, &dispatch_table, ev).await {
                    warn!(%err, "binding dispatch failed");
                }
            }
        });

        Ok(Self {
            connection: tab.clone(),
            functions,
        })
    }

    /// Exposes `handler` to in-page JS as `globalThis[name]`, returning a
    /// promise the page can await.
    pub async fn expose_function(
        &self,
        name: impl Into<String>,
        needs_handle: bool,
        handler: impl Fn(BindingArgs) -> BoxFuture<Result<Value>> + Send + Sync + 'static,
    ) -> Result<()> {
        let name = name.into();
        let init = add_binding_script(&name, needs_handle);
        let script = self
            .connection
            .send(AddScriptToEvaluateOnNewDocumentParams::new(init.clone()))
            .await?;
        self.connection.send(EvaluateParams::new(init)).await?;

        self.functions.lock().unwrap().insert(
            name,
            ExposedFunction {
                needs_handle,
                handler: Arc::new(handler),
                script_id: script.identifier,
            },
        );
        Ok(())
    }

    /// Removes a previously exposed function from both this document and
    /// any document navigated to afterwards.
    pub async fn remove_function(&self, name: &str) -> Result<()> {
        let removed = self.functions.lock().unwrap().remove(name);
        let Some(exposed) = removed else {
            return Ok(());
        };
        let _ = self.connection.send(EvaluateParams::new(remove_binding_script(name))).await;
        self.connection
            .send(RemoveScriptToEvaluateOnNewDocumentParams::new(exposed.script_id))
            .await?;
        Ok(())
    }
}

struct BindingCall {
    name: String,
    seq: i64,
    serialized_args: Option<Vec<Value>>,
}

fn parse_binding_payload(payload: &str) -> Result<BindingCall> {
    let value: Value = serde_json::from_str(payload)?;
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| CdpError::Binding("binding payload missing `name`".to_string()))?
        .to_string();
    let seq = value
        .get("seq")
        .and_then(Value::as_i64)
        .ok_or_else(|| CdpError::Binding("binding payload missing `seq`".to_string()))?;
    let serialized_args = value
        .get("serializedArgs")
        .and_then(Value::as_array)
        .cloned();
    Ok(BindingCall {
        name,
        seq,
        serialized_args,
    })
}

async fn dispatch_call(
    connection: &Connection,
    functions: &Arc<Mutex<HashMap<String, ExposedFunction>>>,
    event: EventBindingCalled,
) -> Result<()> {
    let call = parse_binding_payload(&event.payload)?;

    let (needs_handle, handler) = {
        let table = functions.lock().unwrap();
        let exposed = table
            .get(&call.name)
            .ok_or_else(|| CdpError::Binding(format!("function \"{}\" is not exposed", call.name)))?;
        (exposed.needs_handle, exposed.handler.clone())
    };

    let args = if needs_handle {
        let handle_arg = serde_json::json!({"name": call.name, "seq": call.seq});
        let taken = connection
            .send(CallFunctionOnParams {
                function_declaration: format!(
                    "arg => globalThis['{CONTROLLER_GLOBAL}'].takeBindingHandle(arg)"
                ),
                object_id: None,
                execution_context_id: Some(event.execution_context_id),
                arguments: Some(vec![CallArgument {
                    value: Some(handle_arg),
                    object_id: None,
                }]),
                await_promise: Some(false),
            })
            .await?;
        BindingArgs::Handle(taken.result.object_id)
    } else {
        BindingArgs::Values(call.serialized_args.unwrap_or_default())
    };

    let delivery = match handler(args).await {
        Ok(result) => serde_json::json!({"name": call.name, "seq": call.seq, "result": result}),
        Err(err) => serde_json::json!({"name": call.name, "seq": call.seq, "error": err.to_string()}),
    };

    let outcome = connection
        .send(CallFunctionOnParams {
            function_declaration: format!(
                "arg => globalThis['{CONTROLLER_GLOBAL}'].deliverBindingResult(arg)"
            ),
            object_id: None,
            execution_context_id: Some(event.execution_context_id),
            arguments: Some(vec![CallArgument {
                value: Some(delivery),
                object_id: None,
            }]),
            await_promise: Some(false),
        })
        .await;
    if let Err(err) = outcome {
        warn!(%err, name = %call.name, "failed to deliver binding result back to page");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_value_call_payload() {
        let payload = r#"{"name":"greet","seq":1,"serializedArgs":["world",42]}"#;
        let call = parse_binding_payload(payload).unwrap();
        assert_eq!(call.name, "greet");
        assert_eq!(call.seq, 1);
        assert_eq!(call.serialized_args.unwrap().len(), 2);
    }

    #[test]
    fn parses_handle_call_payload_without_args() {
        let payload = r#"{"name":"onClick","seq":7}"#;
        let call = parse_binding_payload(payload).unwrap();
        assert_eq!(call.seq, 7);
        assert!(call.serialized_args.is_none());
    }

    #[test]
    fn missing_name_is_an_error() {
        assert!(parse_binding_payload(r#"{"seq":1}"#).is_err());
    }

    #[test]
    fn add_binding_script_escapes_name() {
        let script = add_binding_script("weird\"name", true);
        assert!(script.contains(r#"\"weird\\\"name\""#) || script.contains("weird"));
        assert!(script.contains("true"));
    }
}
