//! `Runtime` domain: script evaluation and the binding-call channel.

use serde::{Deserialize, Serialize};

use crate::empty_result::EmptyResult;

#[derive(Debug, Clone, Serialize)]
pub struct EnableParams {}

impl_command!(EnableParams, "Runtime.enable", EmptyResult);

#[derive(Debug, Clone, Serialize)]
pub struct DisableParams {}

impl_command!(DisableParams, "Runtime.disable", EmptyResult);

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub object_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    pub text: String,
    pub line_number: i64,
    pub column_number: i64,
    #[serde(default)]
    pub exception: Option<RemoteObject>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
}

impl EvaluateParams {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            context_id: None,
            return_by_value: None,
            await_promise: None,
        }
    }
}

impl<T: Into<String>> From<T> for EvaluateParams {
    fn from(expr: T) -> Self {
        EvaluateParams::new(expr)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResult {
    pub result: RemoteObject,
    #[serde(default)]
    pub exception_details: Option<ExceptionDetails>,
}

impl_command!(EvaluateParams, "Runtime.evaluate", EvaluateResult);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBindingParams {
    pub name: String,
}

impl AddBindingParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl_command!(AddBindingParams, "Runtime.addBinding", EmptyResult);

#[derive(Debug, Clone, Serialize)]
pub struct RemoveBindingParams {
    pub name: String,
}

impl RemoveBindingParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl_command!(RemoveBindingParams, "Runtime.removeBinding", EmptyResult);

#[derive(Debug, Clone, Serialize, Default)]
pub struct CallArgument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFunctionOnParams {
    pub function_declaration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_context_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<CallArgument>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
}

impl CallFunctionOnParams {
    pub fn new(function_declaration: impl Into<String>) -> Self {
        Self {
            function_declaration: function_declaration.into(),
            object_id: None,
            execution_context_id: None,
            arguments: None,
            await_promise: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFunctionOnResult {
    pub result: RemoteObject,
    #[serde(default)]
    pub exception_details: Option<ExceptionDetails>,
}

impl_command!(
    CallFunctionOnParams,
    "Runtime.callFunctionOn",
    CallFunctionOnResult
);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventConsoleApiCalled {
    #[serde(rename = "type")]
    pub kind: String,
    pub args: Vec<RemoteObject>,
    pub execution_context_id: i64,
    pub timestamp: f64,
}
impl_method!(EventConsoleApiCalled, "Runtime.consoleAPICalled");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBindingCalled {
    pub name: String,
    pub payload: String,
    pub execution_context_id: i64,
}
impl_method!(EventBindingCalled, "Runtime.bindingCalled");

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionContextDescription {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventExecutionContextCreated {
    pub context: ExecutionContextDescription,
}
impl_method!(
    EventExecutionContextCreated,
    "Runtime.executionContextCreated"
);
