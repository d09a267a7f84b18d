//! Routes validated calls to a [`Handler`] and folds the outcome back into the
//! call before it is serialized.

use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::MethodError;
use crate::logging::panic_message;
use crate::rpc::audit::redact_audit_params;
use crate::rpc::codes::ErrorCode;
use crate::rpc::handler::{Handler, Resolution};
use crate::rpc::request::{Call, Outcome, Request};

pub struct Dispatcher {
    handler: Box<dyn Handler>,
}

impl Dispatcher {
    pub fn new(handler: impl Handler + 'static) -> Self {
        Self {
            handler: Box::new(handler),
        }
    }

    /// Entry point for transports: decode, dispatch and serialize one payload.
    /// `None` means there is nothing to send back.
    pub fn handle_payload(&self, raw: &[u8]) -> Option<String> {
        self.handle(Request::from_slice(raw))
    }

    pub fn handle(&self, request: Request) -> Option<String> {
        match request {
            Request::Single(call) => self.handle_call(call),
            Request::Batch(children) => {
                let responses: Vec<String> = children
                    .into_iter()
                    .filter_map(|child| self.handle(child))
                    .collect();

                if responses.is_empty() {
                    None
                } else {
                    Some(format!("[{}]", responses.join(",")))
                }
            }
        }
    }

    pub fn handle_call(&self, mut call: Call) -> Option<String> {
        if !call.check_valid() {
            if let Outcome::Failure { code, message } = &call.outcome {
                debug!(code = *code, message = %message, "request rejected");
            }
            return call.to_response_json();
        }

        let Some(method) = call.method.clone() else {
            return call.to_response_json();
        };
        let audit_params = redact_audit_params(&call.params);

        match self.handler.resolve(&method) {
            Resolution::Missing | Resolution::Hidden => call.fail(ErrorCode::MethodNotFound),
            Resolution::Callable { required } if call.params.len() < required => {
                call.fail(ErrorCode::InvalidParams);
            }
            Resolution::Callable { .. } => {
                let params = std::mem::take(&mut call.params);
                match self.invoke(&method, params) {
                    Ok(result) => call.succeed(result),
                    Err(MethodError::InvalidParams { message }) => {
                        call.fail_with(ErrorCode::InvalidParams, message);
                    }
                    Err(MethodError::Failed { message }) if message.is_empty() => {
                        call.fail(ErrorCode::Exception);
                    }
                    Err(MethodError::Failed { message }) => {
                        call.fail_with(ErrorCode::Exception, message);
                    }
                }
            }
        }

        info!(
            method = %method,
            params = %audit_params,
            notification = call.is_notification(),
            outcome = if call.is_failed() { "failure" } else { "success" },
            "rpc call audited"
        );

        call.to_response_json()
    }

    fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value, MethodError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.handler.invoke(method, params)))
            .unwrap_or_else(|payload| {
                let message = panic_message(&*payload)
                    .unwrap_or(ErrorCode::Exception.message())
                    .to_string();
                warn!(method = %method, error = %message, "method panicked");
                Err(MethodError::failed(message))
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::Dispatcher;
    use crate::errors::MethodError;
    use crate::rpc::handler::{Handler, MethodRegistry, Resolution};

    /// Hand-written handler exercising the trait seam without the registry.
    struct Counter {
        calls: Arc<AtomicUsize>,
    }

    impl Handler for Counter {
        fn resolve(&self, method: &str) -> Resolution {
            match method {
                "bump" => Resolution::Callable { required: 0 },
                _ => Resolution::Missing,
            }
        }

        fn invoke(&self, _method: &str, _params: Vec<Value>) -> Result<Value, MethodError> {
            let previous = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!(previous + 1))
        }
    }

    fn dispatcher() -> Dispatcher {
        let registry = MethodRegistry::new()
            .register("echo", 1, |params| Ok(Value::Array(params)))
            .and_then(|registry| {
                registry.register("explode", 0, |_| Err(MethodError::failed("Kaboom!")))
            })
            .and_then(|registry| {
                registry.register("panics", 0, |_| panic!("handler bug"))
            })
            .and_then(|registry| {
                registry.register("silent", 0, |_| Err(MethodError::failed("")))
            })
            .and_then(|registry| {
                registry.register("panics_opaque", 0, |_| std::panic::panic_any(7_u8))
            })
            .and_then(|registry| {
                registry.register_hidden("internal", 0, |_| Ok(json!("secret")))
            })
            .and_then(|registry| {
                registry.register_typed("add", 2, |(left, right): (i64, i64)| Ok(left + right))
            })
            .and_then(|registry| {
                registry.register("subtract", 1, |params| {
                    let minuend = params[0]["minuend"].as_i64().unwrap_or_default();
                    let subtrahend = params[0]["subtrahend"].as_i64().unwrap_or_default();
                    Ok(json!(minuend - subtrahend))
                })
            })
            .expect("registry builds");
        Dispatcher::new(registry)
    }

    fn handle(raw: &str) -> Option<String> {
        dispatcher().handle_payload(raw.as_bytes())
    }

    #[test]
    fn dispatches_positional_params() {
        assert_eq!(
            handle(r#"{"jsonrpc":"2.0","method":"add","params":[40,2],"id":1}"#).as_deref(),
            Some(r#"{"jsonrpc":"2.0","result":42,"id":1}"#)
        );
    }

    #[test]
    fn dispatches_named_params_as_mapping() {
        assert_eq!(
            handle(
                r#"{"jsonrpc":"2.0","method":"subtract","params":{"subtrahend":23,"minuend":42},"id":"s"}"#
            )
            .as_deref(),
            Some(r#"{"jsonrpc":"2.0","result":19,"id":"s"}"#)
        );
    }

    #[test]
    fn zero_id_receives_a_response() {
        assert_eq!(
            handle(r#"{"jsonrpc":"2.0","method":"echo","params":["a"],"id":0}"#).as_deref(),
            Some(r#"{"jsonrpc":"2.0","result":["a"],"id":0}"#)
        );
    }

    #[test]
    fn unknown_method_is_not_found() {
        assert_eq!(
            handle(r#"{"jsonrpc":"2.0","method":"nope","id":7}"#).as_deref(),
            Some(r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found."},"id":7}"#)
        );
    }

    #[test]
    fn hidden_method_is_not_found() {
        assert_eq!(
            handle(r#"{"jsonrpc":"2.0","method":"internal","id":7}"#).as_deref(),
            Some(r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found."},"id":7}"#)
        );
    }

    #[test]
    fn method_fault_becomes_exception() {
        assert_eq!(
            handle(r#"{"jsonrpc":"2.0","method":"explode","id":2}"#).as_deref(),
            Some(r#"{"jsonrpc":"2.0","error":{"code":-32099,"message":"Kaboom!"},"id":2}"#)
        );
    }

    #[test]
    fn method_panic_becomes_exception() {
        assert_eq!(
            handle(r#"{"jsonrpc":"2.0","method":"panics","id":2}"#).as_deref(),
            Some(r#"{"jsonrpc":"2.0","error":{"code":-32099,"message":"handler bug"},"id":2}"#)
        );
    }

    #[test]
    fn faults_without_a_message_use_the_default_text() {
        let expected = Some(
            r#"{"jsonrpc":"2.0","error":{"code":-32099,"message":"Method raised an exception."},"id":2}"#,
        );

        assert_eq!(
            handle(r#"{"jsonrpc":"2.0","method":"silent","id":2}"#).as_deref(),
            expected
        );
        assert_eq!(
            handle(r#"{"jsonrpc":"2.0","method":"panics_opaque","id":2}"#).as_deref(),
            expected
        );
    }

    #[test]
    fn nested_batches_are_handled_recursively() {
        assert_eq!(
            handle(
                r#"[[{"jsonrpc":"2.0","method":"add","params":[1,2],"id":1}],{"jsonrpc":"2.0","method":"echo","params":["n"]},[{"jsonrpc":"2.0","method":"echo","params":["n"]}]]"#
            )
            .as_deref(),
            Some(r#"[[{"jsonrpc":"2.0","result":3,"id":1}]]"#)
        );
    }

    #[test]
    fn extra_positional_params_are_ignored_by_typed_methods() {
        assert_eq!(
            handle(r#"{"jsonrpc":"2.0","method":"add","params":[1,2,3],"id":1}"#).as_deref(),
            Some(r#"{"jsonrpc":"2.0","result":3,"id":1}"#)
        );
    }

    #[test]
    fn large_ids_are_echoed_verbatim() {
        assert_eq!(
            handle(r#"{"jsonrpc":"2.0","method":"echo","params":[1],"id":18446744073709551616}"#)
                .as_deref(),
            Some(r#"{"jsonrpc":"2.0","result":[1],"id":18446744073709551616}"#)
        );
    }

    #[test]
    fn too_few_params_is_invalid_params() {
        assert_eq!(
            handle(r#"{"jsonrpc":"2.0","method":"add","params":[1],"id":3}"#).as_deref(),
            Some(
                r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Too few parameters passed."},"id":3}"#
            )
        );
    }

    #[test]
    fn undecodable_typed_params_is_invalid_params() {
        let response = handle(r#"{"jsonrpc":"2.0","method":"add","params":["a","b"],"id":3}"#)
            .expect("response expected");
        let body: Value = serde_json::from_str(&response).expect("valid json");

        assert_eq!(body["error"]["code"], json!(-32602));
        assert_eq!(body["id"], json!(3));
    }

    #[test]
    fn validation_errors_are_returned_unchanged() {
        assert_eq!(
            handle(r#"{"jsonrpc":"1.0","method":"echo","params":["a"],"id":4}"#).as_deref(),
            Some(
                r#"{"jsonrpc":"2.0","error":{"code":-32000,"message":"Client/Server JSON-RPC version mismatch; Expected '2.0'"},"id":4}"#
            )
        );
        assert_eq!(
            handle(r#"{"jsonrpc":"2.0","method":"rpc.echo","id":5}"#).as_deref(),
            Some(
                r#"{"jsonrpc":"2.0","error":{"code":-32001,"message":"Illegal method name; Method cannot start with 'rpc.'"},"id":5}"#
            )
        );
    }

    #[test]
    fn parse_error_is_reported_with_null_id() {
        assert_eq!(
            handle(r#"{"jsonrpc":"2.0","method":"#).as_deref(),
            Some(r#"{"jsonrpc":"2.0","error":{"code":-32700,"message":"Parse error."},"id":null}"#)
        );
    }

    #[test]
    fn empty_batch_is_invalid_request() {
        assert_eq!(
            handle("[]").as_deref(),
            Some(r#"{"jsonrpc":"2.0","error":{"code":-32600,"message":"Invalid Request."},"id":null}"#)
        );
    }

    #[test]
    fn notification_batch_produces_nothing() {
        let notification = r#"{"jsonrpc":"2.0","method":"echo","params":["a"]}"#;
        let batch = format!("[{notification},{notification},{notification}]");

        assert_eq!(handle(&batch), None);
    }

    #[test]
    fn notifications_only_surface_failures() {
        assert_eq!(
            handle(r#"{"jsonrpc":"2.0","method":"explode","id":null}"#).as_deref(),
            Some(r#"{"jsonrpc":"2.0","error":{"code":-32099,"message":"Kaboom!"},"id":null}"#)
        );
        assert_eq!(handle(r#"{"jsonrpc":"2.0","method":"add","params":[1,2]}"#), None);
    }

    #[test]
    fn mixed_batch_keeps_input_order_and_skips_notifications() {
        let batch = r#"[
            {"jsonrpc":"2.0","method":"add","params":[1,2],"id":"1"},
            {"jsonrpc":"2.0","method":"echo","params":["n"]},
            {"foo":"boo"},
            {"jsonrpc":"2.0","method":"nope","id":"5"},
            1
        ]"#;

        assert_eq!(
            handle(batch).as_deref(),
            Some(concat!(
                r#"[{"jsonrpc":"2.0","result":3,"id":"1"},"#,
                r#"{"jsonrpc":"2.0","error":{"code":-32600,"message":"Invalid Request."},"id":null},"#,
                r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found."},"id":"5"},"#,
                r#"{"jsonrpc":"2.0","error":{"code":-32600,"message":"Invalid Request."},"id":null}]"#
            ))
        );
    }

    #[test]
    fn batch_children_run_sequentially_against_shared_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(Counter {
            calls: Arc::clone(&calls),
        });
        let batch = r#"[
            {"jsonrpc":"2.0","method":"bump","id":1},
            {"jsonrpc":"2.0","method":"bump"},
            {"jsonrpc":"2.0","method":"bump","id":3}
        ]"#;

        assert_eq!(
            dispatcher.handle_payload(batch.as_bytes()).as_deref(),
            Some(r#"[{"jsonrpc":"2.0","result":1,"id":1},{"jsonrpc":"2.0","result":3,"id":3}]"#)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
