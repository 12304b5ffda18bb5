//! WebSocket envelopes.
//!
//! Each text message carries one typed envelope:
//!
//! ```json
//! {"type":"command","method":"create_cube","params":{"size":2.0}}
//! {"type":"execute","code":"print(1)"}
//! {"type":"ping"}
//! ```
//!
//! Commands and executions become one engine command each; the reply is a
//! `command_result`, `execute_result`, `pong` or `error` envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use cadlink_config::EngineKind;
use cadlink_protocol::{ErrorBody, Params, Response, codes};

use super::{gateway_error_body, sanitise};
use crate::client::CommandSender;

/// Method that runs script code on an engine.
pub const EXECUTE_METHOD: &str = "execute_python";

/// Envelope received from a WebSocket client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Invoke a method.
    Command {
        /// Method name.
        method: String,
        /// Method parameters.
        #[serde(default)]
        params: Params,
    },
    /// Run script code.
    Execute {
        /// Script source.
        code: String,
    },
    /// Keep-alive probe.
    Ping,
}

/// Envelope sent back to a WebSocket client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Outcome of a `command` envelope.
    CommandResult {
        /// Method that ran.
        method: String,
        /// Whether the engine reported success.
        success: bool,
        /// Engine result on success.
        result: Option<Value>,
        /// Sanitised error otherwise.
        error: Option<ErrorBody>,
    },
    /// Outcome of an `execute` envelope.
    ExecuteResult {
        /// Whether the engine reported success.
        success: bool,
        /// Engine result on success.
        result: Option<Value>,
        /// Sanitised error otherwise.
        error: Option<ErrorBody>,
    },
    /// Answer to `ping`.
    Pong,
    /// The envelope could not be handled.
    Error {
        /// Machine-readable code.
        code: String,
        /// Explanation.
        message: String,
    },
}

impl ServerMessage {
    fn from_error(error: ErrorBody) -> Self {
        Self::Error {
            code: error.code,
            message: error.message,
        }
    }
}

/// Handles one text message for `engine` and returns the reply to send.
#[must_use]
pub fn handle_text(sender: &dyn CommandSender, engine: EngineKind, text: &str) -> ServerMessage {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => handle_message(sender, engine, message),
        Err(error) => ServerMessage::Error {
            code: codes::INVALID_REQUEST.to_owned(),
            message: format!("invalid envelope: {error}"),
        },
    }
}

/// Handles a decoded envelope.
#[must_use]
pub fn handle_message(
    sender: &dyn CommandSender,
    engine: EngineKind,
    message: ClientMessage,
) -> ServerMessage {
    match message {
        ClientMessage::Ping => ServerMessage::Pong,
        ClientMessage::Command { method, params } => {
            match sender.send_command(engine, &method, params) {
                Ok(response) => {
                    let (success, result, error) = outcome(response);
                    ServerMessage::CommandResult {
                        method,
                        success,
                        result,
                        error,
                    }
                }
                Err(error) => ServerMessage::from_error(gateway_error_body(&error)),
            }
        }
        ClientMessage::Execute { code } => {
            let mut params = Map::new();
            params.insert("code".to_owned(), Value::String(code));
            match sender.send_command(engine, EXECUTE_METHOD, params) {
                Ok(response) => {
                    let (success, result, error) = outcome(response);
                    ServerMessage::ExecuteResult {
                        success,
                        result,
                        error,
                    }
                }
                Err(error) => ServerMessage::from_error(gateway_error_body(&error)),
            }
        }
    }
}

fn outcome(response: Response) -> (bool, Option<Value>, Option<ErrorBody>) {
    let success = response.is_success();
    (success, response.result, response.error.as_ref().map(sanitise))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::GatewayError;

    #[derive(Default)]
    struct RecordingSender {
        calls: Mutex<Vec<(EngineKind, String, Params)>>,
        fail: bool,
    }

    impl CommandSender for RecordingSender {
        fn send_command(
            &self,
            engine: EngineKind,
            method: &str,
            params: Params,
        ) -> Result<Response, GatewayError> {
            self.calls
                .lock()
                .expect("calls lock")
                .push((engine, method.to_owned(), params));
            if self.fail {
                return Err(GatewayError::Timeout {
                    engine,
                    method: method.to_owned(),
                    timeout: Duration::from_secs(1),
                });
            }
            Ok(Response::success("gw-1", json!({"ok": true})))
        }
    }

    #[rstest]
    fn ping_is_answered_locally() {
        let sender = RecordingSender::default();
        let reply = handle_text(&sender, EngineKind::Mesh, r#"{"type":"ping"}"#);
        assert_eq!(reply, ServerMessage::Pong);
        assert!(sender.calls.lock().expect("calls lock").is_empty());
    }

    #[rstest]
    fn execute_maps_to_the_script_method() {
        let sender = RecordingSender::default();
        let reply = handle_text(
            &sender,
            EngineKind::Solid,
            r#"{"type":"execute","code":"print(1)"}"#,
        );
        assert!(matches!(reply, ServerMessage::ExecuteResult { success: true, .. }));
        let calls = sender.calls.lock().expect("calls lock");
        let (engine, method, params) = calls.first().expect("one call");
        assert_eq!(*engine, EngineKind::Solid);
        assert_eq!(method, EXECUTE_METHOD);
        assert_eq!(params.get("code"), Some(&json!("print(1)")));
    }

    #[rstest]
    fn command_results_name_the_method() {
        let sender = RecordingSender::default();
        let reply = handle_text(
            &sender,
            EngineKind::Mesh,
            r#"{"type":"command","method":"create_cube","params":{"size":2}}"#,
        );
        let json = serde_json::to_value(&reply).expect("serialise reply");
        assert_eq!(json["type"], "command_result");
        assert_eq!(json["method"], "create_cube");
        assert_eq!(json["result"]["ok"], true);
    }

    #[rstest]
    fn unknown_envelopes_are_rejected() {
        let sender = RecordingSender::default();
        let reply = handle_text(&sender, EngineKind::Mesh, r#"{"type":"dance"}"#);
        assert!(matches!(reply, ServerMessage::Error { code, .. } if code == codes::INVALID_REQUEST));
    }

    #[rstest]
    fn gateway_failures_become_error_envelopes() {
        let sender = RecordingSender {
            fail: true,
            ..RecordingSender::default()
        };
        let reply = handle_text(
            &sender,
            EngineKind::Mesh,
            r#"{"type":"command","method":"ping"}"#,
        );
        let json = serde_json::to_value(&reply).expect("serialise reply");
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "BACKEND_UNAVAILABLE");
    }
}
