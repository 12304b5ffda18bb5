//! Frame-to-response pipeline.

use std::sync::Arc;

use tracing::{debug, error, warn};

use cadlink_protocol::{Command, ErrorBody, Frame, Response, codes, decode_command};

use super::DISPATCH_TARGET;
use super::registry::Registry;
use crate::scheduler::{ExecutionError, JobRequest, Scheduler};

/// Turns frames into responses by way of the registry and the scheduler.
///
/// Every call produces exactly one [`Response`]; failures are reported in the
/// response body, never as a Rust error.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    scheduler: Arc<dyn Scheduler>,
    expose_internal_errors: bool,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("methods", &self.registry.len())
            .field("model", &self.scheduler.model())
            .field("expose_internal_errors", &self.expose_internal_errors)
            .finish()
    }
}

impl Dispatcher {
    /// Creates a dispatcher that hides panic details from clients.
    #[must_use]
    pub fn new(registry: Arc<Registry>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            registry,
            scheduler,
            expose_internal_errors: false,
        }
    }

    /// Includes panic payloads in `INTERNAL_ERROR` messages when `expose` is
    /// set.
    #[must_use]
    pub const fn with_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Registry consulted for lookups.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handles one frame read from connection `origin`.
    pub fn handle_frame(&self, frame: Frame, origin: u64) -> Response {
        match frame {
            Frame::Line(line) => self.handle_line(&line, origin),
            Frame::Oversized { limit } => {
                warn!(target: DISPATCH_TARGET, origin, limit, "oversized request discarded");
                Response::failure(
                    None,
                    ErrorBody::new(
                        codes::INVALID_REQUEST,
                        format!("request exceeds {limit} byte limit"),
                    ),
                )
            }
        }
    }

    /// Decodes and dispatches one line.
    pub fn handle_line(&self, line: &[u8], origin: u64) -> Response {
        match decode_command(line) {
            Ok(command) => self.dispatch(command, origin),
            Err(error) => {
                warn!(target: DISPATCH_TARGET, origin, %error, "undecodable request");
                error.into_response()
            }
        }
    }

    /// Runs a decoded command.
    pub fn dispatch(&self, command: Command, origin: u64) -> Response {
        let Command { id, method, params } = command;
        let Some(entry) = self.registry.get(&method) else {
            warn!(target: DISPATCH_TARGET, origin, %method, "unknown method");
            return Response::failure(
                Some(id),
                ErrorBody::new(codes::UNKNOWN_METHOD, format!("Unknown method: '{method}'"))
                    .with_detail("method", method.as_str()),
            );
        };

        if let Err(error) = entry.schema().validate(&params) {
            warn!(target: DISPATCH_TARGET, origin, %method, %error, "rejected parameters");
            return Response::failure(Some(id), error.into_body());
        }

        debug!(target: DISPATCH_TARGET, origin, %id, %method, "dispatching command");
        let handler = entry.handler();
        let request = JobRequest::new(
            method.as_str(),
            origin,
            Box::new(move |session| handler(session, &params)),
        );

        match self.scheduler.execute(request) {
            Ok(result) => Response::success(id, result),
            Err(failure) => Response::failure(Some(id), self.failure_body(&method, failure)),
        }
    }

    fn failure_body(&self, method: &str, failure: ExecutionError) -> ErrorBody {
        match failure {
            ExecutionError::Handler(error) => {
                debug!(target: DISPATCH_TARGET, %method, code = error.code(), %error, "handler failed");
                error.into_body()
            }
            ExecutionError::Panicked { message } => {
                error!(target: DISPATCH_TARGET, %method, panic = %message, "handler panicked");
                let text = if self.expose_internal_errors {
                    format!("internal error while executing '{method}': {message}")
                } else {
                    format!("internal error while executing '{method}'")
                };
                ErrorBody::new(codes::INTERNAL_ERROR, text)
            }
            ExecutionError::ShuttingDown => {
                ErrorBody::new(codes::SHUTTING_DOWN, "engine is shutting down")
            }
            ExecutionError::ContextLost => {
                error!(target: DISPATCH_TARGET, %method, "execution context lost");
                ErrorBody::new(
                    codes::INTERNAL_ERROR,
                    format!("internal error while executing '{method}'"),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    use cadlink_config::EngineKind;
    use cadlink_protocol::Status;

    use super::*;
    use crate::dispatch::{HandlerError, ParamKind, ParamSchema, ParamsExt, RegistryBuilder};
    use crate::kernel::AnalyticKernel;
    use crate::scheduler::LockScheduler;
    use crate::session::EngineSession;

    #[fixture]
    fn dispatcher() -> Dispatcher {
        let mut builder = RegistryBuilder::new();
        builder
            .register(
                "echo",
                ParamSchema::new().required("text", ParamKind::String),
                |_, params| Ok(json!(params.str_param("text")?)),
            )
            .expect("register echo");
        builder
            .register("bump", ParamSchema::new(), |session, _| {
                session.touch();
                Ok(json!(session.revision()))
            })
            .expect("register bump");
        builder
            .register("missing", ParamSchema::new(), |_, _| {
                Err(HandlerError::object_not_found("Ghost"))
            })
            .expect("register missing");
        builder
            .register("explode", ParamSchema::new(), |_, _| -> Result<Value, HandlerError> {
                panic!("secret detail at /home/user")
            })
            .expect("register explode");
        let session = EngineSession::new(
            EngineKind::Solid,
            Arc::new(AnalyticKernel::new()),
            Utf8PathBuf::from("."),
        );
        Dispatcher::new(
            Arc::new(builder.build()),
            Arc::new(LockScheduler::new(session)),
        )
    }

    fn line(dispatcher: &Dispatcher, text: &str) -> Response {
        dispatcher.handle_line(text.as_bytes(), 1)
    }

    #[rstest]
    fn successful_commands_echo_the_id(dispatcher: Dispatcher) {
        let response = line(
            &dispatcher,
            r#"{"id":"a-1","method":"echo","params":{"text":"hi"}}"#,
        );
        assert_eq!(response.id.as_deref(), Some("a-1"));
        assert_eq!(response.status, Status::Success);
        assert_eq!(response.result, Some(json!("hi")));
    }

    #[rstest]
    fn unknown_methods_name_the_method(dispatcher: Dispatcher) {
        let response = line(&dispatcher, r#"{"id":"u","method":"frobnicate"}"#);
        assert_eq!(response.id.as_deref(), Some("u"));
        assert_eq!(response.error_code(), Some(codes::UNKNOWN_METHOD));
        let error = response.error.expect("error body");
        assert!(error.message.contains("frobnicate"));
    }

    #[rstest]
    #[case(r#"{"id":"p","method":"echo"}"#)]
    #[case(r#"{"id":"p","method":"echo","params":{"text":5}}"#)]
    fn bad_parameters_never_reach_the_handler(dispatcher: Dispatcher, #[case] text: &str) {
        let response = line(&dispatcher, text);
        assert_eq!(response.error_code(), Some(codes::INVALID_PARAMS));
        let details = response
            .error
            .and_then(|error| error.details)
            .expect("details");
        assert_eq!(details.get("field"), Some(&json!("text")));
    }

    #[rstest]
    fn domain_errors_keep_their_code(dispatcher: Dispatcher) {
        let response = line(&dispatcher, r#"{"id":"m","method":"missing"}"#);
        assert_eq!(response.error_code(), Some(codes::OBJECT_NOT_FOUND));
    }

    #[rstest]
    fn panics_are_sanitised_and_the_engine_keeps_serving(dispatcher: Dispatcher) {
        let response = line(&dispatcher, r#"{"id":"x","method":"explode"}"#);
        assert_eq!(response.error_code(), Some(codes::INTERNAL_ERROR));
        let message = response.error.expect("error body").message;
        assert_eq!(message, "internal error while executing 'explode'");

        let response = line(&dispatcher, r#"{"id":"b","method":"bump"}"#);
        assert_eq!(response.result, Some(json!(1)));
    }

    #[rstest]
    fn panic_details_are_shown_when_enabled(dispatcher: Dispatcher) {
        let dispatcher = dispatcher.with_internal_errors(true);
        let response = line(&dispatcher, r#"{"id":"x","method":"explode"}"#);
        let message = response.error.expect("error body").message;
        assert!(message.contains("secret detail"));
    }

    #[rstest]
    fn parse_errors_carry_a_null_id(dispatcher: Dispatcher) {
        let response = line(&dispatcher, "{oops");
        assert_eq!(response.id, None);
        assert_eq!(response.error_code(), Some(codes::PARSE_ERROR));
    }

    #[rstest]
    fn oversized_frames_are_invalid_requests(dispatcher: Dispatcher) {
        let response = dispatcher.handle_frame(Frame::Oversized { limit: 64 }, 1);
        assert_eq!(response.id, None);
        assert_eq!(response.error_code(), Some(codes::INVALID_REQUEST));
        assert_eq!(
            response.error.expect("error body").message,
            "request exceeds 64 byte limit"
        );
    }

    #[rstest]
    fn closed_scheduler_reports_shutting_down(dispatcher: Dispatcher) {
        dispatcher.scheduler.close();
        let response = line(&dispatcher, r#"{"id":"s","method":"bump"}"#);
        assert_eq!(response.id.as_deref(), Some("s"));
        assert_eq!(response.error_code(), Some(codes::SHUTTING_DOWN));
    }
}
