//! Wire protocol shared by the cadlink engines and the gateway.
//!
//! Every message is a single UTF-8 JSON object terminated by `\n`. Clients
//! send [`Command`] envelopes and engines answer with exactly one
//! [`Response`] per received frame, echoing the command identifier so that
//! pipelined requests can be correlated:
//!
//! ```json
//! {"id":"gw-1","method":"create_box","params":{"name":"B1"}}
//! {"id":"gw-1","status":"success","result":{"name":"B1"},"error":null}
//! ```
//!
//! The crate owns three concerns:
//!
//! - [`envelope`]: the request and response types plus their invariants.
//! - [`framing`]: incremental splitting of a byte stream into lines.
//! - [`codes`]: the error code vocabulary and its coarse classification.

pub mod codes;
mod decode;
pub mod envelope;
pub mod framing;

pub use codes::ErrorClass;
pub use decode::{DecodeError, decode_command, encode_line};
pub use envelope::{Command, ErrorBody, Params, Response, ResponseError, Status};
pub use framing::{DEFAULT_MAX_LINE_BYTES, Frame, LineBuffer};
