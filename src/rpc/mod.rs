//! JSON-RPC 2.0 protocol engine
//!
//! Decodes raw payloads into calls, validates them, dispatches them to a
//! [`handler::Handler`] and formats the responses. Nothing in here touches the
//! transport.

pub mod audit;
pub mod codes;
pub mod dispatcher;
pub mod handler;
pub mod request;

pub use codes::ErrorCode;
pub use dispatcher::Dispatcher;
pub use handler::{Handler, MethodRegistry, Resolution};
pub use request::{Call, Outcome, Request};
