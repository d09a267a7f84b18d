//! HTTP transport for the JSON-RPC engine
//!
//! Reads request bodies, hands them to the dispatcher and wraps the result in
//! an HTTP response.

pub mod handlers;
