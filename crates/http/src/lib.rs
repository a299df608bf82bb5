//! HTTP message layer for the weft request lifecycle engine.
//!
//! This crate provides the message-level building blocks the engine operates
//! on: request headers, response heads, streaming request bodies and the
//! protocol error taxonomy. It deliberately contains no transport or codec
//! code — framing bytes on the wire is a separate concern, and this crate
//! only defines what a parsed message looks like once it reaches the engine.
//!
//! # Core Components
//!
//! - [`protocol::RequestHeader`]: parsed request head with media-type accessors
//! - [`protocol::ResponseHead`]: response head alias before body attachment
//! - [`protocol::body::ReqBody`]: streaming request body implementing
//!   `http_body::Body`, fed by a transport-side writer half
//! - [`protocol::HttpError`] / [`protocol::ParseError`] / [`protocol::SendError`]:
//!   message-level errors, including peer-disconnect classification

pub mod protocol;
