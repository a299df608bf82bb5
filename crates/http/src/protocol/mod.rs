//! Core HTTP protocol abstractions.
//!
//! This module provides the fundamental building blocks for representing
//! parsed HTTP messages inside the engine:
//!
//! - **Message Handling** ([`message`]): payload chunk and size types
//!   - [`PayloadItem`]: an individual payload chunk or the EOF marker
//!   - [`PayloadSize`]: payload size information
//!
//! - **Request Processing** ([`request`]): request header handling
//!   - [`RequestHeader`]: wraps HTTP request headers with additional accessors
//!
//! - **Response Processing** ([`response`]): response header handling
//!   - [`ResponseHead`]: type alias for response headers before body attachment
//!
//! - **Body Streaming** ([`body`]): request body handling
//!   - [`body::ReqBody`]: consumer side implementing `http_body::Body`
//!   - [`body::BodySender`]: producer side for streaming body chunks
//!
//! - **Error Handling** ([`error`]): message-level error types
//!   - [`HttpError`]: top-level error type
//!   - [`ParseError`]: request-side errors
//!   - [`SendError`]: response-side errors

mod message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
