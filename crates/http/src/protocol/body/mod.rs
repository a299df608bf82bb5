mod req_body;

pub use req_body::BodySender;
pub use req_body::ReqBody;
