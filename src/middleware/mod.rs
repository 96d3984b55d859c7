pub mod request_context;

pub use request_context::{
    make_span_with_request_id, request_context_middleware, ClientId, RequestId,
    CLIENT_ID_HEADER, REQUEST_ID_HEADER,
};
