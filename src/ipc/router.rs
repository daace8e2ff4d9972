use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

type TryHandle = fn(&mut AppState, &Request) -> Option<serde_json::Value>;

const HANDLERS: [TryHandle; 9] = [
    handlers::core::try_handle,
    handlers::sections::try_handle,
    handlers::classes::try_handle,
    handlers::students::try_handle,
    handlers::schedule::try_handle,
    handlers::attendance::try_handle,
    handlers::grades::try_handle,
    handlers::quiz::try_handle,
    handlers::setup::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    tracing::debug!(id = %req.id, method = %req.method, "dispatch");
    for try_handle in HANDLERS {
        if let Some(resp) = try_handle(state, &req) {
            return resp;
        }
    }

    tracing::debug!(id = %req.id, method = %req.method, "unknown method");
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
