//! HTTP gateway: streaming chat endpoint plus session retrieval/deletion.

mod server;

pub use server::{build_router, start_server, GatewayState};
