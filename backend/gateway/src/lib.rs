//! ChatForge HTTP gateway: `/chat`, `/reset`, `/health`, and the landing page.

pub mod chat;
pub mod control_ui;
pub mod error;
pub mod extract;
pub mod health_api;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, start_server, GatewayState};
