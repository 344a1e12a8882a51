//! marquee-api — REST API for Marquee.
//!
//! Provides axum route handlers for creating and inspecting instances,
//! triggering deploys, and receiving chat slash-commands.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/instances` | Create an instance |
//! | GET | `/instance/{playbook_id}/{instance_id}` | Get one instance |
//! | DELETE | `/instance/{playbook_id}/{instance_id}` | Delete one instance |
//! | GET | `/instances/{playbook_id}` | List a playbook's instances |
//! | GET | `/status/{playbook_id}/{instance_id}` | Instance status only |
//! | POST | `/deploy/{playbook_id}/{instance_id}` | Deploy an instance |
//! | POST | `/command` | Chat slash-command (form: `token`, `text`, ...) |
//! | GET | `/command` | Chat handshake probe (`?ssl_check=1`) |
//!
//! Every failure is answered with `{"error": "..."}` and a fixed status code.

pub mod command_handlers;
pub mod error;
pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use marquee_command::Dispatcher;

pub use error::ApiError;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Dispatcher,
    /// Shared secret chat commands must present. `None` rejects them all.
    pub chat_token: Option<String>,
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/instances", post(handlers::create_instance))
        .route(
            "/instance/{playbook_id}/{instance_id}",
            get(handlers::get_instance).delete(handlers::delete_instance),
        )
        .route("/instances/{playbook_id}", get(handlers::list_instances))
        .route("/status/{playbook_id}/{instance_id}", get(handlers::get_status))
        .route("/deploy/{playbook_id}/{instance_id}", post(handlers::deploy_instance))
        .route(
            "/command",
            post(command_handlers::post_command).get(command_handlers::get_command),
        )
        .with_state(state)
}
