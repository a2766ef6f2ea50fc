use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gangway_core::errors::InterfaceError;
use gangway_fulfillment::intents::{TurnContext, TurnOutcome};
use gangway_fulfillment::request::{WebhookRequest, WebhookResponse};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bootstrap::Application;
use crate::health;

pub fn router(app: Arc<Application>) -> Router {
    Router::new()
        .route("/fulfillment", post(fulfillment))
        .route("/health", get(health::health))
        .with_state(app)
}

/// The single webhook endpoint. The body is parsed by hand so a malformed
/// payload maps to a correlation-id-carrying 400 instead of the framework's
/// default rejection; every parsed request produces a 200 with a platform
/// reply.
async fn fulfillment(State(app): State<Arc<Application>>, body: String) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    let request = match serde_json::from_str::<WebhookRequest>(&body) {
        Ok(request) => request,
        Err(error) => {
            let interface = InterfaceError::bad_request(error.to_string(), correlation_id);
            warn!(
                event_name = "ingress.fulfillment.request_rejected",
                correlation_id = %interface.correlation_id(),
                error = %interface,
                "webhook body could not be parsed"
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": interface.user_message(),
                    "correlationId": interface.correlation_id(),
                })),
            )
                .into_response();
        }
    };

    info!(
        event_name = "ingress.fulfillment.request_received",
        correlation_id = %correlation_id,
        session = %request.session,
        intent = %request.intent.display_name,
        "fulfillment webhook received"
    );

    let ctx = TurnContext { correlation_id };
    match app.router.route(&request, &ctx).await {
        TurnOutcome::Responded(response) => Json(response).into_response(),
        // An empty reply tells the platform to fall back to its own response.
        TurnOutcome::Unhandled => Json(WebhookResponse::default()).into_response(),
    }
}
