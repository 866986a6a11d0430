//! SMS relay and delivery history

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{post, MethodRouter},
    Json, Router,
};
use tower::steer::Steer;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::{
    error::{AppError, AppResult},
    models::notification::{DeadLetter, RelayRequest, SmsRecord},
    services::sms::RelayOutcome,
    AppState,
};

/// `/sms/send` with a per-IP quota. Loopback peers, which include the
/// server's own dispatcher when `relay_url` points back here, bypass it.
pub fn relay_router(state: AppState) -> AppResult<Router> {
    let sms = &state.config.sms;
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(sms.relay_replenish_secs.max(1))
        .burst_size(sms.relay_burst.max(1))
        .finish()
        .ok_or_else(|| AppError::Internal("Invalid SMS relay rate limit".to_string()))?;

    let limited: MethodRouter = post(send_sms)
        .with_state(state.clone())
        .layer(GovernorLayer {
            config: Box::leak(Box::new(governor_conf)),
        });
    let local: MethodRouter = post(send_sms).with_state(state);

    let relay = Steer::new(
        vec![limited, local],
        |request: &Request, _: &[MethodRouter]| usize::from(is_loopback_peer(request)),
    );
    Ok(Router::new().route_service("/sms/send", relay))
}

fn is_loopback_peer(request: &Request) -> bool {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .is_some_and(|ConnectInfo(addr)| addr.ip().is_loopback())
}

/// Relay a message to the SMS provider.
///
/// The body mirrors what the desk clients post: `phoneNumber` and
/// `message`. Errors keep the `{error, details}` shape rather than the
/// usual error envelope.
#[utoipa::path(
    post,
    path = "/sms/send",
    tag = "sms",
    request_body = RelayRequest,
    responses(
        (status = 200, description = "Message accepted by the provider", body = crate::models::notification::RelaySuccess),
        (status = 400, description = "Missing phone number or message", body = crate::models::notification::RelayFailure),
        (status = 500, description = "Provider rejected the message", body = crate::models::notification::RelayFailure)
    )
)]
pub async fn send_sms(State(state): State<AppState>, Json(request): Json<RelayRequest>) -> Response {
    match state
        .services
        .sms
        .relay(&request.phone_number, &request.message)
        .await
    {
        RelayOutcome::Sent(success) => (StatusCode::OK, Json(success)).into_response(),
        RelayOutcome::Rejected(failure) => (StatusCode::BAD_REQUEST, Json(failure)).into_response(),
        RelayOutcome::Failed(failure) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(failure)).into_response()
        }
    }
}

/// Delivery attempts, newest first
#[utoipa::path(
    get,
    path = "/sms/history",
    tag = "sms",
    responses(
        (status = 200, description = "Message log", body = Vec<SmsRecord>)
    )
)]
pub async fn sms_history(State(state): State<AppState>) -> AppResult<Json<Vec<SmsRecord>>> {
    Ok(Json(state.services.sms.history().await))
}

/// Messages the queue gave up on
#[utoipa::path(
    get,
    path = "/sms/dead-letters",
    tag = "sms",
    responses(
        (status = 200, description = "Undelivered messages, newest first", body = Vec<DeadLetter>)
    )
)]
pub async fn dead_letters(State(state): State<AppState>) -> AppResult<Json<Vec<DeadLetter>>> {
    Ok(Json(state.services.queue.dead_letters()))
}
