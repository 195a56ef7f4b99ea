//! HTTP endpoints
//!
//! Liveness, counters and read-only history next to the WebSocket gateway.

use super::auth::AuthUser;
use super::response::HttpResult;
use super::GatewayState;
use crate::engine::RelayStats;
use crate::protocol::{HistoryPayload, HistoryScope};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use relay_common::AppError;
use relay_core::{HistoryQuery, RoomId, UserId};
use serde::Deserialize;

/// `?limit&offset` on history endpoints
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl HistoryParams {
    fn extract(params: Result<Query<Self>, QueryRejection>) -> HttpResult<HistoryQuery> {
        let Query(params) =
            params.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(HistoryQuery::new(params.limit, params.offset))
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn stats(State(state): State<GatewayState>) -> Json<RelayStats> {
    Json(state.engine().stats())
}

/// Room history, newest first
pub async fn room_messages(
    State(state): State<GatewayState>,
    _user: AuthUser,
    Path(room_id): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> HttpResult<Json<HistoryPayload>> {
    let query = HistoryParams::extract(params)?;
    let room = RoomId::new(room_id);

    let messages = state.engine().room_history(&room, query).await?;

    Ok(Json(HistoryPayload::new(
        HistoryScope::Room { room_id: room },
        &messages,
    )))
}

/// Direct history between the caller and `user_id`, newest first
pub async fn direct_messages(
    State(state): State<GatewayState>,
    user: AuthUser,
    Path(user_id): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> HttpResult<Json<HistoryPayload>> {
    let query = HistoryParams::extract(params)?;
    let other = UserId::new(user_id);

    let messages = state
        .engine()
        .direct_history(&user.user_id, &other, query)
        .await?;

    Ok(Json(HistoryPayload::new(
        HistoryScope::Direct { user_id: other },
        &messages,
    )))
}
