//! 生命周期 HTTP 路由
//!
//! - `POST /subjects`：启动生命周期
//! - `GET /subjects`、`GET /subjects/{id}`：生命周期状态
//! - `POST /subjects/{id}/grant`、`POST /subjects/{id}/revoke`：提交命令，异步处理
//! - `GET /subjects/{id}/access`、`GET /subjects/{id}/history`：查询

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use permit_common::SubjectId;
use permit_errors::AppError;
use serde::Deserialize;

use super::error::ApiResult;
use super::extract::ApiJson;
use crate::application::registry::LifecycleSummary;
use crate::application::{GrantCommand, LifecycleRegistry, RevokeCommand};
use crate::domain::{ApplicationPermission, SignalEvent};

#[derive(Debug, Default, Deserialize)]
pub struct StartSubjectRequest {
    #[serde(default)]
    pub subject_id: Option<SubjectId>,
}

pub fn lifecycle_routes(registry: Arc<LifecycleRegistry>) -> Router {
    Router::new()
        .route("/subjects", post(start_subject).get(list_subjects))
        .route("/subjects/{id}", get(get_subject))
        .route("/subjects/{id}/grant", post(grant))
        .route("/subjects/{id}/revoke", post(revoke))
        .route("/subjects/{id}/access", get(get_access))
        .route("/subjects/{id}/history", get(get_history))
        .with_state(registry)
}

/// 请求体可以为空，此时生成员工 ID
async fn start_subject(
    State(registry): State<Arc<LifecycleRegistry>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<LifecycleSummary>)> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        StartSubjectRequest::default()
    } else {
        serde_json::from_slice::<StartSubjectRequest>(&body)
            .map_err(|e| AppError::validation(format!("Invalid request body: {e}")))?
    };

    let handle = registry.start(request.subject_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(LifecycleSummary {
            subject_id: handle.subject().clone(),
            status: handle.status(),
        }),
    ))
}

async fn list_subjects(
    State(registry): State<Arc<LifecycleRegistry>>,
) -> Json<Vec<LifecycleSummary>> {
    Json(registry.list().await)
}

async fn get_subject(
    State(registry): State<Arc<LifecycleRegistry>>,
    Path(id): Path<String>,
) -> ApiResult<Json<LifecycleSummary>> {
    let handle = registry.get(&SubjectId::new(id)).await?;
    Ok(Json(LifecycleSummary {
        subject_id: handle.subject().clone(),
        status: handle.status(),
    }))
}

async fn grant(
    State(registry): State<Arc<LifecycleRegistry>>,
    Path(id): Path<String>,
    ApiJson(command): ApiJson<GrantCommand>,
) -> ApiResult<StatusCode> {
    registry.get(&SubjectId::new(id)).await?.grant(command).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn revoke(
    State(registry): State<Arc<LifecycleRegistry>>,
    Path(id): Path<String>,
    ApiJson(command): ApiJson<RevokeCommand>,
) -> ApiResult<StatusCode> {
    registry.get(&SubjectId::new(id)).await?.revoke(command).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn get_access(
    State(registry): State<Arc<LifecycleRegistry>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BTreeMap<String, ApplicationPermission>>> {
    let handle = registry.get(&SubjectId::new(id)).await?;
    Ok(Json(handle.get_access().await.into_iter().collect()))
}

async fn get_history(
    State(registry): State<Arc<LifecycleRegistry>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<SignalEvent>>> {
    let handle = registry.get(&SubjectId::new(id)).await?;
    Ok(Json(handle.get_history().await))
}
