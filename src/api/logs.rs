//! Handlers for the ingestion and query endpoints.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::api::{ApiError, AppState};
use crate::db::{LevelCount, LogFilter, LogRecord};
use crate::models::log::{CandidateRecord, normalized, parse_timestamp};

#[derive(Debug, Serialize)]
pub struct LogEnvelope {
    pub success: bool,
    pub log: LogRecord,
}

#[derive(Debug, Serialize)]
pub struct BulkIngestResponse {
    pub success: bool,
    pub count: usize,
    pub logs: Vec<LogRecord>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub logs: Vec<LogRecord>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: Vec<LevelCount>,
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(record): Json<CandidateRecord>,
) -> Result<(StatusCode, Json<LogEnvelope>), ApiError> {
    let new_log = record
        .into_new_log()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let log = state
        .store
        .insert_log(new_log)
        .await
        .map_err(|e| ApiError::storage("Failed to ingest log", e))?;

    Ok((StatusCode::CREATED, Json(LogEnvelope { success: true, log })))
}

/// Bulk bodies come either wrapped (`{"logs": [...]}`) or as a bare array,
/// for backward compatibility. Only the array shape is validated up front;
/// each element is coerced on its own so one malformed record cannot abort
/// the batch.
fn bulk_entries(payload: serde_json::Value) -> Result<Vec<serde_json::Value>, ApiError> {
    let entries = match payload {
        serde_json::Value::Array(entries) => Some(entries),
        serde_json::Value::Object(mut map) => match map.remove("logs") {
            Some(serde_json::Value::Array(entries)) => Some(entries),
            _ => None,
        },
        _ => None,
    };

    match entries {
        None => Err(ApiError::validation("Expected an array of logs")),
        Some(entries) if entries.is_empty() => {
            Err(ApiError::validation("Expected a non-empty array of logs"))
        }
        Some(entries) => Ok(entries),
    }
}

pub async fn ingest_bulk(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<(StatusCode, Json<BulkIngestResponse>), ApiError> {
    let Ok(Json(payload)) = payload else {
        return Err(ApiError::validation("Expected an array of logs"));
    };

    let entries = bulk_entries(payload)?;

    // Invalid records, whether the wrong shape or missing fields, are skipped
    // rather than failing the batch. Only a store-level failure aborts,
    // rolling back every insert.
    let mut batch = Vec::with_capacity(entries.len());
    let mut skipped = 0usize;
    for entry in entries {
        let coerced = serde_json::from_value::<CandidateRecord>(entry)
            .map_err(|e| e.to_string())
            .and_then(|record| record.into_new_log().map_err(|e| e.to_string()));
        match coerced {
            Ok(log) => batch.push(log),
            Err(reason) => {
                skipped += 1;
                debug!("Skipping invalid record in bulk ingest: {}", reason);
            }
        }
    }
    if skipped > 0 {
        debug!("Bulk ingest skipped {} invalid record(s)", skipped);
    }

    let logs = state
        .store
        .insert_logs(batch)
        .await
        .map_err(|e| ApiError::storage("Failed to bulk ingest logs", e))?;

    Ok((
        StatusCode::CREATED,
        Json(BulkIngestResponse {
            success: true,
            count: logs.len(),
            logs,
        }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsQuery {
    pub level: Option<String>,
    pub resource_id: Option<String>,
    pub trace_id: Option<String>,
    pub commit: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

const fn default_page() -> u64 {
    1
}

const fn default_limit() -> u64 {
    100
}

fn date_bound(
    raw: Option<String>,
    name: &str,
) -> Result<Option<sea_orm::entity::prelude::DateTimeUtc>, ApiError> {
    match normalized(raw) {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| ApiError::validation(format!("Unparseable {}: {}", name, raw))),
    }
}

impl LogsQuery {
    fn into_filter(self) -> Result<(LogFilter, u64, u64), ApiError> {
        let page = self.page.max(1);
        let limit = self.limit.max(1);

        let filter = LogFilter {
            level: normalized(self.level),
            resource_id: normalized(self.resource_id),
            trace_id: normalized(self.trace_id),
            commit: normalized(self.commit),
            start: date_bound(self.start_date, "startDate")?,
            end: date_bound(self.end_date, "endDate")?,
            search: normalized(self.search),
        };

        Ok((filter, page, limit))
    }
}

pub async fn query_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogsQuery>,
) -> Result<Json<QueryResponse>, ApiError> {
    let (filter, page, limit) = params.into_filter()?;

    let (logs, total) = state
        .store
        .query_logs(&filter, page, limit)
        .await
        .map_err(|e| ApiError::storage("Failed to query logs", e))?;

    Ok(Json(QueryResponse {
        success: true,
        logs,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit),
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, ApiError> {
    let filter = LogFilter {
        start: date_bound(params.start_date, "startDate")?,
        end: date_bound(params.end_date, "endDate")?,
        ..Default::default()
    };

    let stats = state
        .store
        .log_stats(&filter)
        .await
        .map_err(|e| ApiError::storage("Failed to fetch statistics", e))?;

    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

pub async fn get_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<LogEnvelope>, ApiError> {
    let log = state
        .store
        .get_log(id)
        .await
        .map_err(|e| ApiError::storage("Failed to fetch log", e))?
        .ok_or_else(ApiError::log_not_found)?;

    Ok(Json(LogEnvelope { success: true, log }))
}
