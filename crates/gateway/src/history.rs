//! `GET /api/history`

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use codeweaver_core::generation::Generation;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::SharedState;
use crate::error::HistoryError;

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 50;

/// Raw query values; anything unparseable falls back to the default.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl HistoryParams {
    pub fn page(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .map(|p| usize::try_from(p.max(1)).unwrap_or(DEFAULT_PAGE))
            .unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .map(|l| usize::try_from(l.clamp(1, MAX_LIMIT as i64)).unwrap_or(DEFAULT_LIMIT))
            .unwrap_or(DEFAULT_LIMIT)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub data: Vec<Generation>,
    pub total_pages: usize,
    pub current_page: usize,
}

pub async fn history_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, HistoryError> {
    let Some(external_id) = state.resolver.resolve(&headers) else {
        warn!("Rejected unauthenticated history request");
        return Err(HistoryError::Unauthorized);
    };

    let page = params.page();
    let limit = params.limit();

    let Some(user) = state.store.find_user_by_external_id(&external_id).await? else {
        debug!("History requested by a principal with no generations yet");
        return Ok(Json(HistoryResponse {
            data: Vec::new(),
            total_pages: 0,
            current_page: DEFAULT_PAGE,
        }));
    };

    let offset = (page - 1).saturating_mul(limit);
    let data = state.store.list_generations(&user.id, offset, limit).await?;
    let total = state.store.count_generations(&user.id).await?;

    debug!(page, limit, total, returned = data.len(), "History page served");
    Ok(Json(HistoryResponse {
        data,
        total_pages: total.div_ceil(limit),
        current_page: page,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<&str>, limit: Option<&str>) -> HistoryParams {
        HistoryParams {
            page: page.map(String::from),
            limit: limit.map(String::from),
        }
    }

    #[test]
    fn defaults() {
        let p = HistoryParams::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), 5);
    }

    #[test]
    fn page_has_floor_of_one() {
        assert_eq!(params(Some("0"), None).page(), 1);
        assert_eq!(params(Some("-4"), None).page(), 1);
        assert_eq!(params(Some("3"), None).page(), 3);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(params(None, Some("500")).limit(), 50);
        assert_eq!(params(None, Some("0")).limit(), 1);
        assert_eq!(params(None, Some("12")).limit(), 12);
    }

    #[test]
    fn trailing_garbage_is_not_a_number() {
        // Only whole integers count; "2abc" is not page 2.
        let p = params(Some("2abc"), Some("10rows"));
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), 5);
        assert_eq!(params(Some(" 2 "), Some(" 10 ")).page(), 2);
    }

    #[test]
    fn garbage_falls_back() {
        let p = params(Some("two"), Some("lots"));
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), 5);
    }
}
