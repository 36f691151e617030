//! External organization directory JSON API.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Serialize;

use crate::directory::{DirectoryQuery, ExternalOrganization};
use crate::error::Result;
use crate::state::AppState;

/// Build the directory API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/external-organizations", get(search))
        .route("/api/external-organizations/{id}", get(show))
}

/// Search response.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub count: usize,
    pub organizations: Vec<ExternalOrganization>,
}

/// Single record response.
#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub success: bool,
    pub organization: ExternalOrganization,
}

/// Filter the dataset by name, city, province and country.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
) -> Json<SearchResponse> {
    let organizations: Vec<ExternalOrganization> = state
        .directory()
        .search(&query)
        .into_iter()
        .cloned()
        .collect();
    tracing::debug!(count = organizations.len(), "Directory search");

    Json(SearchResponse {
        success: true,
        count: organizations.len(),
        organizations,
    })
}

/// Look up one record by numeric id.
///
/// # Errors
///
/// 400 for a malformed id, 404 when no record has it.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse>> {
    let organization = state.directory().find(&id)?.clone();
    Ok(Json(RecordResponse {
        success: true,
        organization,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::directory::tests::florida;

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = router().with_state(AppState::for_tests(florida()));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_search_by_city() {
        let (status, body) = get_json("/api/external-organizations?city=miami").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 1);
        assert_eq!(body["organizations"][0]["Name"], "Miami Food Bank");
    }

    #[tokio::test]
    async fn test_search_limit_and_blank_filters() {
        let (_, body) = get_json("/api/external-organizations?name=&limit=2").await;
        assert_eq!(body["count"], 2);

        let (_, body) = get_json("/api/external-organizations?limit=abc").await;
        assert_eq!(body["count"], 3);
    }

    #[tokio::test]
    async fn test_show_found() {
        let (status, body) = get_json("/api/external-organizations/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["organization"]["City"], "Orlando");
    }

    #[tokio::test]
    async fn test_show_invalid_id_is_bad_request() {
        let (status, body) = get_json("/api/external-organizations/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid ID format");

        let (status, _) = get_json("/api/external-organizations/2abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_show_unknown_id_is_not_found() {
        let (status, body) = get_json("/api/external-organizations/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Organization not found");
    }
}
