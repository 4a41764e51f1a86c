//! Axum route handlers for the glossary HTTP API.

use crate::error::ApiError;
use crate::store::TermStore;
use axum::Router;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use glossary_types::*;
use std::sync::Arc;
use std::time::Instant;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct AppState {
    pub store: Arc<TermStore>,
    pub start_time: Instant,
}

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn ok<T: serde::Serialize>(message: impl Into<String>, data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, data))))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/glossary", get(list_terms).post(create_term))
        .route("/api/glossary/search/", get(search_without_keyword))
        .route("/api/glossary/search/:keyword", get(search_terms))
        .route(
            "/api/glossary/:id",
            get(get_term).put(update_term).delete(delete_term),
        )
        .route("/api/statistics", get(statistics))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
}

// GET /
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "Glossary API".to_string(),
        version: VERSION.to_string(),
        description: "API for managing a glossary of decentralized application terms".to_string(),
    })
}

// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        timestamp: timestamp::format(&timestamp::now()),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// GET /api/glossary?skip=&limit=
pub async fn list_terms(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<TermPage> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (skip, limit) = query.validate()?;

    let all = state.store.list_all();
    let total = all.len();
    let items: Vec<TermRecord> = all.into_iter().skip(skip).take(limit).collect();

    ok(
        format!("Retrieved {} terms of {} total", items.len(), total),
        TermPage {
            total,
            skip,
            limit,
            items,
        },
    )
}

// GET /api/glossary/:id
pub async fn get_term(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<TermRecord> {
    let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    match state.store.get(id) {
        Some(term) => ok("Term found", term),
        None => Err(ApiError::NotFound(id)),
    }
}

// GET /api/glossary/search/:keyword
pub async fn search_terms(
    State(state): State<Arc<AppState>>,
    keyword: Result<Path<String>, PathRejection>,
) -> ApiResult<Vec<TermRecord>> {
    let Path(keyword) = keyword.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    run_search(&state, &keyword)
}

// GET /api/glossary/search/
pub async fn search_without_keyword(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<TermRecord>> {
    run_search(&state, "")
}

fn run_search(state: &AppState, keyword: &str) -> ApiResult<Vec<TermRecord>> {
    validate_keyword(keyword)?;
    let results = state.store.search(keyword);
    ok(format!("Found {} terms", results.len()), results)
}

// POST /api/glossary
pub async fn create_term(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateTermRequest>, JsonRejection>,
) -> ApiResult<TermRecord> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    req.validate()?;

    let term = state.store.create(req)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("New term added successfully", term)),
    ))
}

// PUT /api/glossary/:id
pub async fn update_term(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateTermRequest>, JsonRejection>,
) -> ApiResult<TermRecord> {
    let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    req.validate()?;

    match state.store.update(id, &req)? {
        Some(term) => ok("Term updated successfully", term),
        None => Err(ApiError::NotFound(id)),
    }
}

// DELETE /api/glossary/:id
pub async fn delete_term(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<DeletedTerm> {
    let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if state.store.delete(id)? {
        ok("Term deleted successfully", DeletedTerm { deleted_id: id })
    } else {
        Err(ApiError::NotFound(id))
    }
}

// GET /api/statistics
pub async fn statistics(State(state): State<Arc<AppState>>) -> ApiResult<GlossaryStatistics> {
    let terms = state.store.list_all();
    ok("Glossary statistics", GlossaryStatistics::from_terms(&terms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct Harness {
        _dir: tempfile::TempDir,
        store: Arc<TermStore>,
        app: Router,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(TermStore::open(dir.path().join("glossary.json")).unwrap());
        let state = Arc::new(AppState {
            store: store.clone(),
            start_time: Instant::now(),
        });
        Harness {
            _dir: dir,
            store,
            app: router(state),
        }
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|e| panic!("body is not JSON: {e}; body={:?}", bytes))
        };
        (status, value)
    }

    fn oracle() -> Value {
        json!({
            "title": "Oracle",
            "definition": "A service that feeds external data to a blockchain",
            "category": "Infrastructure"
        })
    }

    fn seed(store: &TermStore, count: usize) {
        for i in 0..count {
            store
                .create(CreateTermRequest {
                    title: format!("Term {}", i),
                    definition: "Seeded definition text".to_string(),
                    category: DEFAULT_CATEGORY.to_string(),
                    examples: None,
                    related_terms: None,
                    source: None,
                })
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let h = harness();
        let (status, body) = send(&h.app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Glossary API");
        assert_eq!(body["version"], VERSION);

        let (status, body) = send(&h.app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(timestamp::parse(body["timestamp"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_create_returns_201_with_normalized_record() {
        let h = harness();
        let (status, body) = send(&h.app, "POST", "/api/glossary", Some(oracle())).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "New term added successfully");
        assert_eq!(body["data"]["id"], 1);
        assert_eq!(body["data"]["category"], "Infrastructure");
        assert_eq!(body["data"]["examples"], json!([]));
        assert_eq!(body["data"]["related_terms"], json!([]));
        assert_eq!(body["data"]["source"], "");
    }

    #[tokio::test]
    async fn test_create_defaults_category() {
        let h = harness();
        let payload = json!({"title": "Gas", "definition": "Unit of computational effort"});
        let (_, body) = send(&h.app, "POST", "/api/glossary", Some(payload)).await;
        assert_eq!(body["data"]["category"], DEFAULT_CATEGORY);
    }

    #[tokio::test]
    async fn test_create_rejects_constraint_violations() {
        let h = harness();
        let payload = json!({"title": "", "definition": "This definition is fine"});
        let (status, body) = send(&h.app, "POST", "/api/glossary", Some(payload)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"][0]["field"], "title");

        let payload = json!({"title": "Short", "definition": "Short"});
        let (status, body) = send(&h.app, "POST", "/api/glossary", Some(payload)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["data"][0]["field"], "definition");

        let payload = json!({
            "title": "Gas",
            "definition": "Unit of computational effort",
            "category": null
        });
        let (status, body) = send(&h.app, "POST", "/api/glossary", Some(payload)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);

        let payload = json!({"definition": "Title is missing entirely"});
        let (status, body) = send(&h.app, "POST", "/api/glossary", Some(payload)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);

        assert_eq!(h.store.len(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected_with_envelope() {
        let h = harness();
        let request = Request::builder()
            .method("POST")
            .uri("/api/glossary")
            .header("content-type", "application/json")
            .body(Body::from("{"))
            .unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_get_term_and_not_found() {
        let h = harness();
        send(&h.app, "POST", "/api/glossary", Some(oracle())).await;

        let (status, body) = send(&h.app, "GET", "/api/glossary/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Term found");
        assert_eq!(body["data"]["title"], "Oracle");

        let (status, body) = send(&h.app, "GET", "/api/glossary/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Term with ID 99 not found");

        let (status, _) = send(&h.app, "GET", "/api/glossary/abc", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let h = harness();
        seed(&h.store, 25);

        let (status, body) = send(&h.app, "GET", "/api/glossary?skip=0&limit=10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 25);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 10);
        assert_eq!(body["message"], "Retrieved 10 terms of 25 total");

        let (_, body) = send(&h.app, "GET", "/api/glossary?skip=20&limit=10", None).await;
        let items = body["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(items[0]["title"], "Term 20");

        let (_, body) = send(&h.app, "GET", "/api/glossary", None).await;
        assert_eq!(body["data"]["skip"], 0);
        assert_eq!(body["data"]["limit"], DEFAULT_LIST_LIMIT);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 25);

        let (_, body) = send(&h.app, "GET", "/api/glossary?skip=100", None).await;
        assert!(body["data"]["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_rejects_out_of_range_paging() {
        let h = harness();
        for uri in [
            "/api/glossary?skip=-1",
            "/api/glossary?limit=0",
            "/api/glossary?limit=1001",
            "/api/glossary?limit=ten",
        ] {
            let (status, body) = send(&h.app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
            assert_eq!(body["success"], false);
        }
    }

    #[tokio::test]
    async fn test_search() {
        let h = harness();
        send(&h.app, "POST", "/api/glossary", Some(oracle())).await;

        let (status, body) = send(&h.app, "GET", "/api/glossary/search/oracle", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Found 1 terms");
        assert_eq!(body["data"][0]["title"], "Oracle");

        let (status, body) = send(&h.app, "GET", "/api/glossary/search/rollup", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));

        let (status, _) = send(&h.app, "GET", "/api/glossary/search/", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let long = "k".repeat(101);
        let uri = format!("/api/glossary/search/{}", long);
        let (status, _) = send(&h.app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_update_flow() {
        let h = harness();
        let (_, created) = send(&h.app, "POST", "/api/glossary", Some(oracle())).await;

        let update = json!({"definition": "Bridges off-chain data into smart contracts"});
        let (status, body) = send(&h.app, "PUT", "/api/glossary/1", Some(update)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Term updated successfully");

        let before = &created["data"];
        let after = &body["data"];
        assert_eq!(after["title"], before["title"]);
        assert_eq!(after["category"], before["category"]);
        assert_eq!(after["created_at"], before["created_at"]);
        assert!(after["updated_at"].as_str().unwrap() > before["updated_at"].as_str().unwrap());

        let (status, body) = send(&h.app, "PUT", "/api/glossary/7", Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Term with ID 7 not found");

        let bad = json!({"title": ""});
        let (status, _) = send(&h.app, "PUT", "/api/glossary/1", Some(bad)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_delete_flow() {
        let h = harness();
        send(&h.app, "POST", "/api/glossary", Some(oracle())).await;
        let second = json!({"title": "Gas", "definition": "Unit of computational effort"});
        send(&h.app, "POST", "/api/glossary", Some(second)).await;

        let (status, body) = send(&h.app, "DELETE", "/api/glossary/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deleted_id"], 1);

        for _ in 0..2 {
            let (status, _) = send(&h.app, "DELETE", "/api/glossary/1", None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }

        let (_, body) = send(&h.app, "GET", "/api/glossary", None).await;
        let items = body["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], 2);

        let (status, _) = send(&h.app, "GET", "/api/glossary/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_statistics() {
        let h = harness();
        send(&h.app, "POST", "/api/glossary", Some(oracle())).await;
        let gas = json!({"title": "Gas", "definition": "Unit of computational effort"});
        send(&h.app, "POST", "/api/glossary", Some(gas)).await;
        let node = json!({
            "title": "Node",
            "definition": "A participant that keeps a copy of the ledger",
            "category": "Infrastructure"
        });
        send(&h.app, "POST", "/api/glossary", Some(node)).await;

        let (status, body) = send(&h.app, "GET", "/api/statistics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Glossary statistics");
        assert_eq!(body["data"]["total_terms"], 3);
        assert_eq!(body["data"]["categories_count"], 2);
        assert_eq!(body["data"]["categories"]["Infrastructure"], 2);
        assert_eq!(body["data"]["categories"]["General"], 1);
    }

    #[tokio::test]
    async fn test_storage_failure_maps_to_500() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = Arc::new(TermStore::open(blocker.join("glossary.json")).unwrap());
        let app = router(Arc::new(AppState {
            store: store.clone(),
            start_time: Instant::now(),
        }));

        let (status, body) = send(&app, "POST", "/api/glossary", Some(oracle())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(store.len(), 0);
    }
}
