//! End-to-end tests for the HTTP surface.
//!
//! The router is driven with `tower::ServiceExt::oneshot` against a stub
//! `ObjectStore` that serves fixed objects and counts how often it is called,
//! so the tests can assert that rejected requests never reach upstream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use gateway::api::router;
use gateway::config::Config;
use gateway::middleware::rbac::Role;
use gateway::middleware::token::TokenService;
use gateway::models::object::{
    CreatedObject, DeleteConfirmation, Object, ObjectPatch, ObjectPayload,
};
use gateway::store::{ObjectStore, StoreError};
use gateway::AppState;

const SECRET: &str = "integration-secret";
const FORBIDDEN: &str = "Recognized but you are not allowed to perform this operation";

// ── Stub store ───────────────────────────────────────────────

#[derive(Default)]
struct StubStore {
    calls: AtomicUsize,
    /// When set, every call fails with an unexpected upstream status.
    failing: bool,
    /// When set, every call sleeps this long before answering.
    delay: Option<Duration>,
}

impl StubStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(StoreError::UnexpectedStatus(502));
        }
        Ok(())
    }
}

fn object(id: &str, name: &str, price: &str) -> Object {
    let mut data = serde_json::Map::new();
    data.insert("Price".to_string(), json!(price));
    Object {
        id: id.to_string(),
        name: name.to_string(),
        data: Some(data),
    }
}

fn catalogue(id: &str) -> Option<Object> {
    match id {
        "1" => Some(object("1", "Test Object One", "1")),
        "2" => Some(object("2", "Test Object Two", "2")),
        "3" => Some(object("3", "Test Object Three", "3")),
        _ => None,
    }
}

#[async_trait]
impl ObjectStore for StubStore {
    async fn list_objects(&self) -> Result<Vec<Object>, StoreError> {
        self.enter().await?;
        Ok(vec![object("123", "Test Object", "519.99")])
    }

    async fn get_objects_by_ids(&self, ids: &[String]) -> Result<Vec<Object>, StoreError> {
        self.enter().await?;
        let found: Vec<Object> = ids.iter().filter_map(|id| catalogue(id)).collect();
        if found.is_empty() {
            return Err(StoreError::NoData);
        }
        Ok(found)
    }

    async fn get_object(&self, id: &str) -> Result<Object, StoreError> {
        self.enter().await?;
        catalogue(id).ok_or(StoreError::NoData)
    }

    async fn create_object(&self, payload: &ObjectPayload) -> Result<CreatedObject, StoreError> {
        self.enter().await?;
        Ok(CreatedObject {
            id: uuid::Uuid::new_v4().to_string(),
            name: payload.name.clone(),
            data: payload.data.clone(),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            updated_at: None,
        })
    }

    async fn update_object(
        &self,
        id: &str,
        payload: &ObjectPayload,
    ) -> Result<CreatedObject, StoreError> {
        self.enter().await?;
        catalogue(id).ok_or(StoreError::NoData)?;
        Ok(CreatedObject {
            id: id.to_string(),
            name: payload.name.clone(),
            data: payload.data.clone(),
            created_at: None,
            updated_at: Some(chrono::Utc::now().to_rfc3339()),
        })
    }

    async fn patch_object(&self, id: &str, patch: &ObjectPatch) -> Result<CreatedObject, StoreError> {
        self.enter().await?;
        let current = catalogue(id).ok_or(StoreError::NoData)?;
        Ok(CreatedObject {
            id: current.id,
            name: patch.name.clone().unwrap_or(current.name),
            data: patch.data.clone().or(current.data),
            created_at: None,
            updated_at: Some(chrono::Utc::now().to_rfc3339()),
        })
    }

    async fn delete_object(&self, id: &str) -> Result<DeleteConfirmation, StoreError> {
        self.enter().await?;
        catalogue(id).ok_or(StoreError::NoData)?;
        Ok(DeleteConfirmation {
            message: format!("Object with id = {} has been deleted.", id),
        })
    }
}

// ── Harness ──────────────────────────────────────────────────

fn test_config() -> Config {
    Config {
        base_api_url: "http://upstream.invalid".to_string(),
        auth_secret_key: SECRET.to_string(),
        port: 0,
        request_timeout: Duration::from_millis(200),
        shutdown_grace: Duration::from_secs(1),
    }
}

fn app_with(store: Arc<StubStore>) -> Router {
    router(Arc::new(AppState::new(test_config(), store)))
}

fn token_for(role: Role) -> String {
    TokenService::new(SECRET).issue(role).unwrap()
}

fn request(method: &str, uri: &str, role: Option<Role>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(role) = role {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(role)));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "application/json",
        "every envelope is JSON"
    );
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

fn macbook() -> Value {
    json!({
        "name": "Apple MacBook Pro 16",
        "data": {
            "year": 2019,
            "price": 1849.99,
            "CPU model": "Intel Core i9",
            "Hard disk size": "1 TB"
        }
    })
}

// ── Login ────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_issues_verifiable_token() {
    let app = app_with(Arc::new(StubStore::default()));
    let (status, body) = send(app, request("GET", "/login?role=member", None, None)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "Created");
    assert_eq!(body["message"], "Successfully authenticated");

    let token = body["data"]["token"].as_str().unwrap();
    assert_eq!(TokenService::new(SECRET).verify(token).unwrap(), Role::Member);
}

#[tokio::test]
async fn test_login_rejects_unknown_roles() {
    for uri in ["/login?role=user", "/login?role=ADMIN", "/login?role=", "/login"] {
        let app = app_with(Arc::new(StubStore::default()));
        let (status, body) = send(app, request("GET", uri, None, None)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "uri {}", uri);
        assert_eq!(body["message"], "invalid role option");
        assert!(body.get("data").is_none(), "no token for {}", uri);
    }
}

#[tokio::test]
async fn test_login_token_opens_protected_route() {
    let store = Arc::new(StubStore::default());
    let (_, body) = send(app_with(store.clone()), request("GET", "/login?role=admin", None, None)).await;
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let req = Request::builder()
        .method("GET")
        .uri("/api/v1/objects")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app_with(store.clone()), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.calls(), 1);
}

// ── Authentication gate ──────────────────────────────────────

#[tokio::test]
async fn test_gate_rejects_before_upstream() {
    let cases = [
        (None, "Missing Authorization header"),
        (Some("Token abc"), "Authentication required"),
        (Some("Bearer "), "Authentication required"),
        (Some("Bearer not.a.jwt"), "Invalid or expired token"),
    ];

    for (header_value, expected) in cases {
        let store = Arc::new(StubStore::default());
        let mut builder = Request::builder().method("GET").uri("/api/v1/objects");
        if let Some(value) = header_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (status, body) = send(app_with(store.clone()), builder.body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED, "header {:?}", header_value);
        assert_eq!(body["status"], "Unauthorized");
        assert_eq!(body["message"], expected);
        assert_eq!(store.calls(), 0);
    }
}

#[tokio::test]
async fn test_gate_rejects_token_signed_with_other_secret() {
    let store = Arc::new(StubStore::default());
    let foreign = TokenService::new("someone-else").issue(Role::Admin).unwrap();
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/objects")
        .header(header::AUTHORIZATION, format!("Bearer {}", foreign))
        .body(Body::from(macbook().to_string()))
        .unwrap();

    let (status, body) = send(app_with(store.clone()), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired token");
    assert_eq!(store.calls(), 0);
}

// ── List ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_allowed_for_admin_and_member() {
    for role in [Role::Admin, Role::Member] {
        let store = Arc::new(StubStore::default());
        let (status, body) =
            send(app_with(store.clone()), request("GET", "/api/v1/objects", Some(role), None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Successfully retrieved all objects");
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"], "123");
        assert_eq!(data[0]["name"], "Test Object");
        assert_eq!(store.calls(), 1);
    }
}

#[tokio::test]
async fn test_list_by_ids() {
    let store = Arc::new(StubStore::default());
    let (status, body) = send(
        app_with(store),
        request("GET", "/api/v1/objects?id=3&id=1", Some(Role::Member), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully retrieved requested objects");
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["3", "1"]);
}

#[tokio::test]
async fn test_list_by_unknown_ids_is_400() {
    let (status, body) = send(
        app_with(Arc::new(StubStore::default())),
        request("GET", "/api/v1/objects?id=99", Some(Role::Admin), None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Objects with given IDs not available");
}

#[tokio::test]
async fn test_list_upstream_failure_is_500() {
    let store = Arc::new(StubStore { failing: true, ..Default::default() });
    let (status, body) =
        send(app_with(store), request("GET", "/api/v1/objects", Some(Role::Admin), None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "could not retrieve objects. Try again later");
}

#[tokio::test]
async fn test_slow_upstream_hits_request_deadline() {
    let store = Arc::new(StubStore {
        delay: Some(Duration::from_secs(5)),
        ..Default::default()
    });
    let (status, body) =
        send(app_with(store.clone()), request("GET", "/api/v1/objects/1", Some(Role::Member), None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "could not retrieve requested object. Try again later");
    assert_eq!(store.calls(), 1);
}

// ── Get by id ────────────────────────────────────────────────

#[tokio::test]
async fn test_get_object_by_id() {
    let (status, body) = send(
        app_with(Arc::new(StubStore::default())),
        request("GET", "/api/v1/objects/1", Some(Role::Member), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully retrieved object");
    assert_eq!(body["data"]["id"], "1");
    assert_eq!(body["data"]["name"], "Test Object One");
}

#[tokio::test]
async fn test_get_unknown_object_is_400() {
    let (status, body) = send(
        app_with(Arc::new(StubStore::default())),
        request("GET", "/api/v1/objects/42", Some(Role::Member), None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Object with given ID not available");
    assert!(body.get("data").is_none());
}

// ── Create ───────────────────────────────────────────────────

#[tokio::test]
async fn test_create_as_admin_round_trips_name() {
    let store = Arc::new(StubStore::default());
    let (status, body) = send(
        app_with(store.clone()),
        request("POST", "/api/v1/objects", Some(Role::Admin), Some(macbook())),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully created the object");
    assert_eq!(body["data"]["name"], "Apple MacBook Pro 16");
    assert_eq!(body["data"]["data"]["year"], 2019);
    assert!(body["data"]["createdAt"].is_string());
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn test_create_forbidden_for_member() {
    let store = Arc::new(StubStore::default());
    let (status, body) = send(
        app_with(store.clone()),
        request("POST", "/api/v1/objects", Some(Role::Member), Some(macbook())),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], "Forbidden");
    assert_eq!(body["message"], FORBIDDEN);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_create_rejects_missing_name() {
    for payload in [json!({}), json!({"name": ""}), json!({"data": {"color": "red"}})] {
        let store = Arc::new(StubStore::default());
        let (status, body) = send(
            app_with(store.clone()),
            request("POST", "/api/v1/objects", Some(Role::Admin), Some(payload.clone())),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {}", payload);
        assert_eq!(body["message"], "Could not create object, invalid payload provided");
        assert_eq!(store.calls(), 0);
    }
}

#[tokio::test]
async fn test_create_rejects_malformed_json() {
    let store = Arc::new(StubStore::default());
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/objects")
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(Role::Admin)))
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(app_with(store.clone()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Could not create object, invalid payload provided");
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_create_upstream_failure_is_500() {
    let store = Arc::new(StubStore { failing: true, ..Default::default() });
    let (status, body) = send(
        app_with(store),
        request("POST", "/api/v1/objects", Some(Role::Admin), Some(macbook())),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "error creating object, try again later");
}

// ── Update / patch / delete ──────────────────────────────────

#[tokio::test]
async fn test_update_object() {
    let (status, body) = send(
        app_with(Arc::new(StubStore::default())),
        request("PUT", "/api/v1/objects/2", Some(Role::Admin), Some(json!({"name": "Renamed"}))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully updated the object");
    assert_eq!(body["data"]["id"], "2");
    assert_eq!(body["data"]["name"], "Renamed");
    assert!(body["data"]["updatedAt"].is_string());
}

#[tokio::test]
async fn test_patch_keeps_untouched_fields() {
    let (status, body) = send(
        app_with(Arc::new(StubStore::default())),
        request(
            "PATCH",
            "/api/v1/objects/3",
            Some(Role::Admin),
            Some(json!({"data": {"Price": "4"}})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Test Object Three");
    assert_eq!(body["data"]["data"]["Price"], "4");
}

#[tokio::test]
async fn test_patch_requires_a_field() {
    let store = Arc::new(StubStore::default());
    let (status, body) = send(
        app_with(store.clone()),
        request("PATCH", "/api/v1/objects/3", Some(Role::Admin), Some(json!({}))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Could not update object, invalid payload provided");
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_mutations_forbidden_for_member() {
    let cases = [
        ("PUT", Some(json!({"name": "x"}))),
        ("PATCH", Some(json!({"name": "x"}))),
        ("DELETE", None),
    ];
    for (method, body) in cases {
        let store = Arc::new(StubStore::default());
        let (status, _) = send(
            app_with(store.clone()),
            request(method, "/api/v1/objects/1", Some(Role::Member), body),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN, "method {}", method);
        assert_eq!(store.calls(), 0);
    }
}

#[tokio::test]
async fn test_delete_object() {
    let (status, body) = send(
        app_with(Arc::new(StubStore::default())),
        request("DELETE", "/api/v1/objects/1", Some(Role::Admin), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully deleted the object");
    assert_eq!(body["data"]["message"], "Object with id = 1 has been deleted.");
}

#[tokio::test]
async fn test_delete_unknown_object_is_400() {
    let (status, body) = send(
        app_with(Arc::new(StubStore::default())),
        request("DELETE", "/api/v1/objects/77", Some(Role::Admin), None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Object with given ID not available");
}

// ── Misc ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_route_is_404_envelope() {
    let (status, body) = send(
        app_with(Arc::new(StubStore::default())),
        request("GET", "/api/v2/things", None, None),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "Not Found");
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = app_with(Arc::new(StubStore::default()));
    let resp = app
        .oneshot(request("GET", "/login?role=admin", None, None))
        .await
        .unwrap();

    let id = resp.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_unparseable_login_query_gets_envelope() {
    let app = app_with(Arc::new(StubStore::default()));
    let (status, body) = send(app, request("GET", "/login?role=admin&role=member", None, None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "Bad Request");
    assert_eq!(body["message"], "invalid role option");
}

#[tokio::test]
async fn test_login_without_secret_is_500() {
    let mut cfg = test_config();
    cfg.auth_secret_key = String::new();
    let app = router(Arc::new(AppState::new(cfg, Arc::new(StubStore::default()))));

    let (status, body) = send(app, request("GET", "/login?role=admin", None, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "could not authenticate. Try again later");
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_unsupported_method_is_405_envelope() {
    let cases = [
        ("PUT", "/api/v1/objects"),
        ("POST", "/api/v1/objects/1"),
        ("POST", "/login"),
    ];
    for (method, uri) in cases {
        let store = Arc::new(StubStore::default());
        let (status, body) = send(
            app_with(store.clone()),
            request(method, uri, Some(Role::Admin), Some(json!({"name": "x"}))),
        )
        .await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{} {}", method, uri);
        assert_eq!(body["status"], "Method Not Allowed");
        assert_eq!(store.calls(), 0);
    }
}

#[tokio::test]
async fn test_empty_id_filter_is_400() {
    for uri in ["/api/v1/objects?id=", "/api/v1/objects?id=1&id="] {
        let store = Arc::new(StubStore::default());
        let (status, body) =
            send(app_with(store.clone()), request("GET", uri, Some(Role::Member), None)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "uri {}", uri);
        assert_eq!(body["message"], "Objects with given IDs not available");
        assert_eq!(store.calls(), 0);
    }
}
