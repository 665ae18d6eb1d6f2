use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use vishnora::db::Database;
use vishnora::errors::VishnoraError;
use vishnora::models::campaign::{Campaign, CampaignConfig, CampaignStatus};
use vishnora::models::finding::{FindingRecord, FindingStatus, Severity};
use vishnora::pipeline::{CampaignRunner, RunnerSettings};
use vishnora::queue::{ActiveRuns, JobSource, MemoryJobQueue, WorkerPool};
use vishnora::store::{FindingSink, MemoryStore};

#[derive(Default)]
struct Hits {
    users: AtomicUsize,
    admin: AtomicUsize,
    mutations: AtomicUsize,
    graphql: AtomicUsize,
}

#[derive(Clone)]
struct Target {
    hits: Arc<Hits>,
    /// Status returned for the second canary id on `/v1/users/:id`.
    second_user_status: StatusCode,
    require_auth: bool,
}

const OPENAPI_YAML: &str = r#"openapi: 3.0.0
info:
  title: fixture
  version: "1"
paths:
  /v1/users/{id}:
    get:
      responses:
        200:
          description: ok
  /v1/admin/users/{id}:
    get:
      responses:
        200:
          description: ok
  /v1/health:
    get:
      responses:
        200:
          description: ok
"#;

fn openapi_json() -> Value {
    json!({
        "openapi": "3.0.0",
        "paths": {
            "/v1/users/{id}": { "get": {} },
            "/v1/admin/users/{id}": { "get": {} },
            "/v1/health": { "get": {} },
            "/v1/users": { "post": {} },
        }
    })
}

async fn openapi_doc() -> Json<Value> {
    Json(openapi_json())
}

async fn openapi_yaml() -> &'static str {
    OPENAPI_YAML
}

async fn user(State(t): State<Target>, Path(id): Path<String>, headers: HeaderMap) -> impl IntoResponse {
    t.hits.users.fetch_add(1, Ordering::SeqCst);
    if t.require_auth && headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer t0k") {
        return (StatusCode::UNAUTHORIZED, String::new());
    }
    let status = if id == "456" { t.second_user_status } else { StatusCode::OK };
    (status, format!("{{\"id\":\"{}\",\"pad\":\"{}\"}}", id, "x".repeat(480)))
}

async fn admin(State(t): State<Target>) -> StatusCode {
    t.hits.admin.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn graphql(State(t): State<Target>, body: String) -> Json<Value> {
    t.hits.graphql.fetch_add(1, Ordering::SeqCst);
    if body.contains("deleteUser") {
        t.hits.mutations.fetch_add(1, Ordering::SeqCst);
    }
    if body.contains("__schema") {
        return Json(json!({
            "data": { "__schema": {
                "queryType": { "name": "Query" },
                "mutationType": { "name": "Mutation" },
                "types": [
                    { "name": "Query", "kind": "OBJECT", "fields": [{ "name": "user" }, { "name": "ping" }] },
                    { "name": "Mutation", "kind": "OBJECT", "fields": [{ "name": "deleteUser" }] },
                    { "name": "User", "kind": "OBJECT", "fields": [{ "name": "id" }] }
                ]
            }}
        }));
    }
    if body.contains("user") {
        Json(json!({ "data": { "user": { "__typename": "User" } } }))
    } else {
        // Serializes to fewer than 21 bytes.
        Json(json!({ "data": null }))
    }
}

async fn spawn_target(target: Target) -> String {
    let router = Router::new()
        .route("/openapi.json", get(openapi_doc))
        .route("/spec/openapi.yaml", get(openapi_yaml))
        .route("/v1/users/:id", get(user))
        .route("/v1/admin/users/:id", get(admin))
        .route("/graphql", post(graphql))
        .with_state(target);
    spawn(router).await
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn target(second_user_status: StatusCode) -> (Target, Arc<Hits>) {
    let hits = Arc::new(Hits::default());
    (
        Target { hits: hits.clone(), second_user_status, require_auth: false },
        hits,
    )
}

fn openapi_campaign(id: &str, base: &str) -> Campaign {
    let mut campaign = Campaign::new(id, &CampaignConfig {
        base_url: Some(base.to_string()),
        openapi_url: Some(format!("{}/openapi.json", base)),
        ..Default::default()
    });
    campaign.rate = 0;
    campaign
}

fn db_runner(db: &Database) -> CampaignRunner {
    CampaignRunner::new(Arc::new(db.clone()), Arc::new(db.clone()), RunnerSettings::default()).unwrap()
}

#[tokio::test]
async fn test_rest_idor_end_to_end() {
    let (t, hits) = target(StatusCode::OK);
    let base = spawn_target(t).await;
    let db = Database::in_memory().unwrap();
    db.create_campaign(&openapi_campaign("c-1", &base)).unwrap();

    let report = db_runner(&db).execute("c-1", &CancellationToken::new()).await.unwrap();
    assert_eq!(report.status, CampaignStatus::Completed);
    assert_eq!(report.findings, 1);

    let findings = db.get_findings("c-1").unwrap();
    assert_eq!(findings.len(), 1);
    let FindingRecord { finding, evidence } = &findings[0];
    assert_eq!(finding.title, "Potential IDOR on /v1/users/{id}");
    assert_eq!(finding.severity, Severity::High);
    assert_eq!(finding.status, FindingStatus::Validated);
    assert_eq!(finding.module, "API & GraphQL Pentest");
    assert_eq!(finding.service, "accounts-api");
    assert_eq!(evidence.poc_curl, format!("curl -i -X GET '{}/v1/users/456'", base));
    assert_eq!(evidence.details["urlA"], format!("{}/v1/users/123", base));
    assert_eq!(evidence.details["statusA"], "200");
    assert_eq!(evidence.details["statusB"], "200");
    assert!(evidence.res_sample.len() >= 20 && evidence.res_sample.len() <= 2048);

    assert_eq!(hits.users.load(Ordering::SeqCst), 2);
    assert_eq!(hits.admin.load(Ordering::SeqCst), 0);
    assert_eq!(db.get_campaign("c-1").unwrap().unwrap().status, CampaignStatus::Completed);
}

#[tokio::test]
async fn test_forbidden_second_id_yields_nothing() {
    let (t, hits) = target(StatusCode::FORBIDDEN);
    let base = spawn_target(t).await;
    let db = Database::in_memory().unwrap();
    db.create_campaign(&openapi_campaign("c-2", &base)).unwrap();

    let report = db_runner(&db).execute("c-2", &CancellationToken::new()).await.unwrap();
    assert_eq!(report.status, CampaignStatus::Completed);
    assert!(db.get_findings("c-2").unwrap().is_empty());
    assert_eq!(hits.users.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_yaml_document_by_extension() {
    let (t, _) = target(StatusCode::OK);
    let base = spawn_target(t).await;
    let store = Arc::new(MemoryStore::new());
    let mut campaign = Campaign::new("c-3", &CampaignConfig {
        base_url: Some(base.clone()),
        openapi_url: Some(format!("{}/spec/openapi.yaml", base)),
        ..Default::default()
    });
    campaign.rate = 0;
    store.insert(campaign);

    let runner = CampaignRunner::new(store.clone(), store.clone(), RunnerSettings::default()).unwrap();
    let report = runner.execute("c-3", &CancellationToken::new()).await.unwrap();
    assert_eq!(report.sources.len(), 1);
    assert_eq!(report.sources[0].targets, 2);
    assert_eq!(store.findings("c-3").len(), 1);
}

#[tokio::test]
async fn test_headers_forwarded_and_recorded() {
    let hits = Arc::new(Hits::default());
    let base = spawn_target(Target {
        hits: hits.clone(),
        second_user_status: StatusCode::OK,
        require_auth: true,
    }).await;
    let store = Arc::new(MemoryStore::new());
    let mut campaign = Campaign::new("c-4", &CampaignConfig {
        base_url: Some(base.clone()),
        openapi_url: Some(format!("{}/openapi.json", base)),
        headers: BTreeMap::from([("Authorization".to_string(), "Bearer t0k".to_string())]),
        ..Default::default()
    });
    campaign.rate = 0;
    store.insert(campaign);

    let runner = CampaignRunner::new(store.clone(), store.clone(), RunnerSettings::default()).unwrap();
    runner.execute("c-4", &CancellationToken::new()).await.unwrap();

    let findings = store.findings("c-4");
    assert_eq!(findings.len(), 1);
    assert!(findings[0].evidence.poc_curl.ends_with("-H 'Authorization: Bearer t0k'"));
}

#[tokio::test]
async fn test_graphql_queries_probed_mutations_untouched() {
    let (t, hits) = target(StatusCode::OK);
    let base = spawn_target(t).await;
    let store = Arc::new(MemoryStore::new());
    let mut campaign = Campaign::new("c-5", &CampaignConfig {
        base_url: Some(base.clone()),
        graphql_url: Some(format!("{}/graphql", base)),
        ..Default::default()
    });
    campaign.rate = 0;
    store.insert(campaign);

    let runner = CampaignRunner::new(store.clone(), store.clone(), RunnerSettings::default()).unwrap();
    let report = runner.execute("c-5", &CancellationToken::new()).await.unwrap();
    assert_eq!(report.status, CampaignStatus::Completed);

    let findings = store.findings("c-5");
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].finding.title, "GraphQL query accessible: user");
    assert_eq!(findings[0].finding.severity, Severity::Medium);
    assert_eq!(findings[0].finding.service, "graphql-api");
    assert_eq!(findings[0].evidence.details["query"], "{ user { __typename } }");
    assert!(findings[0].evidence.poc_curl.starts_with(&format!("curl -X POST '{}/graphql'", base)));

    // Introspection plus one request per query field.
    assert_eq!(hits.graphql.load(Ordering::SeqCst), 3);
    assert_eq!(hits.mutations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failing_source_does_not_block_others() {
    let (t, _) = target(StatusCode::OK);
    let base = spawn_target(t).await;
    let db = Database::in_memory().unwrap();
    let mut campaign = Campaign::new("c-6", &CampaignConfig {
        base_url: Some(base.clone()),
        openapi_url: Some(format!("{}/openapi.json", base)),
        graphql_url: Some(format!("{}/missing-graphql", base)),
        ..Default::default()
    });
    campaign.rate = 0;
    db.create_campaign(&campaign).unwrap();

    let report = db_runner(&db).execute("c-6", &CancellationToken::new()).await.unwrap();
    assert_eq!(report.status, CampaignStatus::Completed);
    assert_eq!(report.failed_sources(), 1);
    assert!(report.sources[1].error.as_deref().unwrap().contains("404"));
    assert_eq!(db.count_findings("c-6").unwrap(), 1);
}

#[tokio::test]
async fn test_openapi_fetch_failure_still_completes() {
    let (t, _) = target(StatusCode::OK);
    let base = spawn_target(t).await;
    let db = Database::in_memory().unwrap();
    let mut campaign = Campaign::new("c-7", &CampaignConfig {
        base_url: Some(base.clone()),
        openapi_url: Some(format!("{}/nope.json", base)),
        ..Default::default()
    });
    campaign.rate = 0;
    db.create_campaign(&campaign).unwrap();

    let report = db_runner(&db).execute("c-7", &CancellationToken::new()).await.unwrap();
    assert_eq!(report.status, CampaignStatus::Completed);
    assert_eq!(db.count_findings("c-7").unwrap(), 0);
}

struct FailingSink;

#[async_trait]
impl FindingSink for FailingSink {
    async fn create(&self, _campaign_id: &str, _record: &FindingRecord) -> Result<(), VishnoraError> {
        Err(VishnoraError::Persistence("disk full".into()))
    }
}

#[tokio::test]
async fn test_persistence_failure_marks_failed() {
    let (t, _) = target(StatusCode::OK);
    let base = spawn_target(t).await;
    let store = Arc::new(MemoryStore::new());
    store.insert(openapi_campaign("c-8", &base));

    let runner = CampaignRunner::new(store.clone(), Arc::new(FailingSink), RunnerSettings::default()).unwrap();
    let err = runner.execute("c-8", &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, VishnoraError::Persistence(_)));
    assert_eq!(store.status("c-8"), Some(CampaignStatus::Failed));
}

#[tokio::test]
async fn test_canceled_while_queued_never_probes() {
    let (t, hits) = target(StatusCode::OK);
    let base = spawn_target(t).await;
    let db = Database::in_memory().unwrap();
    db.create_campaign(&openapi_campaign("c-9", &base)).unwrap();
    db.set_campaign_status("c-9", CampaignStatus::Canceled).unwrap();

    let report = db_runner(&db).execute("c-9", &CancellationToken::new()).await.unwrap();
    assert!(report.skipped);
    assert_eq!(db.get_campaign("c-9").unwrap().unwrap().status, CampaignStatus::Canceled);
    assert_eq!(db.count_findings("c-9").unwrap(), 0);
    assert_eq!(hits.users.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_signal_stops_probing() {
    let (t, hits) = target(StatusCode::OK);
    let base = spawn_target(t).await;
    let db = Database::in_memory().unwrap();
    db.create_campaign(&openapi_campaign("c-10", &base)).unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let report = db_runner(&db).execute("c-10", &token).await.unwrap();
    assert_eq!(report.status, CampaignStatus::Canceled);
    assert_eq!(db.get_campaign("c-10").unwrap().unwrap().status, CampaignStatus::Canceled);
    assert_eq!(hits.users.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rate_limit_spaces_requests() {
    let (t, _) = target(StatusCode::OK);
    let base = spawn_target(t).await;
    let store = Arc::new(MemoryStore::new());
    let mut campaign = openapi_campaign("c-11", &base);
    // Bucket of 1 token refilled at 1/s: two requests need about a second.
    campaign.rate = 1;
    store.insert(campaign);

    let runner = CampaignRunner::new(store.clone(), store.clone(), RunnerSettings::default()).unwrap();
    let started = Instant::now();
    runner.execute("c-11", &CancellationToken::new()).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(900));
    assert_eq!(store.findings("c-11").len(), 1);
}

#[tokio::test]
async fn test_worker_pool_runs_jobs_and_ignores_redelivery() {
    let (t, hits) = target(StatusCode::OK);
    let base = spawn_target(t).await;
    let db = Database::in_memory().unwrap();
    db.create_campaign(&openapi_campaign("a", &base)).unwrap();
    db.create_campaign(&openapi_campaign("b", &base)).unwrap();

    let queue = Arc::new(MemoryJobQueue::new());
    queue.enqueue("a").await;
    queue.enqueue("b").await;
    queue.enqueue("a").await;
    queue.close();

    let runner = Arc::new(db_runner(&db));
    let pool = WorkerPool::new(queue.clone(), runner, ActiveRuns::new(), 2);
    tokio::time::timeout(Duration::from_secs(30), pool.run(CancellationToken::new()))
        .await
        .unwrap();

    for id in ["a", "b"] {
        assert_eq!(db.get_campaign(id).unwrap().unwrap().status, CampaignStatus::Completed);
        assert_eq!(db.count_findings(id).unwrap(), 1);
    }
    assert_eq!(hits.users.load(Ordering::SeqCst), 4);
}

async fn binary_body() -> (StatusCode, Vec<u8>) {
    (StatusCode::OK, vec![0xFF; 10])
}

async fn binary_graphql(body: String) -> axum::response::Response {
    if body.contains("__schema") {
        return Json(json!({
            "data": { "__schema": {
                "types": [{ "name": "Query", "kind": "OBJECT", "fields": [{ "name": "blob" }] }]
            }}
        }))
        .into_response();
    }
    (StatusCode::OK, vec![0xFFu8; 10]).into_response()
}

#[tokio::test]
async fn test_short_binary_body_is_measured_in_raw_bytes() {
    let router = Router::new()
        .route("/openapi.json", get(|| async { Json(json!({ "paths": { "/v1/blobs/{id}": { "get": {} } } })) }))
        .route("/v1/blobs/:id", get(binary_body))
        .route("/graphql", post(binary_graphql));
    let base = spawn(router).await;
    let store = Arc::new(MemoryStore::new());
    let mut campaign = Campaign::new("c-12", &CampaignConfig {
        base_url: Some(base.clone()),
        openapi_url: Some(format!("{}/openapi.json", base)),
        graphql_url: Some(format!("{}/graphql", base)),
        ..Default::default()
    });
    campaign.rate = 0;
    store.insert(campaign);

    let runner = CampaignRunner::new(store.clone(), store.clone(), RunnerSettings::default()).unwrap();
    let report = runner.execute("c-12", &CancellationToken::new()).await.unwrap();
    assert_eq!(report.status, CampaignStatus::Completed);
    assert_eq!(report.failed_sources(), 0);
    assert_eq!(report.sources[0].probed, 1);
    assert_eq!(report.sources[1].probed, 1);
    // Ten bytes stay under both thresholds even though their lossy UTF-8
    // rendering is thirty.
    assert!(store.findings("c-12").is_empty());
}

#[derive(Clone)]
struct StopTarget {
    cancel: CancellationToken,
    users: Arc<AtomicUsize>,
    orders: Arc<AtomicUsize>,
    list_orders: bool,
}

async fn stop_openapi(State(t): State<StopTarget>) -> Json<Value> {
    let mut paths = serde_json::Map::new();
    paths.insert("/v1/users/{id}".into(), json!({ "get": {} }));
    if t.list_orders {
        paths.insert("/v1/orders/{id}".into(), json!({ "get": {} }));
    }
    Json(json!({ "paths": paths }))
}

async fn stop_user(State(t): State<StopTarget>, Path(id): Path<String>) -> String {
    t.users.fetch_add(1, Ordering::SeqCst);
    if id == "456" {
        t.cancel.cancel();
    }
    format!("{{\"id\":\"{}\",\"pad\":\"{}\"}}", id, "x".repeat(64))
}

async fn stop_order(State(t): State<StopTarget>) -> String {
    t.orders.fetch_add(1, Ordering::SeqCst);
    "x".repeat(64)
}

async fn spawn_stop_target(list_orders: bool) -> (String, StopTarget) {
    let t = StopTarget {
        cancel: CancellationToken::new(),
        users: Arc::new(AtomicUsize::new(0)),
        orders: Arc::new(AtomicUsize::new(0)),
        list_orders,
    };
    let router = Router::new()
        .route("/openapi.json", get(stop_openapi))
        .route("/v1/users/:id", get(stop_user))
        .route("/v1/orders/:id", get(stop_order))
        .with_state(t.clone());
    (spawn(router).await, t)
}

#[tokio::test]
async fn test_cancel_mid_run_keeps_earlier_findings() {
    let (base, t) = spawn_stop_target(true).await;
    let db = Database::in_memory().unwrap();
    db.create_campaign(&openapi_campaign("c-13", &base)).unwrap();

    let report = db_runner(&db).execute("c-13", &t.cancel).await.unwrap();
    assert!(report.canceled);
    assert_eq!(report.status, CampaignStatus::Canceled);
    assert_eq!(db.get_campaign("c-13").unwrap().unwrap().status, CampaignStatus::Canceled);

    let findings = db.get_findings("c-13").unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].finding.title, "Potential IDOR on /v1/users/{id}");
    assert_eq!(t.users.load(Ordering::SeqCst), 2);
    assert_eq!(t.orders.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_after_last_target_still_completes() {
    let (base, t) = spawn_stop_target(false).await;
    let db = Database::in_memory().unwrap();
    db.create_campaign(&openapi_campaign("c-14", &base)).unwrap();

    let report = db_runner(&db).execute("c-14", &t.cancel).await.unwrap();
    assert!(t.cancel.is_cancelled());
    assert!(!report.canceled);
    assert_eq!(db.get_campaign("c-14").unwrap().unwrap().status, CampaignStatus::Completed);
    assert_eq!(db.count_findings("c-14").unwrap(), 1);
}
