use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use docrag_core::config::GatewayConfig;
use docrag_core::error::{Error, Result};
use docrag_core::traits::ChunkStore;
use docrag_core::types::{Chunk, DocMeta, RetrievedChunk, SearchFilter};
use docrag_gateway::{router, GatewayState};
use serde_json::{json, Value};
use tower::ServiceExt;

#[derive(Default)]
struct FakeStore {
    calls: Mutex<Vec<(String, SearchFilter, usize)>>,
    fail: bool,
}

impl ChunkStore for FakeStore {
    fn write(&self, _doc: &DocMeta, chunks: &[Chunk]) -> Result<usize> { Ok(chunks.len()) }

    fn delete_doc(&self, _doc_id: &str) -> Result<()> { Ok(()) }

    fn search(&self, query: &str, filter: &SearchFilter, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        self.calls.lock().unwrap().push((query.to_string(), filter.clone(), top_k));
        if self.fail {
            return Err(Error::Index("index offline".into()));
        }
        let chunk = |body: &str, score: f32| RetrievedChunk {
            body: body.into(),
            score,
            title: "坐骑系统".into(),
            doc_id: "svn/zx/坐骑系统".into(),
            doc_project: "诛仙".into(),
            doc_url: "http://wiki/zx".into(),
        };
        Ok(vec![chunk("# 坐骑系统\n升级\n", 0.9), chunk("## 外观\n染色\n", 0.4)])
    }
}

fn conf() -> GatewayConfig {
    GatewayConfig { api_keys: vec!["secret".into()], knowledge_ids: vec!["kb".into()], ..GatewayConfig::default() }
}

fn request(auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/retrieval").header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn retrieval(knowledge_id: &str, threshold: f32) -> Value {
    json!({
        "knowledge_id": knowledge_id,
        "query": "坐骑\n升级",
        "retrieval_setting": { "top_k": 4, "score_threshold": threshold },
        "metadata_condition": {
            "logical_operator": "and",
            "conditions": [{ "name": ["project_name"], "comparison_operator": "is", "value": "诛仙" }]
        }
    })
}

async fn call(store: Arc<FakeStore>, conf: GatewayConfig, req: Request<Body>) -> (StatusCode, Value) {
    let app = router(GatewayState::new(store, conf));
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 1 << 20).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn returns_records_above_threshold() {
    let store = Arc::new(FakeStore::default());
    let (status, body) = call(store.clone(), conf(), request(Some("Bearer secret"), retrieval("kb", 0.5))).await;
    assert_eq!(status, StatusCode::OK);
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["content"], "# 坐骑系统\n升级\n");
    assert_eq!(records[0]["title"], "坐骑系统");
    assert!((records[0]["score"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    assert_eq!(records[0]["metadata"], json!({ "docId": "svn/zx/坐骑系统", "docProject": "诛仙", "docUrl": "http://wiki/zx" }));

    let calls = store.calls.lock().unwrap();
    assert_eq!(calls.as_slice(), &[("坐骑\n升级".to_string(), SearchFilter::project("诛仙"), 4)]);
}

#[tokio::test]
async fn missing_or_malformed_authorization_is_1001() {
    for auth in [None, Some("secret"), Some("Basic c2VjcmV0"), Some("Bearer ")] {
        let (status, body) = call(Arc::new(FakeStore::default()), conf(), request(auth, retrieval("kb", 0.0))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "auth {auth:?}");
        assert_eq!(body["error_code"], 1001);
        assert!(body["error_msg"].as_str().unwrap().contains("Bearer"));
    }
}

#[tokio::test]
async fn unknown_key_is_1002() {
    let (status, body) = call(Arc::new(FakeStore::default()), conf(), request(Some("Bearer wrong"), retrieval("kb", 0.0))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], 1002);
}

#[tokio::test]
async fn open_mode_accepts_any_key_and_knowledge() {
    let (status, body) = call(Arc::new(FakeStore::default()), GatewayConfig::default(), request(Some("Bearer anything"), retrieval("other", 0.0))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_knowledge_is_2001() {
    let store = Arc::new(FakeStore::default());
    let (status, body) = call(store.clone(), conf(), request(Some("Bearer secret"), retrieval("nope", 0.0))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], 2001);
    assert!(store.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_body_is_400() {
    let mut bad = retrieval("kb", 0.0);
    bad["metadata_condition"]["conditions"][0]["comparison_operator"] = json!("like");
    let (status, body) = call(Arc::new(FakeStore::default()), conf(), request(Some("Bearer secret"), bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], 400);

    let (status, _) = call(Arc::new(FakeStore::default()), conf(), request(Some("Bearer secret"), json!({ "query": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_failure_is_500() {
    let store = Arc::new(FakeStore { fail: true, ..FakeStore::default() });
    let (status, body) = call(store, conf(), request(Some("Bearer secret"), retrieval("kb", 0.0))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error_code"], 500);
}

#[tokio::test]
async fn without_conditions_there_is_no_project_filter() {
    let store = Arc::new(FakeStore::default());
    let body = json!({ "knowledge_id": "kb", "query": "q", "retrieval_setting": { "top_k": 2, "score_threshold": 0.0 } });
    let (status, _) = call(store.clone(), conf(), request(Some("Bearer secret"), body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.calls.lock().unwrap()[0].1, SearchFilter::default());
}

#[tokio::test]
async fn liveness_route() {
    let app = router(GatewayState::new(Arc::new(FakeStore::default()), conf()));
    let resp = app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
