use reqwest::StatusCode;
use serde_json::{json, Value};

use roster_infra::store::InMemoryEmployeeStore;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over the in-memory store, bound to an ephemeral port.
        let app = roster_api::app::build_app(InMemoryEmployeeStore::new());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create(client: &reqwest::Client, srv: &TestServer, body: Value) -> Value {
    let res = client.post(srv.url("/employee")).json(&body).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn home_and_health_respond() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await.unwrap().contains("Welcome"));

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn employee_lifecycle_create_update_delete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create(
        &client,
        &srv,
        json!({ "name": "Ada", "department": "Engineering", "level": "L3" }),
    )
    .await;
    assert_eq!(created, json!({ "id": 1, "name": "Ada", "department": "Engineering", "level": "L3" }));

    let res = client.get(srv.url("/employee/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await.unwrap(), created);

    let res = client
        .put(srv.url("/employee/1"))
        .json(&json!({ "level": "L4" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["id"], 1);
    assert_eq!(body["matched_count"], 1);
    assert_eq!(body["modified_count"], 1);
    assert!(body["message"].is_string());

    let res = client.get(srv.url("/employee/1")).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["name"], "Ada");
    assert_eq!(body["level"], "L4");

    let res = client.delete(srv.url("/employee/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["deleted_count"], 1);

    let res = client.delete(srv.url("/employee/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["deleted_count"], 0);

    let res = client.get(srv.url("/employee/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await.unwrap(), Value::Null);
}

#[tokio::test]
async fn list_returns_every_employee_in_creation_order() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/employees")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await.unwrap(), json!([]));

    for name in ["a", "b", "c"] {
        create(&client, &srv, json!({ "name": name })).await;
    }
    client.delete(srv.url("/employee/2")).send().await.unwrap();

    let res = client.get(srv.url("/employees")).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!([{ "id": 1, "name": "a" }, { "id": 3, "name": "c" }]));
}

#[tokio::test]
async fn create_accepts_an_empty_body() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.post(srv.url("/employee")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({ "id": 1 }));
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/employee"))
        .header("content-type", "application/json")
        .body("[1, 2, 3]")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["message"].is_string());

    create(&client, &srv, json!({ "name": "Ada" })).await;
    let res = client
        .put(srv.url("/employee/1"))
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await.unwrap()["id"], "1");
}

#[tokio::test]
async fn invalid_identifiers_are_bad_requests() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for req in [
        client.get(srv.url("/employee/abc")),
        client.put(srv.url("/employee/abc")).json(&json!({ "name": "x" })),
        client.delete(srv.url("/employee/abc")),
    ] {
        let res = req.send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["id"], "abc");
        assert!(body["message"].as_str().unwrap().contains("abc"));
    }
}

#[tokio::test]
async fn update_of_a_missing_employee_reports_zero_matches() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .put(srv.url("/employee/42"))
        .json(&json!({ "name": "ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["matched_count"], 0);
    assert_eq!(body["modified_count"], 0);
}

#[tokio::test]
async fn responses_allow_any_origin() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/employees"))
        .header("origin", "http://example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");

    let res = client
        .request(reqwest::Method::OPTIONS, srv.url("/employee/1"))
        .header("origin", "http://example.com")
        .header("access-control-request-method", "PUT")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert!(res.headers().contains_key("access-control-allow-methods"));
}
