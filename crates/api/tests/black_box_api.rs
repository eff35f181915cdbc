use reqwest::StatusCode;
use serde_json::{Value, json};

use docket_core::CompanyId;
use docket_infra::InMemoryStore;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        docket_observability::init_for_tests();

        // Same router as prod, on the seeded in-memory store and an ephemeral port.
        let store = InMemoryStore::with_demo_catalog(CompanyId::new(1));
        let app = docket_api::app::build_app_with_store(store);
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

fn client() -> reqwest::Client {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert("x-user-id", "42".parse().unwrap());
    headers.insert("x-company-id", "1".parse().unwrap());
    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .unwrap()
}

fn amount(doc: &Value, field: &str) -> f64 {
    doc[field]
        .as_str()
        .map(|s| s.parse::<f64>().unwrap())
        .or_else(|| doc[field].as_f64())
        .unwrap_or_else(|| panic!("missing amount {field} in {doc}"))
}

fn invoice_body() -> Value {
    json!({
        "name": "INV-1",
        "partner_id": 7,
        "date": "2026-03-01",
        "lines": {
            "total_forms": 2,
            "initial_forms": 0,
            "rows": [
                {"product_id": 1, "quantity": 2, "price": 10},
                {"product_id": 2, "quantity": 1, "price": 5}
            ]
        }
    })
}

async fn create_invoice(server: &TestServer, client: &reqwest::Client) -> Value {
    let res = client
        .post(server.url("/invoices"))
        .json(&invoice_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_public_and_documents_require_context() {
    let server = TestServer::spawn().await;
    let anonymous = reqwest::Client::new();

    let res = anonymous.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let res = anonymous.get(server.url("/invoices")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let res = anonymous
        .get(server.url("/invoices"))
        .header("x-user-id", "42")
        .header("x-company-id", "not-a-number")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_invoice_persists_lines_and_totals() {
    let server = TestServer::spawn().await;
    let client = client();

    let created = create_invoice(&server, &client).await;
    assert_eq!(created["name"], "INV-1");
    assert_eq!(created["kind"], "invoice");
    assert_eq!(created["state"], 0);
    assert_eq!(amount(&created, "amount_untaxed"), 25.0);
    assert_eq!(created["lines"].as_array().unwrap().len(), 2);

    let id = created["id"].as_i64().unwrap();
    let res = client
        .get(server.url(&format!("/invoices/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let detail: Value = res.json().await.unwrap();
    let lines = detail["lines"].as_array().unwrap();
    assert!(lines.iter().all(|l| l["document_id"].as_i64() == Some(id)));

    let list: Value = client
        .get(server.url("/invoices"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["items"].as_array().unwrap().len(), 1);

    // Invoices and sale orders are separate lists.
    let orders: Value = client
        .get(server.url("/sales/orders"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(orders["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_submission_returns_field_errors() {
    let server = TestServer::spawn().await;
    let client = client();

    let res = client
        .post(server.url("/sales/orders"))
        .json(&json!({
            "name": "",
            "partner_id": 999,
            "lines": {"total_forms": 1, "initial_forms": 0, "rows": [{"product_id": 1, "quantity": -1}]}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let orders: Value = client
        .get(server.url("/sales/orders"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(orders["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn posted_invoice_rejects_updates_with_redirect() {
    let server = TestServer::spawn().await;
    let client = client();

    let created = create_invoice(&server, &client).await;
    let id = created["id"].as_i64().unwrap();

    let res = client
        .post(server.url(&format!("/invoices/{id}/state/1")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let posted: Value = res.json().await.unwrap();
    assert_eq!(posted["state"], 1);

    let mut body = invoice_body();
    body["name"] = json!("INV-1-EDITED");
    let res = client
        .put(server.url(&format!("/invoices/{id}")))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let rejected: Value = res.json().await.unwrap();
    assert_eq!(rejected["error"], "state_rejected");
    assert_eq!(rejected["redirect"], format!("/invoices/{id}"));
    assert!(rejected["warning"].as_str().unwrap().contains("INV-1"));

    let detail: Value = client
        .get(server.url(&format!("/invoices/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["name"], "INV-1");
    assert_eq!(detail["lines"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn update_replaces_the_line_set() {
    let server = TestServer::spawn().await;
    let client = client();

    let created = create_invoice(&server, &client).await;
    let id = created["id"].as_i64().unwrap();
    let first_line = created["lines"][0]["id"].as_i64().unwrap();

    // Keep only the first line; the second is omitted and must be deleted.
    let res = client
        .put(server.url(&format!("/invoices/{id}")))
        .json(&json!({
            "name": "INV-1",
            "partner_id": 7,
            "lines": {
                "total_forms": 1,
                "initial_forms": 1,
                "rows": [{"id": first_line, "product_id": 1, "quantity": 3, "price": 10}]
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let saved: Value = res.json().await.unwrap();
    let lines = saved["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["id"].as_i64(), Some(first_line));
    assert_eq!(amount(&saved, "amount_untaxed"), 30.0);
}

#[tokio::test]
async fn delete_is_blocked_while_lines_are_attached() {
    let server = TestServer::spawn().await;
    let client = client();

    let created = create_invoice(&server, &client).await;
    let id = created["id"].as_i64().unwrap();

    let preview: Value = client
        .get(server.url(&format!("/invoices/{id}/delete")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(preview["status"], "blocked");

    let res = client
        .delete(server.url(&format!("/invoices/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "delete_blocked");
    assert!(body["message"].as_str().unwrap().contains("INV-1"));

    let res = client
        .get(server.url(&format!("/invoices/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_document_can_be_deleted() {
    let server = TestServer::spawn().await;
    let client = client();

    let res = client
        .post(server.url("/sales/orders"))
        .json(&json!({"name": "SO-1", "partner_id": 8}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();

    let res = client
        .delete(server.url(&format!("/sales/orders/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(server.url(&format!("/sales/orders/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_and_malformed_ids() {
    let server = TestServer::spawn().await;
    let client = client();

    let res = client.get(server.url("/invoices/999")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let res = client.get(server.url("/invoices/abc")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // An invoice is not reachable through the sale order routes.
    let created = create_invoice(&server, &client).await;
    let id = created["id"].as_i64().unwrap();
    let res = client
        .get(server.url(&format!("/sales/orders/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_lookups() {
    let server = TestServer::spawn().await;
    let client = client();

    let body: Value = client
        .get(server.url("/catalog/product?product=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let products = body["product"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["name"], "Keyboard");

    let body: Value = client
        .get(server.url("/catalog/product?product=404"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["product"].as_array().unwrap().is_empty());

    let res = client
        .get(server.url("/catalog/product?product=x"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = client
        .get(server.url("/catalog/tax?tax=1,2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["tax"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn layout_describes_the_screens() {
    let server = TestServer::spawn().await;
    let client = client();

    let invoice: Value = client
        .get(server.url("/invoices/layout"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order: Value = client
        .get(server.url("/sales/orders/layout"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(invoice["master"].is_array());
    assert_ne!(invoice["kind"], order["kind"]);
}
