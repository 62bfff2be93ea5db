use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use bookshelf_kernel::{settings::Settings, InitCtx};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

struct TestApp {
    router: Router,
    settings: Settings,
    _dir: TempDir,
}

impl TestApp {
    async fn with_document(document: Value) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, serde_json::to_vec(&document).unwrap()).unwrap();
        Self::at(dir, path).await
    }

    async fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("db.json");
        Self::at(dir, path).await
    }

    async fn at(dir: TempDir, path: std::path::PathBuf) -> Self {
        let mut settings = Settings::default();
        settings.store.path = path;

        let registry = bookshelf_app::build_registry(&settings);
        registry
            .init_all(&InitCtx {
                settings: &settings,
            })
            .await
            .unwrap();
        let router = bookshelf_http::build_router(&registry, &settings);

        Self {
            router,
            settings,
            _dir: dir,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        match body {
            Some(value) => {
                let bytes = serde_json::to_vec(&value).unwrap();
                self.send_raw(method, uri, Some("application/json"), bytes)
                    .await
            }
            None => self.send_raw(method, uri, None, Vec::new()).await,
        }
    }

    async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }

        let response = self
            .router
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    fn document(&self) -> Value {
        let bytes = std::fs::read(&self.settings.store.path).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

fn sample_book(id: &str, author: &str, country: &str) -> Value {
    json!({
        "id": id,
        "author": author,
        "country": country,
        "imageLink": format!("images/{}.jpg", id),
        "language": "English",
        "link": format!("https://example.org/{}", id),
        "pages": 300,
        "title": format!("Book {}", id),
        "year": 1900
    })
}

fn create_body() -> Value {
    json!({
        "author": "Hans Christian Andersen",
        "country": "Denmark",
        "imageLink": "images/fairy-tales.jpg",
        "language": "Danish",
        "link": "https://en.wikipedia.org/wiki/Fairy_Tales_Told_for_Children._First_Collection.",
        "pages": "784",
        "title": "Fairy tales",
        "year": 1836
    })
}

#[tokio::test]
async fn startup_creates_missing_document() {
    let app = TestApp::empty().await;
    assert_eq!(app.document(), json!({"books": []}));

    let (status, body) = app.send(Method::GET, "/api/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn create_then_list_round_trip() {
    let app = TestApp::with_document(json!({"books": [], "owner": "library"})).await;

    let (status, created) = app
        .send(Method::POST, "/api/books", Some(create_body()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let id = created["id"].as_str().unwrap();
    assert_eq!(id.len(), 8);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(created["pages"], 784);
    assert_eq!(created["title"], "Fairy tales");

    let (status, listed) = app.send(Method::GET, "/api/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([created.clone()]));

    // Sibling keys survive the rewrite.
    assert_eq!(app.document()["owner"], "library");
}

#[tokio::test]
async fn create_with_missing_field_is_rejected() {
    let app = TestApp::with_document(json!({"books": []})).await;
    let mut body = create_body();
    body.as_object_mut().unwrap().remove("country");

    let (status, error) = app.send(Method::POST, "/api/books", Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["error"]["code"], "validation_error");
    assert_eq!(error["error"]["message"], "Missing body info!");
    assert_eq!(error["error"]["details"], json!([{"field": "country"}]));
    assert_eq!(app.document(), json!({"books": []}));
}

#[tokio::test]
async fn create_with_non_object_body_is_a_bad_request() {
    let app = TestApp::with_document(json!({"books": []})).await;

    let (status, error) = app
        .send(Method::POST, "/api/books", Some(json!([create_body()])))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "bad_request");

    let bytes = serde_json::to_vec(&create_body()).unwrap();
    let (status, error) = app.send_raw(Method::POST, "/api/books", None, bytes).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "bad_request");

    assert_eq!(app.document(), json!({"books": []}));
}

#[tokio::test]
async fn create_with_non_string_text_field_is_rejected() {
    let app = TestApp::with_document(json!({"books": []})).await;
    let mut body = create_body();
    body["author"] = json!(42);

    let (status, error) = app.send(Method::POST, "/api/books", Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["error"]["code"], "validation_error");
    assert_eq!(error["error"]["message"], "Field author must be a string");
    assert_eq!(app.document(), json!({"books": []}));
}

#[tokio::test]
async fn list_paginates_and_filters() {
    let books: Vec<Value> = (0..12)
        .map(|i| {
            let country = if i % 2 == 0 { "France" } else { "Italy" };
            sample_book(&format!("{:08x}", i), "Anon", country)
        })
        .collect();
    let app = TestApp::with_document(json!({ "books": books })).await;

    let (status, page) = app
        .send(Method::GET, "/api/books?page=2&limit=5", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page, json!(books[5..10].to_vec()));

    let (_, all) = app.send(Method::GET, "/api/books?limit=12", None).await;
    assert_eq!(all, json!(books));

    let (_, italian) = app
        .send(Method::GET, "/api/books?country=Italy&author=Anon&limit=3", None)
        .await;
    assert_eq!(
        italian,
        json!([books[1].clone(), books[3].clone(), books[5].clone()])
    );
}

#[tokio::test]
async fn list_pages_past_the_end_shrink_then_empty() {
    let books: Vec<Value> = (0..12)
        .map(|i| sample_book(&format!("{:08x}", i), "Anon", "France"))
        .collect();
    let app = TestApp::with_document(json!({ "books": books })).await;

    let (status, tail) = app
        .send(Method::GET, "/api/books?page=3&limit=5", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tail, json!(books[10..12].to_vec()));

    let (status, beyond) = app
        .send(Method::GET, "/api/books?page=4&limit=5", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(beyond, json!([]));
}

#[tokio::test]
async fn list_with_unknown_filter_is_rejected() {
    let app = TestApp::with_document(json!({"books": []})).await;

    let (status, error) = app.send(Method::GET, "/api/books?foo=bar", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["error"]["message"], "Query foo is not allowed");
}

#[tokio::test]
async fn update_merges_allowed_fields() {
    let app = TestApp::with_document(json!({
        "books": [sample_book("0000000a", "A", "X"), sample_book("0000000b", "B", "Y")]
    }))
    .await;

    let (status, updated) = app
        .send(
            Method::PUT,
            "/api/books/0000000b",
            Some(json!({"title": "Renamed", "year": "2001"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let mut expected = sample_book("0000000b", "B", "Y");
    expected["title"] = json!("Renamed");
    expected["year"] = json!("2001");
    assert_eq!(updated, expected);
    assert_eq!(app.document()["books"][1], expected);
    assert_eq!(app.document()["books"][0], sample_book("0000000a", "A", "X"));
}

#[tokio::test]
async fn update_with_disallowed_field_leaves_book_untouched() {
    let original = json!({ "books": [sample_book("0000000a", "A", "X")] });
    let app = TestApp::with_document(original.clone()).await;

    let (status, error) = app
        .send(
            Method::PUT,
            "/api/books/0000000a",
            Some(json!({"id": "x", "title": "Hijacked"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["error"]["message"], "Update field not allowed");
    assert_eq!(app.document(), original);
}

#[tokio::test]
async fn update_with_non_string_text_field_is_rejected() {
    let original = json!({ "books": [sample_book("0000000a", "A", "X")] });
    let app = TestApp::with_document(original.clone()).await;

    for patch in [json!({"title": 5}), json!({"title": null})] {
        let (status, error) = app
            .send(Method::PUT, "/api/books/0000000a", Some(patch))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error["error"]["message"], "Invalid update: title must be a string");
        assert_eq!(error["error"]["details"], json!([{"field": "title"}]));
    }
    assert_eq!(app.document(), original);
}

#[tokio::test]
async fn update_stores_null_numbers() {
    let app = TestApp::with_document(json!({ "books": [sample_book("0000000a", "A", "X")] })).await;

    let (status, updated) = app
        .send(Method::PUT, "/api/books/0000000a", Some(json!({"pages": null})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["pages"], Value::Null);
    assert!(app.document()["books"][0]
        .as_object()
        .unwrap()
        .get("pages")
        .is_some_and(Value::is_null));
}

#[tokio::test]
async fn update_and_delete_unknown_id_are_not_found() {
    let app = TestApp::with_document(json!({ "books": [sample_book("0000000a", "A", "X")] })).await;

    let (status, error) = app
        .send(Method::PUT, "/api/books/deadbeef", Some(json!({"title": "t"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"]["code"], "not_found");

    let (status, _) = app.send(Method::DELETE, "/api/books/deadbeef", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_exactly_one_book() {
    let books = vec![
        sample_book("00000001", "A", "X"),
        sample_book("00000002", "B", "X"),
        sample_book("00000003", "C", "X"),
    ];
    let app = TestApp::with_document(json!({ "books": books, "version": 3 })).await;

    let (status, body) = app.send(Method::DELETE, "/api/books/00000002", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    assert_eq!(
        app.document(),
        json!({ "books": [books[0].clone(), books[2].clone()], "version": 3 })
    );
}

#[tokio::test]
async fn malformed_document_is_an_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(&path, "not json").unwrap();
    let app = TestApp::at(dir, path).await;

    let (status, error) = app.send(Method::GET, "/api/books", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error["error"]["code"], "internal_error");
}

#[tokio::test]
async fn module_health_reports_ok() {
    let app = TestApp::empty().await;

    let (status, body) = app.send(Method::GET, "/api/books/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("books module is healthy"));
}

#[tokio::test]
async fn openapi_document_lists_book_routes() {
    let app = TestApp::empty().await;

    let (status, spec) = app.send(Method::GET, "/docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"]["/api/books"]["get"].is_object());
    assert!(spec["paths"]["/api/books/{bookId}"]["put"].is_object());
    assert!(spec["components"]["schemas"]["Book"].is_object());
}
