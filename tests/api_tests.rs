use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;

use cinefetch::{
    api::{create_router, AppState},
    config::Config,
    error::{FetchError, FetchResult},
    models::{SearchPage, TitleDetails, TitleSummary},
    services::providers::{CatalogProvider, VideoProvider},
};

/// In-memory catalog seeded with a handful of titles
struct FakeCatalog {
    details: HashMap<&'static str, TitleDetails>,
    searches: HashMap<&'static str, Vec<&'static str>>,
}

impl FakeCatalog {
    fn seeded() -> Self {
        let title = |id: &str, name: &str, genres: &[&str]| TitleDetails {
            id: id.to_string(),
            title: name.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        };

        let details = HashMap::from([
            ("tt1", title("tt1", "The Great Escape", &["Action", "Comedy"])),
            ("tt2", title("tt2", "Up", &[])),
            ("tt3", title("tt3", "Airplane!", &["Comedy"])),
            ("tt4", title("tt4", "Die Hard", &["Action", "Thriller"])),
        ]);
        let searches = HashMap::from([
            ("Action", vec!["tt1", "tt2"]),
            ("Comedy", vec!["tt2", "tt3"]),
            ("avengers", vec!["tt4", "tt1"]),
            ("comedy", vec!["tt3", "tt4"]),
        ]);

        Self { details, searches }
    }
}

#[async_trait::async_trait]
impl CatalogProvider for FakeCatalog {
    async fn search(&self, text: &str, _page: u32) -> FetchResult<SearchPage> {
        let items = self
            .searches
            .get(text)
            .map(|ids| {
                ids.iter()
                    .map(|id| TitleSummary {
                        id: id.to_string(),
                        title: format!("Title {}", id),
                        year: Some("1999".to_string()),
                        poster_url: None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(SearchPage {
            items,
            total_pages: 1,
        })
    }

    async fn detail(&self, id: &str) -> FetchResult<TitleDetails> {
        if id == "tt500" {
            return Err(FetchError::NetworkFailure("upstream down".to_string()));
        }
        self.details
            .get(id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound("Incorrect IMDb ID.".to_string()))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Catalog whose details resolve but whose every search fails
struct SearchDownCatalog(FakeCatalog);

#[async_trait::async_trait]
impl CatalogProvider for SearchDownCatalog {
    async fn search(&self, _text: &str, _page: u32) -> FetchResult<SearchPage> {
        Err(FetchError::NetworkFailure("search down".to_string()))
    }

    async fn detail(&self, id: &str) -> FetchResult<TitleDetails> {
        self.0.detail(id).await
    }

    fn name(&self) -> &'static str {
        "search-down"
    }
}

struct FakeVideos;

#[async_trait::async_trait]
impl VideoProvider for FakeVideos {
    async fn find_trailer(&self, title: &str) -> FetchResult<Option<String>> {
        Ok((title == "The Great Escape").then(|| "escape-trailer".to_string()))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn create_test_server() -> TestServer {
    create_server_with(&[], Arc::new(FakeCatalog::seeded()))
}

fn create_server_with(env: &[(&str, &str)], catalog: Arc<dyn CatalogProvider>) -> TestServer {
    let mut vars = vec![("OMDB_API_KEY".to_string(), "test".to_string())];
    vars.extend(env.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    let config: Config = envy::from_iter(vars).unwrap();

    let state = AppState::new(&config, catalog, Arc::new(FakeVideos));
    TestServer::new(create_router(state)).unwrap()
}

/// Polls a session until `done` holds for its snapshot
async fn wait_for(server: &TestServer, session_id: &str, done: impl Fn(&Value) -> bool) -> Value {
    for _ in 0..100 {
        let snapshot: Value = server
            .get(&format!("/api/v1/sessions/{}", session_id))
            .await
            .json();
        if done(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session {} never settled", session_id);
}

fn ids(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let id = "5f0c4a8e-0b8f-4a43-9d9e-3f1d8f9a2c11";

    let response = server
        .get("/health")
        .add_header(
            "x-request-id".parse::<axum::http::HeaderName>().unwrap(),
            id.parse::<axum::http::HeaderValue>().unwrap(),
        )
        .await;

    assert_eq!(response.header("x-request-id"), id);
}

#[tokio::test]
async fn test_search_titles() {
    let server = create_test_server();

    let response = server.get("/api/v1/titles/search?q=Action").await;
    response.assert_status_ok();
    let page: Value = response.json();
    assert_eq!(ids(&page["items"]), vec!["tt1", "tt2"]);

    let blank: Value = server.get("/api/v1/titles/search?q=%20%20").await.json();
    assert_eq!(blank["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_get_title_and_errors() {
    let server = create_test_server();

    let response = server.get("/api/v1/titles/tt1").await;
    response.assert_status_ok();
    let title: Value = response.json();
    assert_eq!(title["title"], "The Great Escape");
    assert_eq!(title["imdb_url"], "https://www.imdb.com/title/tt1");
    assert!(title["box_office"].is_null());

    let missing = server.get("/api/v1/titles/tt404").await;
    missing.assert_status(StatusCode::NOT_FOUND);
    let body: Value = missing.json();
    assert_eq!(body["error"], "Incorrect IMDb ID.");

    server
        .get("/api/v1/titles/tt500")
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_related_titles() {
    let server = create_test_server();

    let response = server.get("/api/v1/titles/tt1/related").await;
    response.assert_status_ok();
    let related: Value = response.json();
    assert_eq!(related["status"], "ready");
    assert_eq!(ids(&related["items"]), vec!["tt2", "tt3"]);

    let up: Value = server.get("/api/v1/titles/tt2/related").await.json();
    assert_eq!(up["status"], "not_applicable");
    assert_eq!(up["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_related_titles_survive_failing_searches() {
    let server = create_server_with(&[], Arc::new(SearchDownCatalog(FakeCatalog::seeded())));

    let response = server.get("/api/v1/titles/tt1/related").await;
    response.assert_status_ok();
    let related: Value = response.json();
    assert_eq!(related["title_id"], "tt1");
    assert_eq!(related["status"], "empty");
    assert_eq!(related["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_related_titles_filtered_by_category() {
    let server = create_test_server();

    // tt2 has no genres, so only tt3 is a comedy
    let query: Value = server
        .get("/api/v1/titles/tt1/related?category=comedy")
        .await
        .json();
    assert_eq!(query["status"], "ready");
    assert_eq!(ids(&query["items"]), vec!["tt3"]);

    let configured = create_server_with(
        &[("RELATED_CATEGORY", "Comedy")],
        Arc::new(FakeCatalog::seeded()),
    );
    let related: Value = configured.get("/api/v1/titles/tt1/related").await.json();
    assert_eq!(ids(&related["items"]), vec!["tt3"]);
}

#[tokio::test]
async fn test_imdb_link_uses_configured_base() {
    let server = create_server_with(
        &[("IMDB_BASE_URL", "https://m.imdb.com/title/")],
        Arc::new(FakeCatalog::seeded()),
    );

    let title: Value = server.get("/api/v1/titles/tt3").await.json();
    assert_eq!(title["imdb_url"], "https://m.imdb.com/title/tt3");
}

#[tokio::test]
async fn test_browse_categories() {
    let server = create_test_server();

    let avengers: Value = server.get("/api/v1/categories/avengers").await.json();
    assert_eq!(ids(&avengers["items"]), vec!["tt4", "tt1"]);

    // tt4 is not a comedy
    let comedy: Value = server.get("/api/v1/categories/comedy?page=1").await.json();
    assert_eq!(ids(&comedy["items"]), vec!["tt3"]);
}

#[tokio::test]
async fn test_session_flow() {
    let server = create_test_server();

    let response = server.post("/api/v1/sessions").await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    let session_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["detail"]["status"], "idle");
    assert_eq!(created["related"]["status"], "pending");

    let response = server
        .put(&format!("/api/v1/sessions/{}/title/tt1", session_id))
        .await;
    response.assert_status_ok();
    let navigated: Value = response.json();
    assert_eq!(navigated["title_id"], "tt1");
    assert_eq!(navigated["detail"]["status"], "ready");
    assert_eq!(navigated["detail"]["data"]["title"], "The Great Escape");

    let settled = wait_for(&server, &session_id, |s| s["trigger"] == "done").await;
    assert_eq!(settled["related"]["status"], "ready");
    assert_eq!(ids(&settled["related"]["data"]), vec!["tt2", "tt3"]);
    assert_eq!(settled["related_for"], "tt1");

    let visible: Value = server
        .post(&format!("/api/v1/sessions/{}/visible", session_id))
        .await
        .json();
    assert_eq!(visible["trigger"], "done");
}

#[tokio::test]
async fn test_trailer_requires_sign_in() {
    let server = create_test_server();
    let created: Value = server.post("/api/v1/sessions").await.json();
    let session_id = created["id"].as_str().unwrap().to_string();

    server
        .put(&format!("/api/v1/sessions/{}/title/tt1", session_id))
        .await
        .assert_status_ok();

    let trailer: Value = server
        .post(&format!("/api/v1/sessions/{}/trailer", session_id))
        .await
        .json();
    assert_eq!(trailer["status"], "sign_in_required");

    let snapshot: Value = server
        .post(&format!("/api/v1/sessions/{}/sign-in", session_id))
        .await
        .json();
    assert_eq!(snapshot["signed_in"], true);

    let settled = wait_for(&server, &session_id, |s| {
        s["trailer"]["status"] == "ready"
    })
    .await;
    assert_eq!(settled["trailer"]["video_id"], "escape-trailer");
}

#[tokio::test]
async fn test_missing_trailer_links_to_search() {
    let server = create_test_server();
    let created: Value = server.post("/api/v1/sessions").await.json();
    let session_id = created["id"].as_str().unwrap().to_string();

    server
        .put(&format!("/api/v1/sessions/{}/title/tt3", session_id))
        .await
        .assert_status_ok();
    server
        .post(&format!("/api/v1/sessions/{}/sign-in", session_id))
        .await
        .assert_status_ok();

    let trailer: Value = server
        .post(&format!("/api/v1/sessions/{}/trailer", session_id))
        .await
        .json();
    assert_eq!(trailer["status"], "not_found");
    assert_eq!(
        trailer["search_url"],
        "https://www.youtube.com/results?search_query=Airplane%21+trailer"
    );
}

#[tokio::test]
async fn test_close_session() {
    let server = create_test_server();
    let created: Value = server.post("/api/v1/sessions").await.json();
    let session_id = created["id"].as_str().unwrap().to_string();

    server
        .delete(&format!("/api/v1/sessions/{}", session_id))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .get(&format!("/api/v1/sessions/{}", session_id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .delete(&format!("/api/v1/sessions/{}", session_id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_idle_session_expires() {
    let server = create_server_with(
        &[("SESSION_IDLE_SECS", "0")],
        Arc::new(FakeCatalog::seeded()),
    );
    let created: Value = server.post("/api/v1/sessions").await.json();
    let session_id = created["id"].as_str().unwrap().to_string();

    let response = server
        .get(&format!("/api/v1/sessions/{}", session_id))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], format!("Session {} not found", session_id));
}
