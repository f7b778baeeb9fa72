//! Public pages served through the feature tree.

mod common;

use common::TestServer;
use stepwise_blog::store::{PostDraft, Role};

async fn publish(server: &TestServer, author: &str, title: &str, slug: &str, published: bool) {
    server
        .services
        .store
        .create_post(
            author,
            PostDraft {
                title: title.to_string(),
                slug: slug.to_string(),
                content: format!("Body of {title}"),
                content_html: format!("<p>Body of {title}</p>"),
                published,
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_home_lists_published_posts() {
    let server = TestServer::installed().await;
    let admin = server.services.store.user_by_username("admin").await.unwrap();
    publish(&server, &admin.id, "Visible post", "visible-post", true).await;
    publish(&server, &admin.id, "Draft post", "draft-post", false).await;

    let res = server.get("/").await;
    assert_eq!(res.status(), 200);
    assert!(res.headers()["content-type"].to_str().unwrap().starts_with("text/html"));
    let body = res.text().await.unwrap();
    assert!(body.contains("Visible post"));
    assert!(!body.contains("Draft post"));
}

#[tokio::test]
async fn test_post_page_and_unknown_slug() {
    let server = TestServer::installed().await;
    let admin = server.services.store.user_by_username("admin").await.unwrap();
    publish(&server, &admin.id, "First", "first", true).await;
    publish(&server, &admin.id, "Hidden", "hidden", false).await;

    let res = server.get("/blog/first").await;
    assert_eq!(res.status(), 200);
    assert!(res.text().await.unwrap().contains("Body of First"));
    let post = server.services.store.post_by_slug("first").await.unwrap();
    assert_eq!(post.view_count, 1);

    assert_eq!(server.get("/blog/hidden").await.status(), 404);
    assert_eq!(server.get("/blog/missing").await.status(), 404);
    assert_eq!(server.get("/blog/category/missing").await.status(), 404);
}

#[tokio::test]
async fn test_trailing_slash_and_unmatched_paths() {
    let server = TestServer::installed().await;
    assert_eq!(server.get("/about/").await.status(), 200);
    assert_eq!(server.get("/blog//x").await.status(), 404);

    let res = server.get("/no/such/page").await;
    assert_eq!(res.status(), 404);
    assert!(res.headers()["content-type"].to_str().unwrap().starts_with("text/html"));

    let res = server.get("/api/nothing-here").await;
    assert_eq!(res.status(), 404);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_sitemap() {
    let server = TestServer::installed().await;
    let admin = server.services.store.user_by_username("admin").await.unwrap();
    publish(&server, &admin.id, "Mapped", "mapped", true).await;

    let res = server.get("/sitemap.xml").await;
    assert_eq!(res.status(), 200);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/xml"));
    let xml = res.text().await.unwrap();
    assert!(xml.contains("<loc>http://localhost:5555/blog/mapped</loc>"));
    assert!(xml.contains("<loc>http://localhost:5555/about</loc>"));
}

#[tokio::test]
async fn test_static_files_and_response_headers() {
    let server = TestServer::start().await;

    // Served even before installation.
    let res = server.get("/static/css/style.css").await;
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert_eq!(res.text().await.unwrap(), "body { margin: 0; }");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let server = TestServer::installed().await;
    let res = server
        .client
        .get(server.url("/about"))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me");
}

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let server = TestServer::installed().await;
    server.add_user("reader", Role::User).await;
    let cookie = server.login("reader").await;

    assert_eq!(server.get_as("/admin", &cookie).await.status(), 403);
    assert_eq!(server.get_as("/", &cookie).await.status(), 200);
}
