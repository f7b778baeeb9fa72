//! JSON API: search, comments and image upload.

mod common;

use common::{location, TestServer};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use stepwise_blog::store::{PostDraft, Role};

async fn seed_post(server: &TestServer, title: &str, slug: &str) {
    let admin = server.services.store.user_by_username("admin").await.unwrap();
    server
        .services
        .store
        .create_post(
            &admin.id,
            PostDraft {
                title: title.to_string(),
                slug: slug.to_string(),
                content: format!("All about {title}"),
                published: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_search_pagination() {
    let server = TestServer::installed().await;
    for i in 1..=3 {
        seed_post(&server, &format!("Tokio tip {i}"), &format!("tokio-tip-{i}")).await;
    }
    seed_post(&server, "Unrelated", "unrelated").await;

    let res = server.get("/api/search?q=TOKIO&perPage=2&page=2").await;
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 2);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_comment_lifecycle() {
    let server = TestServer::installed().await;
    seed_post(&server, "Commented", "commented").await;

    let res = server
        .client
        .post(server.url("/api/posts/commented/comments"))
        .json(&serde_json::json!({ "authorName": "Ann", "content": "Nice post" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    let id = body["comment"]["id"].as_str().unwrap().to_string();

    let res = server.get("/api/posts/commented/comments").await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["comments"].as_array().unwrap().len(), 1);
    assert_eq!(body["comments"][0]["authorName"], "Ann");

    // Anonymous: sent to login. Non-admin: JSON 403.
    let path = format!("/api/comments/{id}");
    let res = server.client.delete(server.url(&path)).send().await.unwrap();
    assert_eq!(res.status(), 302);
    assert_eq!(location(&res), "/auth/login");

    server.add_user("reader", Role::User).await;
    let reader = server.login("reader").await;
    let res = server
        .client
        .delete(server.url(&path))
        .header("cookie", &reader)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let admin = server.login("admin").await;
    let res = server
        .client
        .delete(server.url(&path))
        .header("cookie", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await.unwrap()["success"], true);

    let res = server
        .client
        .delete(server.url(&path))
        .header("cookie", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_comment_errors() {
    let server = TestServer::installed().await;
    seed_post(&server, "Quiet", "quiet").await;

    let res = server
        .post_form("/api/posts/quiet/comments", None, &[("authorName", "Ann")])
        .await;
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "content is required");

    let res = server
        .post_form(
            "/api/posts/missing/comments",
            None,
            &[("authorName", "Ann"), ("content", "Hi")],
        )
        .await;
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Post not found");

    // Validation runs before the post lookup.
    let res = server.post_form("/api/posts/missing/comments", None, &[]).await;
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "authorName is required");
}

#[tokio::test]
async fn test_image_upload() {
    let server = TestServer::installed().await;
    let cookie = server.login("admin").await;
    let png = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    let form = Form::new().part(
        "image",
        Part::bytes(png.clone())
            .file_name("cover.png")
            .mime_str("image/png")
            .unwrap(),
    );
    let res = server
        .client
        .post(server.url("/api/upload/image"))
        .header("cookie", &cookie)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/") && url.ends_with(".png"));

    let res = server.get(url).await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.bytes().await.unwrap().to_vec(), png);

    let form = Form::new().part(
        "image",
        Part::bytes(b"#!/bin/sh".to_vec())
            .file_name("run.sh")
            .mime_str("text/x-shellscript")
            .unwrap(),
    );
    let res = server
        .client
        .post(server.url("/api/upload/image"))
        .header("cookie", &cookie)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(
        res.json::<Value>().await.unwrap()["error"],
        "Only image files are allowed"
    );
}
