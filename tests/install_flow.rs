//! Installation gate and the install wizard.

mod common;

use common::{location, TestServer, ADMIN_PASSWORD};

#[tokio::test]
async fn test_gate_redirects_until_installed() {
    let server = TestServer::start().await;

    for path in ["/", "/blog", "/admin", "/api/search?q=x"] {
        let res = server.get(path).await;
        assert_eq!(res.status(), 302, "{path}");
        assert_eq!(location(&res), "/install", "{path}");
    }
    assert_eq!(server.get("/install").await.status(), 200);
    assert_eq!(server.get("/auth/login").await.status(), 200);
}

#[tokio::test]
async fn test_install_validation_errors() {
    let server = TestServer::start().await;

    let res = server
        .post_form(
            "/install",
            None,
            &[
                ("username", "admin"),
                ("email", "admin@example.com"),
                ("password", "password123"),
                ("passwordConfirm", "password124"),
                ("displayName", "Admin"),
            ],
        )
        .await;
    assert_eq!(res.status(), 400);
    assert!(res.text().await.unwrap().contains("Passwords do not match."));

    let res = server
        .post_form("/install", None, &[("username", "admin")])
        .await;
    assert_eq!(res.status(), 400);
    assert!(res
        .text()
        .await
        .unwrap()
        .contains("All required fields must be filled in."));

    assert!(!server.services.store.is_installed().await);
}

#[tokio::test]
async fn test_install_then_login() {
    let server = TestServer::start().await;

    let res = server
        .post_form(
            "/install",
            None,
            &[
                ("username", "owner"),
                ("email", "owner@example.com"),
                ("password", ADMIN_PASSWORD),
                ("passwordConfirm", ADMIN_PASSWORD),
                ("displayName", "Owner"),
            ],
        )
        .await;
    assert_eq!(res.status(), 302);
    assert_eq!(location(&res), "/auth/login");
    assert!(server.services.store.is_installed().await);

    // The wizard closes once the site is installed.
    let res = server.get("/install").await;
    assert_eq!(res.status(), 302);
    assert_eq!(location(&res), "/");

    let cookie = server.login("owner").await;
    assert_eq!(server.get_as("/admin", &cookie).await.status(), 200);
}
