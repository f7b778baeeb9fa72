//! Shared utilities for integration tests.
//!
//! Each test starts the real server on an ephemeral port, backed by an
//! in-memory store and the repository's `features/` tree.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use tempfile::TempDir;
use tokio::net::TcpListener;

use stepwise_blog::config::BlogConfig;
use stepwise_blog::lifecycle::{build_application, Shutdown};
use stepwise_blog::services::{settings, Services};
use stepwise_blog::store::{NewUser, Role, User};
use stepwise_blog::HttpServer;

pub const ADMIN_PASSWORD: &str = "password123";

pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub services: Arc<Services>,
    shutdown: Shutdown,
    _dir: TempDir,
}

impl TestServer {
    /// Fresh, uninstalled site.
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let static_dir = dir.path().join("public");
        std::fs::create_dir_all(static_dir.join("css")).unwrap();
        std::fs::write(static_dir.join("css/style.css"), "body { margin: 0; }").unwrap();

        let mut config = BlogConfig::default();
        config.features.root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("features");
        config.static_files.dir = static_dir;
        config.uploads.dir = dir.path().join("uploads");
        config.auth.pbkdf2_iterations = 1_000;

        let app = build_application(config).unwrap();
        let services = app.services.clone();
        let server = HttpServer::new(app);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let stop = shutdown.clone();
        tokio::spawn(async move { server.run(listener, &stop).await });

        let client = Client::builder().redirect(Policy::none()).build().unwrap();
        Self {
            addr,
            client,
            services,
            shutdown,
            _dir: dir,
        }
    }

    /// Site already installed with an administrator named `admin`.
    pub async fn installed() -> Self {
        let server = Self::start().await;
        server.add_user("admin", Role::Admin).await;
        server
            .services
            .store
            .set_setting(settings::INSTALLED, "true")
            .await
            .unwrap();
        server
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn add_user(&self, username: &str, role: Role) -> User {
        let password_hash = self.services.passwords.hash(ADMIN_PASSWORD).await.unwrap();
        self.services
            .store
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash,
                display_name: username.to_string(),
                role,
            })
            .await
            .unwrap()
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn get_as(&self, path: &str, cookie: &str) -> Response {
        self.client
            .get(self.url(path))
            .header(COOKIE, cookie)
            .send()
            .await
            .unwrap()
    }

    pub async fn post_form(&self, path: &str, cookie: Option<&str>, form: &[(&str, &str)]) -> Response {
        let mut request = self.client.post(self.url(path)).form(form);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        request.send().await.unwrap()
    }

    /// Log in and return the `name=value` pair to send back as `Cookie`.
    pub async fn login(&self, username: &str) -> String {
        let res = self
            .post_form(
                "/auth/login",
                None,
                &[("username", username), ("password", ADMIN_PASSWORD)],
            )
            .await;
        assert_eq!(res.status(), 302, "login failed for {username}");
        session_cookie(&res).expect("login sets a session cookie")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// `name=value` of the first `Set-Cookie` header.
pub fn session_cookie(res: &Response) -> Option<String> {
    let value = res.headers().get(SET_COOKIE)?.to_str().ok()?;
    value.split(';').next().map(|pair| pair.trim().to_string())
}

pub fn location(res: &Response) -> &str {
    res.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
