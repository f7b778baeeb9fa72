//! Login and installation forms.

use askama::Template;

use crate::pipeline::FormData;
use crate::views::Chrome;

#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginPage<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    username: &'a str,
    error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "auth/install.html")]
struct InstallPage<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    username: &'a str,
    email: &'a str,
    display_name: &'a str,
    error: Option<&'a str>,
}

pub fn login(chrome: &Chrome, form: &FormData, error: Option<&str>) -> askama::Result<String> {
    LoginPage {
        chrome,
        title: "Log in",
        username: form.get("username").unwrap_or(""),
        error,
    }
    .render()
}

/// Installation wizard. Passwords are never echoed back.
pub fn install(chrome: &Chrome, form: &FormData, error: Option<&str>) -> askama::Result<String> {
    InstallPage {
        chrome,
        title: "Install",
        username: form.get("username").unwrap_or(""),
        email: form.get("email").unwrap_or(""),
        display_name: form.get("displayName").unwrap_or(""),
        error,
    }
    .render()
}
