//! Markdown rendering for post bodies.
//!
//! Raw HTML in the source is emitted as escaped text, link targets with a
//! scheme outside the allow-list are replaced by `#`, and soft line breaks
//! become `<br />`.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

const LINK_SCHEMES: &[&str] = &["http", "https", "mailto"];
const IMAGE_SCHEMES: &[&str] = &["http", "https", "data"];

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options
}

/// Render markdown to sanitized HTML. Empty input yields an empty string.
pub fn render(markdown: &str) -> String {
    if markdown.trim().is_empty() {
        return String::new();
    }
    let events = Parser::new_ext(markdown, options()).map(sanitize_event);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

/// Plain text of the first `max_chars` characters, for excerpts and
/// descriptions.
pub fn plain_excerpt(markdown: &str, max_chars: usize) -> String {
    let mut text = String::new();
    for event in Parser::new_ext(markdown, options()) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(
                Tag::Paragraph
                | Tag::Heading(..)
                | Tag::Item
                | Tag::CodeBlock(_)
                | Tag::BlockQuote
                | Tag::TableCell,
            ) => text.push(' '),
            _ => {}
        }
    }
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(max_chars).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}

fn sanitize_event(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) => Event::Text(raw),
        Event::SoftBreak => Event::HardBreak,
        Event::Start(tag) => Event::Start(sanitize_tag(tag)),
        Event::End(tag) => Event::End(sanitize_tag(tag)),
        other => other,
    }
}

fn sanitize_tag(tag: Tag<'_>) -> Tag<'_> {
    match tag {
        Tag::Link(kind, url, title) if !is_allowed_url(&url, LINK_SCHEMES) => {
            Tag::Link(kind, CowStr::Borrowed("#"), title)
        }
        Tag::Image(kind, url, title) if !is_allowed_url(&url, IMAGE_SCHEMES) => {
            Tag::Image(kind, CowStr::Borrowed("#"), title)
        }
        other => other,
    }
}

/// Relative URLs are always allowed; absolute ones need a listed scheme.
fn is_allowed_url(url: &str, schemes: &[&str]) -> bool {
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    let Some(colon) = cleaned.find(':') else {
        return true;
    };
    if cleaned[..colon].contains(['/', '?', '#']) {
        return true;
    }
    let scheme = cleaned[..colon].to_ascii_lowercase();
    schemes.contains(&scheme.as_str())
}
