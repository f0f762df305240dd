//! HTML rendering: embedded Tera templates and the shared page context

use actix_web::{HttpRequest, HttpResponse, http::StatusCode};
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};
use std::collections::HashMap;
use tera::{Context, Tera, Value};

use crate::AppState;
use crate::errors::AppResult;
use crate::middleware::flash::{self, FlashMessage};
use crate::middleware::session_auth::current_user;

macro_rules! embedded {
    ($($name:literal),* $(,)?) => {
        vec![$(($name, include_str!(concat!("../templates/", $name)))),*]
    };
}

/// Build the template engine with every page compiled in
pub fn build_templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(embedded![
        "base.html",
        "macros.html",
        "index.html",
        "subscribe.html",
        "codeofconduct.html",
        "workshop_list.html",
        "workshop.html",
        "announce.html",
        "broadcast.html",
        "blog.html",
        "post.html",
        "feedback.html",
        "submit.html",
        "proposal.html",
        "request.html",
        "incident.html",
        "mentorship_list.html",
        "mentorship.html",
        "mentorship_form.html",
        "user_detail.html",
        "login.html",
        "user_create.html",
        "user_update.html",
        "user_avatar.html",
        "user_delete.html",
        "images.html",
        "admin/index.html",
        "admin/list.html",
        "admin/post_form.html",
        "admin/workshop_form.html",
    ])?;
    tera.register_filter("markdown", markdown_filter);
    Ok(tera)
}

/// Link targets allowed in member-written markdown: relative, fragment, or a known scheme
fn is_safe_url(url: &str) -> bool {
    let url = url.trim_start();
    match url.find(|c: char| matches!(c, ':' | '/' | '?' | '#')) {
        Some(i) if url.as_bytes()[i] == b':' => {
            let scheme = url[..i].to_ascii_lowercase();
            matches!(scheme.as_str(), "http" | "https" | "mailto")
        }
        _ => true,
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) { url } else { CowStr::Borrowed("#") }
}

/// Markdown to HTML. Raw HTML in the source is escaped, not passed through,
/// and links or images with a script-capable scheme point nowhere.
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link { link_type, dest_url, title, id }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image { link_type, dest_url, title, id }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn markdown_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = tera::try_get_value!("markdown", "value", String, value);
    Ok(Value::String(render_markdown(&text)))
}

/// Render a page with status 200
pub fn render(state: &AppState, req: &HttpRequest, name: &str, context: Context) -> AppResult<HttpResponse> {
    render_with(state, req, name, context, StatusCode::OK, Vec::new())
}

/// Render a page, adding the visitor, pending flash messages and site settings to the context.
/// `extra` messages are shown on this response without a redirect.
pub fn render_with(
    state: &AppState,
    req: &HttpRequest,
    name: &str,
    mut context: Context,
    status: StatusCode,
    extra: Vec<FlashMessage>,
) -> AppResult<HttpResponse> {
    let user = current_user(state, req)?;
    let pending = flash::incoming(req);
    let had_pending = !pending.is_empty();

    let mut messages = pending;
    messages.extend(extra);

    context.insert("user", &user);
    context.insert("messages", &messages);
    context.insert("project_name", &state.config.project_name);
    context.insert("canonical_host", &state.config.canonical_host);
    context.insert("request_path", req.path());

    let body = state.templates.render(name, &context)?;

    let mut builder = HttpResponse::build(status);
    builder.content_type("text/html; charset=utf-8");
    if had_pending {
        builder.cookie(flash::clear_cookie());
    }
    Ok(builder.body(body))
}
