use actix_web::{HttpRequest, HttpResponse, web};
use tera::Context;

use crate::AppState;
use crate::errors::{AppError, AppResult};
use crate::templates::render;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/blog/").route(web::get().to(blog)));
    cfg.service(web::resource("/blog/{slug}/").route(web::get().to(post_detail)));
}

async fn blog(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("post_list", &state.db.list_published_posts()?);
    render(&state, &req, "blog.html", context)
}

/// Unpublished posts stay reachable by slug so drafts can be previewed
async fn post_detail(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post = state.db.get_post_by_slug(&path)?.ok_or(AppError::NotFound)?;

    let mut context = Context::new();
    context.insert("post", &post);
    render(&state, &req, "post.html", context)
}
