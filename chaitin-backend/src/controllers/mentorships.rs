use actix_web::{HttpRequest, HttpResponse, web};
use tera::Context;

use crate::AppState;
use crate::db::is_unique_violation;
use crate::errors::{AppError, AppResult};
use crate::forms::{FormErrors, MentorshipForm};
use crate::middleware::flash::{self, FlashMessage};
use crate::middleware::session_auth::require_login;
use crate::templates::render;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/mentorships/").route(web::get().to(mentorship_list)));
    // Registered before the detail route so "new" is not taken for a slug
    cfg.service(
        web::resource("/mentorships/new/")
            .route(web::get().to(mentorship_new))
            .route(web::post().to(mentorship_create)),
    );
    cfg.service(web::resource("/mentorships/{slug}/").route(web::get().to(mentorship_detail)));
    cfg.service(web::resource("/mentorships/{slug}/delete/").route(web::post().to(mentorship_delete)));
}

async fn mentorship_list(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("mentorship_list", &state.db.list_mentorships()?);
    render(&state, &req, "mentorship_list.html", context)
}

async fn mentorship_detail(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let mentorship = state.db.get_mentorship_by_slug(&path)?.ok_or(AppError::NotFound)?;
    let mut context = Context::new();
    context.insert("mentorship", &mentorship);
    render(&state, &req, "mentorship.html", context)
}

fn form_page(
    state: &AppState,
    req: &HttpRequest,
    form: &MentorshipForm,
    errors: &FormErrors,
) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, req, "mentorship_form.html", context)
}

async fn mentorship_new(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    require_login(&state, &req)?;
    form_page(&state, &req, &MentorshipForm::default(), &FormErrors::new())
}

async fn mentorship_create(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<MentorshipForm>,
) -> AppResult<HttpResponse> {
    let mentor = require_login(&state, &req)?;

    let (title, slug, body) = match form.clean() {
        Ok(fields) => fields,
        Err(errors) => return form_page(&state, &req, &form, &errors),
    };

    let mentorship = match state.db.create_mentorship(&title, &slug, &body, mentor.id) {
        Ok(mentorship) => mentorship,
        Err(e) if is_unique_violation(&e) => {
            let mut errors = FormErrors::new();
            errors.add("slug", "Mentorship with this Slug already exists.");
            return form_page(&state, &req, &form, &errors);
        }
        Err(e) => return Err(e.into()),
    };

    Ok(flash::redirect(
        &req,
        &format!("/mentorships/{}/", mentorship.slug),
        vec![FlashMessage::success("Mentorship created.")],
    ))
}

/// Only the mentor or a superuser may remove a listing
async fn mentorship_delete(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user = require_login(&state, &req)?;
    let mentorship = state.db.get_mentorship_by_slug(&path)?.ok_or(AppError::NotFound)?;

    if mentorship.mentor_id != user.id && !user.is_superuser {
        return Err(AppError::PermissionDenied);
    }

    state.db.delete_mentorship(mentorship.id)?;
    Ok(flash::redirect(
        &req,
        "/mentorships/",
        vec![FlashMessage::info("Mentorship deleted.")],
    ))
}
