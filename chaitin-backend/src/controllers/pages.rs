use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use tera::Context;

use crate::AppState;
use crate::controllers::today;
use crate::db::is_unique_violation;
use crate::errors::AppResult;
use crate::forms::{FormErrors, SubscriptionForm};
use crate::mailing::notify_subscription;
use crate::middleware::flash::{self, FlashMessage};
use crate::middleware::session_auth::current_user;
use crate::models::WorkshopSchedule;
use crate::templates::{render, render_with};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/")
            .route(web::get().to(index))
            .route(web::post().to(subscribe_post)),
    );
    cfg.service(web::resource("/subscribe/").route(web::get().to(subscribe)));
    cfg.service(web::resource("/code-of-conduct/").route(web::get().to(code_of_conduct)));
}

/// Workshops, posts and members shown on the home page
fn index_context(state: &AppState, req: &HttpRequest) -> AppResult<Context> {
    let logged_in = current_user(state, req)?.is_some();
    let schedule = WorkshopSchedule::split(state.db.list_workshops()?, today());

    let mut context = Context::new();
    context.insert("future_workshop_list", &schedule.future);
    context.insert("past_workshop_list", &schedule.past);
    context.insert("draft_workshop_list", &schedule.drafts);
    context.insert("post_list", &state.db.list_published_posts()?);
    // Anonymous visitors only see members who opted in
    context.insert("member_list", &state.db.list_members(!logged_in)?);
    Ok(context)
}

async fn index(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let mut context = index_context(&state, &req)?;
    context.insert("form", &SubscriptionForm::default());
    context.insert("errors", &FormErrors::new());
    render(&state, &req, "index.html", context)
}

async fn subscribe_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<SubscriptionForm>,
) -> AppResult<HttpResponse> {
    let email = match form.clean() {
        Ok(email) => email,
        Err(errors) => {
            log::warn!("Rejected subscription for {:?}", form.email);
            let mut context = index_context(&state, &req)?;
            context.insert("form", &form.into_inner());
            context.insert("errors", &errors);
            return render_with(
                &state,
                &req,
                "index.html",
                context,
                StatusCode::OK,
                vec![FlashMessage::error("Something is wrong.")],
            );
        }
    };

    let already = || flash::redirect(&req, "/", vec![FlashMessage::info("Email already subscribed :)")]);

    if state.db.subscription_exists(&email)? {
        return Ok(already());
    }
    match state.db.create_subscription(&email) {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Ok(already()),
        Err(e) => return Err(e.into()),
    }

    log::info!("New subscription: {}", email);
    notify_subscription(state.mailer.as_ref(), &state.config, &email).await?;

    Ok(flash::redirect(
        &req,
        "/",
        vec![FlashMessage::success("Thanks! Email saved—we’ll be in touch soon!")],
    ))
}

async fn subscribe(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("form", &SubscriptionForm::default());
    context.insert("errors", &FormErrors::new());
    render(&state, &req, "subscribe.html", context)
}

async fn code_of_conduct(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    render(&state, &req, "codeofconduct.html", Context::new())
}
