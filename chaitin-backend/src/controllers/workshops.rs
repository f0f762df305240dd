use actix_web::{HttpRequest, HttpResponse, http::header, web};
use tera::Context;

use crate::AppState;
use crate::controllers::today;
use crate::errors::{AppError, AppResult};
use crate::forms::{AnnounceForm, AttendanceForm, FormErrors};
use crate::ics;
use crate::mailing::{notify_rsvp, send_broadcast};
use crate::middleware::flash::{self, FlashMessage};
use crate::middleware::session_auth::require_superuser;
use crate::models::{Workshop, WorkshopSchedule};
use crate::templates::render;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/events/").route(web::get().to(workshop_list)));
    cfg.service(web::resource("/events/ics/").route(web::get().to(workshop_list_ics)));
    cfg.service(
        web::resource("/workshops/{slug}/")
            .route(web::get().to(workshop_detail))
            .route(web::post().to(rsvp)),
    );
    cfg.service(web::resource("/workshops/{slug}/ics/").route(web::get().to(workshop_ics)));
    cfg.service(
        web::resource("/workshops/{slug}/announce/")
            .route(web::get().to(announce))
            .route(web::post().to(announce_post)),
    );
}

fn find_workshop(state: &AppState, slug: &str) -> AppResult<Workshop> {
    state.db.get_workshop_by_slug(slug)?.ok_or(AppError::NotFound)
}

async fn workshop_list(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let schedule = WorkshopSchedule::split(state.db.list_workshops()?, today());

    let mut context = Context::new();
    context.insert("future_workshop_list", &schedule.future);
    context.insert("past_workshop_list", &schedule.past);
    context.insert("draft_workshop_list", &schedule.drafts);
    render(&state, &req, "workshop_list.html", context)
}

async fn workshop_list_ics(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let workshops = state.db.list_scheduled_workshops()?;
    Ok(HttpResponse::Ok()
        .content_type("text/calendar; charset=utf-8")
        .body(ics::calendar(&state.config, &workshops)))
}

fn detail_context(state: &AppState, workshop: &Workshop) -> AppResult<Context> {
    let mut context = Context::new();
    context.insert("workshop", workshop);
    context.insert("attendance_count", &state.db.count_attendances(workshop.id)?);
    context.insert("is_past", &workshop.is_past(today()));
    Ok(context)
}

async fn workshop_detail(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let workshop = find_workshop(&state, &path)?;
    let mut context = detail_context(&state, &workshop)?;
    context.insert("form", &AttendanceForm::default());
    context.insert("errors", &FormErrors::new());
    render(&state, &req, "workshop.html", context)
}

async fn rsvp(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    form: web::Form<AttendanceForm>,
) -> AppResult<HttpResponse> {
    let workshop = find_workshop(&state, &path)?;

    let email = match form.clean() {
        Ok(email) => email,
        Err(errors) => {
            let mut context = detail_context(&state, &workshop)?;
            context.insert("form", &form.into_inner());
            context.insert("errors", &errors);
            return render(&state, &req, "workshop.html", context);
        }
    };

    let (_, created) = state.db.get_or_create_attendance(workshop.id, &email)?;
    let message = if created {
        log::info!("RSVP {} for {}", email, workshop.slug);
        "See you there!"
    } else {
        "Already RSVPed. Reminder sent!"
    };

    notify_rsvp(state.mailer.as_ref(), &state.config, &workshop, &email).await?;

    Ok(flash::redirect(&req, &workshop.path(), vec![FlashMessage::success(message)]))
}

/// Calendar file download; drafts have no date and so no calendar
async fn workshop_ics(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let workshop = find_workshop(&state, &path)?;
    let content = ics::workshop_ics(&state.config, &workshop).ok_or(AppError::NotFound)?;

    Ok(HttpResponse::Ok()
        .content_type("application/octet-stream")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", ics::ics_filename(&state.config, &workshop)),
        ))
        .body(content))
}

fn announce_context(state: &AppState, workshop: &Workshop) -> AppResult<Context> {
    let mut context = Context::new();
    context.insert("workshop", workshop);
    context.insert("dry_run_email", &state.config.email.broadcast_preview);
    context.insert("subscriptions_count", &state.db.count_subscriptions()?);
    context.insert("subscriptions_list", &state.db.list_subscriptions()?);
    Ok(context)
}

async fn announce(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    let workshop = find_workshop(&state, &path)?;

    let initial = AnnounceForm {
        subject: format!("{} // {}", workshop.title, state.config.project_name),
        body: workshop.body.clone(),
        dry_run: None,
    };

    let mut context = announce_context(&state, &workshop)?;
    context.insert("form", &initial);
    context.insert("errors", &FormErrors::new());
    render(&state, &req, "announce.html", context)
}

async fn announce_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    form: web::Form<AnnounceForm>,
) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    let workshop = find_workshop(&state, &path)?;

    let broadcast = match form.clean(&workshop.slug) {
        Ok(broadcast) => broadcast,
        Err(errors) => {
            let mut context = announce_context(&state, &workshop)?;
            context.insert("form", &form.into_inner());
            context.insert("errors", &errors);
            return render(&state, &req, "announce.html", context);
        }
    };

    let sent = send_broadcast(&state.db, state.mailer.as_ref(), &state.config, &broadcast).await?;

    Ok(flash::redirect(
        &req,
        &format!("{}announce/", workshop.path()),
        vec![FlashMessage::success(format!("{} emails sent.", sent))],
    ))
}

#[cfg(test)]
mod tests {
    use crate::mail::MailChannel;
    use crate::models::WorkshopInput;
    use crate::test_support::{TestApp, body_text, flash_messages, location};
    use actix_web::{http::StatusCode, http::header, test};
    use chrono::NaiveDateTime;

    fn add_workshop(app: &TestApp, slug: &str, scheduled_at: Option<&str>) {
        app.db()
            .create_workshop(&WorkshopInput {
                title: slug.to_uppercase(),
                slug: slug.to_string(),
                body: "Bring a laptop.".to_string(),
                scheduled_at: scheduled_at
                    .map(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()),
                location_name: "Newspeak House".to_string(),
                location_address: "133 Bethnal Green Rd, London".to_string(),
                location_url: "https://newspeak.house/".to_string(),
                is_confirmed: true,
            })
            .unwrap();
    }

    #[actix_web::test]
    async fn test_workshop_detail() {
        let app = TestApp::new();
        add_workshop(&app, "django", Some("2020-02-18 18:30"));
        let service = test::init_service(app.app()).await;

        let resp = test::call_service(
            &service,
            test::TestRequest::get().uri("/workshops/django/").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("DJANGO"));

        let resp = test::call_service(
            &service,
            test::TestRequest::get().uri("/workshops/missing/").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_events_page_and_feed() {
        let app = TestApp::new();
        add_workshop(&app, "django", Some("2020-02-18 18:30"));
        add_workshop(&app, "draft", None);
        let service = test::init_service(app.app()).await;

        let resp = test::call_service(&service, test::TestRequest::get().uri("/events/").to_request()).await;
        let body = body_text(resp).await;
        assert!(body.contains("DJANGO"));
        assert!(body.contains("DRAFT"));

        let resp = test::call_service(&service, test::TestRequest::get().uri("/events/ics/").to_request()).await;
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/calendar; charset=utf-8"
        );
        let body = body_text(resp).await;
        assert_eq!(body.matches("BEGIN:VEVENT").count(), 1);
    }

    #[actix_web::test]
    async fn test_ics_download() {
        let app = TestApp::new();
        add_workshop(&app, "django", Some("2022-04-02 18:30"));
        add_workshop(&app, "draft", None);
        let service = test::init_service(app.app()).await;

        let resp = test::call_service(
            &service,
            test::TestRequest::get().uri("/workshops/django/ics/").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=chaitin-school-django.ics"
        );
        assert!(body_text(resp).await.contains("DTSTART;TZID=Europe/London:20220402T183000"));

        let resp = test::call_service(
            &service,
            test::TestRequest::get().uri("/workshops/draft/ics/").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_rsvp_then_reminder() {
        let app = TestApp::new();
        add_workshop(&app, "django", Some("2022-04-02 18:30"));
        let service = test::init_service(app.app()).await;

        let post = || {
            test::TestRequest::post()
                .uri("/workshops/django/")
                .set_form([("email", "attendee@example.com")])
                .to_request()
        };

        let resp = test::call_service(&service, post()).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/workshops/django/");
        assert_eq!(flash_messages(&resp), vec!["See you there!"]);

        let outbox = app.mailer.outbox_for(MailChannel::Transactional);
        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox[0].subject, "See you at: DJANGO");
        assert_eq!(outbox[0].to, vec!["attendee@example.com"]);
        assert_eq!(outbox[0].attachments.len(), 1);
        assert_eq!(outbox[1].subject, "[chaitin] RSVP <attendee@example.com> for DJANGO");

        let resp = test::call_service(&service, post()).await;
        assert_eq!(flash_messages(&resp), vec!["Already RSVPed. Reminder sent!"]);
        assert_eq!(app.mailer.outbox().len(), 4);

        let workshop = app.db().get_workshop_by_slug("django").unwrap().unwrap();
        assert_eq!(app.db().count_attendances(workshop.id).unwrap(), 1);
    }

    #[actix_web::test]
    async fn test_rsvp_invalid_email() {
        let app = TestApp::new();
        add_workshop(&app, "django", Some("2022-04-02 18:30"));
        let service = test::init_service(app.app()).await;

        let req = test::TestRequest::post()
            .uri("/workshops/django/")
            .set_form([("email", "nope")])
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Enter a valid email address."));
        assert!(app.mailer.outbox().is_empty());
    }

    #[actix_web::test]
    async fn test_announce_requires_superuser() {
        let app = TestApp::new();
        add_workshop(&app, "django", Some("2022-04-02 18:30"));
        let member = app.create_user("member", false);
        let service = test::init_service(app.app()).await;

        let resp = test::call_service(
            &service,
            test::TestRequest::get().uri("/workshops/django/announce/").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/workshops/django/announce/")
            .cookie(app.login(&member))
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_announce() {
        let app = TestApp::new();
        add_workshop(&app, "django", Some("2022-04-02 18:30"));
        app.db().create_subscription("one@example.com").unwrap();
        app.db().create_subscription("two@example.com").unwrap();
        let admin = app.create_user("admin", true);
        let cookie = app.login(&admin);
        let service = test::init_service(app.app()).await;

        let req = test::TestRequest::get()
            .uri("/workshops/django/announce/")
            .cookie(cookie.clone())
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        // Tera escapes the slashes in attribute values
        assert!(body_text(resp).await.contains("DJANGO &#x2F;&#x2F; Chaitin School"));

        let req = test::TestRequest::post()
            .uri("/workshops/django/announce/")
            .cookie(cookie)
            .set_form([("subject", "DJANGO // Chaitin School"), ("body", "Come along")])
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/workshops/django/announce/");
        assert_eq!(flash_messages(&resp), vec!["2 emails sent."]);

        let outbox = app.mailer.outbox_for(MailChannel::Broadcast);
        assert_eq!(outbox.len(), 2);
        assert!(outbox.iter().all(|m| m.attachments.len() == 1));
    }
}
