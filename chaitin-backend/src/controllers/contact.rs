//! Contact forms: each stores its record, tells the admins and thanks the visitor

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use tera::Context;

use crate::AppState;
use crate::errors::AppResult;
use crate::forms::{FeedbackForm, FormErrors, IncidentForm, ProposalForm, RequestForm, SubmissionForm};
use crate::mail::mail_admins;
use crate::middleware::flash::{self, FlashMessage};
use crate::templates::render;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/feedback/")
            .route(web::get().to(feedback))
            .route(web::post().to(feedback_post)),
    );
    cfg.service(
        web::resource("/submit/")
            .route(web::get().to(submit))
            .route(web::post().to(submit_post)),
    );
    cfg.service(
        web::resource("/proposal/")
            .route(web::get().to(proposal))
            .route(web::post().to(proposal_post)),
    );
    cfg.service(
        web::resource("/request/")
            .route(web::get().to(request))
            .route(web::post().to(request_post)),
    );
    cfg.service(
        web::resource("/code-of-conduct/report/")
            .route(web::get().to(incident))
            .route(web::post().to(incident_post)),
    );
}

fn form_page<F: Serialize>(
    state: &AppState,
    req: &HttpRequest,
    template: &str,
    form: &F,
    errors: &FormErrors,
) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, req, template, context)
}

fn thanks(req: &HttpRequest, message: &str) -> HttpResponse {
    flash::redirect(req, "/", vec![FlashMessage::success(message)])
}

async fn feedback(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    form_page(&state, &req, "feedback.html", &FeedbackForm::default(), &FormErrors::new())
}

async fn feedback_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<FeedbackForm>,
) -> AppResult<HttpResponse> {
    let comment = match form.clean() {
        Ok(comment) => comment,
        Err(errors) => return form_page(&state, &req, "feedback.html", &form.into_inner(), &errors),
    };

    let feedback = state.db.create_feedback(&comment)?;
    mail_admins(
        state.mailer.as_ref(),
        &state.config,
        &format!("New feedback: {}", feedback.id),
        &format!("**Comment**\n\n{}", feedback.comment),
    )
    .await?;

    Ok(thanks(&req, "Thank you 🙏"))
}

async fn submit(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    form_page(&state, &req, "submit.html", &SubmissionForm::default(), &FormErrors::new())
}

async fn submit_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<SubmissionForm>,
) -> AppResult<HttpResponse> {
    let new = match form.clean() {
        Ok(new) => new,
        Err(errors) => return form_page(&state, &req, "submit.html", &form.into_inner(), &errors),
    };

    let submission = state.db.create_submission(&new)?;
    let body = format!(
        "**Submitter**\n\n{} <{}>\n\n**Links**\n\n{}\n\n**Title**\n\n{}\n\n**Topic**\n\n{}\n\n\
         **Audience**\n\n{}\n\n**Outcome**\n\n{}\n\n**When**\n\n{}",
        submission.submitter,
        submission.email,
        submission.links,
        submission.title,
        submission.topic,
        submission.audience,
        submission.outcome,
        submission.when,
    );
    mail_admins(
        state.mailer.as_ref(),
        &state.config,
        &format!("New submission: {} <{}>", submission.submitter, submission.email),
        &body,
    )
    .await?;

    Ok(thanks(&req, "Thank you! We’ll be in touch :)"))
}

async fn proposal(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    form_page(&state, &req, "proposal.html", &ProposalForm::default(), &FormErrors::new())
}

async fn proposal_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<ProposalForm>,
) -> AppResult<HttpResponse> {
    let (email, topic) = match form.clean() {
        Ok(fields) => fields,
        Err(errors) => return form_page(&state, &req, "proposal.html", &form.into_inner(), &errors),
    };

    let proposal = state.db.create_proposal(&email, &topic)?;
    mail_admins(
        state.mailer.as_ref(),
        &state.config,
        &format!("New proposal: {}", proposal.email),
        &format!("**Email**\n\n{}\n\n**Topic**\n\n{}", proposal.email, proposal.topic),
    )
    .await?;

    Ok(thanks(&req, "Thanks—we might be in touch."))
}

async fn request(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    form_page(&state, &req, "request.html", &RequestForm::default(), &FormErrors::new())
}

async fn request_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<RequestForm>,
) -> AppResult<HttpResponse> {
    let (email, topic) = match form.clean() {
        Ok(fields) => fields,
        Err(errors) => return form_page(&state, &req, "request.html", &form.into_inner(), &errors),
    };

    let request = state.db.create_request(email.as_deref(), &topic)?;
    let from = request.email.as_deref().unwrap_or("anonymous");
    mail_admins(
        state.mailer.as_ref(),
        &state.config,
        &format!("New request: {}", from),
        &format!("**Email**\n\n{}\n\n**Topic**\n\n{}", from, request.topic),
    )
    .await?;

    Ok(thanks(&req, "Thanks—we might be in touch."))
}

async fn incident(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    form_page(&state, &req, "incident.html", &IncidentForm::default(), &FormErrors::new())
}

async fn incident_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<IncidentForm>,
) -> AppResult<HttpResponse> {
    let new = match form.clean() {
        Ok(new) => new,
        Err(errors) => return form_page(&state, &req, "incident.html", &form.into_inner(), &errors),
    };

    let incident = state.db.create_incident(&new)?;
    let or_blank = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    mail_admins(
        state.mailer.as_ref(),
        &state.config,
        &format!("New incident report: {}", incident.id),
        &format!(
            "**Name**\n\n{}\n\n**Email**\n\n{}\n\n**When**\n\n{}\n\n**Description**\n\n{}",
            or_blank(&incident.name),
            or_blank(&incident.email),
            or_blank(&incident.occurred_at),
            incident.description,
        ),
    )
    .await?;

    Ok(thanks(&req, "Thank you for reporting. We will follow up."))
}
