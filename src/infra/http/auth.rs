use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::{
    application::{
        accounts::AccountError,
        error::HttpError,
        forms::{LoginFormInput, SignupFormInput},
    },
    presentation::views::{
        LayoutChrome, LayoutContext, LoggedOutContext, LoggedOutTemplate, LoginContext,
        LoginTemplate, SignupContext, SignupTemplate, render_not_found_response,
        render_template_response,
    },
};

use super::{
    HttpState, repo_error_to_http,
    session::{SESSION_COOKIE, Viewer, expired_session_cookie, session_cookie},
};

const SOURCE: &str = "infra::http::auth";
const REDIRECT_BASE: &str = "http://yatube.invalid/";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NextQuery {
    next: Option<String>,
}

pub(super) async fn signup_form(State(state): State<HttpState>, viewer: Viewer) -> Response {
    let chrome = state.chrome.load(viewer.user());
    render_signup(chrome, SignupContext::default())
}

pub(super) async fn signup_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    Form(input): Form<SignupFormInput>,
) -> Response {
    let chrome = state.chrome.load(viewer.user());

    match state.accounts.signup(&input).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(AccountError::Invalid(errors)) => render_signup(
            chrome,
            SignupContext {
                first_name: input.first_name,
                last_name: input.last_name,
                username: input.username,
                email: input.email,
                errors,
            },
        ),
        Err(err) => account_error_response(err, chrome),
    }
}

pub(super) async fn login_form(
    State(state): State<HttpState>,
    viewer: Viewer,
    Query(query): Query<NextQuery>,
) -> Response {
    let chrome = state.chrome.load(viewer.user());
    render_login(
        chrome,
        LoginContext {
            next: safe_next(query.next.as_deref()).unwrap_or_default(),
            ..LoginContext::default()
        },
    )
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    jar: CookieJar,
    Form(input): Form<LoginFormInput>,
) -> Response {
    let chrome = state.chrome.load(viewer.user());
    let next = safe_next(input.next.as_deref());

    match state.accounts.login(&input).await {
        Ok(issued) => {
            let jar = jar.add(session_cookie(&issued, state.cookies));
            let target = next.unwrap_or_else(|| "/".to_string());
            (jar, Redirect::to(&target)).into_response()
        }
        Err(AccountError::Invalid(errors)) => render_login(
            chrome,
            LoginContext {
                username: input.username,
                next: next.unwrap_or_default(),
                errors,
            },
        ),
        Err(err) => account_error_response(err, chrome),
    }
}

pub(super) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && let Err(err) = state.accounts.logout(cookie.value()).await
    {
        warn!(
            target = "yatube::http::auth",
            error = %err,
            "failed to delete session on logout"
        );
    }

    let jar = jar.add(expired_session_cookie());
    let view = LayoutContext::new(
        state.chrome.load(None).with_title("Logged out"),
        LoggedOutContext,
    );
    (
        jar,
        render_template_response(LoggedOutTemplate { view }, StatusCode::OK),
    )
        .into_response()
}

fn render_signup(chrome: LayoutChrome, content: SignupContext) -> Response {
    let view = LayoutContext::new(chrome.with_title("Sign up"), content);
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

fn render_login(chrome: LayoutChrome, content: LoginContext) -> Response {
    let view = LayoutContext::new(chrome.with_title("Log in"), content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

fn account_error_response(err: AccountError, chrome: LayoutChrome) -> Response {
    match err {
        AccountError::NotFound => render_not_found_response(chrome),
        AccountError::Invalid(errors) => {
            let detail = format!("{} invalid field(s)", errors.fields().count());
            HttpError::new(SOURCE, StatusCode::BAD_REQUEST, "Invalid form", detail)
                .into_response()
        }
        AccountError::Password(err) => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &err,
        )
        .into_response(),
        AccountError::Repo(err) => repo_error_to_http(SOURCE, err).into_response(),
    }
}

/// Keep `next` only when it stays on this site; returns its path and query.
fn safe_next(next: Option<&str>) -> Option<String> {
    let next = next.map(str::trim).filter(|value| value.starts_with('/'))?;
    if next.starts_with("//") || next.contains('\\') {
        return None;
    }

    let base = Url::parse(REDIRECT_BASE).ok()?;
    let resolved = base.join(next).ok()?;
    if resolved.origin() != base.origin() {
        return None;
    }

    let mut target = resolved.path().to_string();
    if let Some(query) = resolved.query() {
        target.push('?');
        target.push_str(query);
    }
    Some(target)
}
