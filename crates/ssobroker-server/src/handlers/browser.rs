//! Browser sign-in routes: the login entry point, the form post and logout.

use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use serde::Deserialize;
use ssobroker_auth::{ExchangeError, UserId};
use url::{Url, form_urlencoded};

use super::error::ApiError;
use crate::state::{AppState, CookieSettings};

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    app: Option<String>,
    redirect: Option<String>,
    err: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    app: Option<String>,
    redirect: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

/// `GET {prefix}/`: hands a fresh code to the application if the browser
/// still holds a session, otherwise asks for a login.
pub async fn index(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(query): Query<IndexQuery>,
) -> Result<Response, ApiError> {
    let (Some(app), Some(redirect)) = (non_empty(query.app), non_empty(query.redirect)) else {
        return Err(ApiError::not_found("app and redirect are required"));
    };
    let failed = query.err.is_some();

    let Some(user_id) = session_user(&jar, &state.cookie) else {
        return Err(ApiError::LoginRequired { failed });
    };

    match state.exchanger.resume(&app, user_id).await {
        Ok(code) => Ok(redirect_to_app(&redirect, &code)?.into_response()),
        Err(err) if err.is_expected() => {
            tracing::debug!(user_id, error = %err, "Session cookie no longer valid");
            let jar = jar.remove(removal_cookie(&state.cookie));
            Ok((jar, ApiError::LoginRequired { failed }).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// `POST {prefix}/login`: form sign-in.
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let jar = jar.remove(removal_cookie(&state.cookie));

    let (Some(app), Some(redirect), Some(username), Some(password)) = (
        non_empty(form.app),
        non_empty(form.redirect),
        non_empty(form.username),
        non_empty(form.password),
    ) else {
        return Err(ApiError::bad_request(
            "app, redirect, username and password are required",
        ));
    };
    // Reject an unusable redirect before a code is spent on it.
    let target = Url::parse(&redirect).map_err(|e| ApiError::bad_request(e.to_string()))?;

    match state.exchanger.login(&app, &username, &password).await {
        Ok(login) => {
            let jar = jar.add(session_cookie(&state.cookie, login.user_id));
            Ok((jar, Redirect::to(&with_code(target, &login.code))).into_response())
        }
        Err(ExchangeError::CredentialsInvalid) => {
            let retry = retry_url(&state.url_prefix, &app, &redirect);
            Ok((jar, Redirect::to(&retry)).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// `GET {prefix}/logout`: ends the browser session everywhere.
pub async fn logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Response, ApiError> {
    if let Some(user_id) = session_user(&jar, &state.cookie) {
        state.exchanger.logout(user_id).await?;
    }
    let jar = jar.remove(removal_cookie(&state.cookie));
    Ok((jar, Redirect::to(&format!("{}/", state.url_prefix))).into_response())
}

/// Builds the redirect back to the application, carrying `code`.
pub fn redirect_to_app(redirect: &str, code: &str) -> Result<Redirect, ApiError> {
    let target = Url::parse(redirect).map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Redirect::to(&with_code(target, code)))
}

/// Appends `code=<code>` to the query of `target`.
pub fn with_code(mut target: Url, code: &str) -> String {
    target.query_pairs_mut().append_pair("code", code);
    target.into()
}

fn retry_url(prefix: &str, app: &str, redirect: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("app", app)
        .append_pair("redirect", redirect)
        .append_pair("err", "404")
        .finish();
    format!("{prefix}/?{query}")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn session_user(jar: &SignedCookieJar, settings: &CookieSettings) -> Option<UserId> {
    jar.get(&settings.name)
        .and_then(|cookie| cookie.value().parse().ok())
}

fn session_cookie(settings: &CookieSettings, user_id: UserId) -> Cookie<'static> {
    let max_age = time::Duration::try_from(settings.max_age).unwrap_or(time::Duration::DAY);
    Cookie::build((settings.name.clone(), user_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn removal_cookie(settings: &CookieSettings) -> Cookie<'static> {
    Cookie::build((settings.name.clone(), "")).path("/").build()
}
