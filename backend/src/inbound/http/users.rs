//! Account API handlers.
//!
//! ```text
//! POST /api/v1/users/create-account {"name":"Ada","email":"ada@example.com","password":"..."}
//! POST /api/v1/users/login {"email":"ada@example.com","password":"..."}
//! POST /api/v1/users/logout
//! GET /api/v1/users/me
//! PUT /api/v1/users {"name":"Ada Lovelace"}
//! ```

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, get, post, put, web};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{LoginCredentials, Registration, UserName};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{AuthenticatedUser, removal_cookie, token_cookie};
use crate::inbound::http::envelope::{respond, respond_with};
use crate::inbound::http::schemas::{
    EmptyEnvelopeSchema, ErrorSchema, TokenEnvelopeSchema, UserEnvelopeSchema,
};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{map_credential_error, map_user_error};

/// Registration request body for `POST /api/v1/users/create-account`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(default)]
pub struct CreateAccountRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request body for `POST /api/v1/users/login`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Profile update body for `PUT /api/v1/users`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub name: String,
}

#[derive(Serialize)]
struct LoginResponse<'a> {
    token: &'a str,
}

/// Create an account.
#[utoipa::path(
    post,
    path = "/api/v1/users/create-account",
    request_body = CreateAccountRequest,
    responses(
        (status = 200, description = "Account created", body = UserEnvelopeSchema),
        (status = 400, description = "Invalid request or email already taken", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "createAccount",
    security([])
)]
#[post("/users/create-account")]
pub async fn create_account(
    state: web::Data<HttpState>,
    payload: web::Json<CreateAccountRequest>,
) -> ApiResult<HttpResponse> {
    let CreateAccountRequest {
        name,
        email,
        password,
    } = payload.into_inner();
    let registration =
        Registration::try_from_parts(&name, &email, &password).map_err(map_credential_error)?;
    let user = state.accounts.register(registration).await?;
    info!(user_id = %user.id(), "account created");
    Ok(respond(StatusCode::OK, "Account created", user))
}

/// Check credentials and issue a bearer token.
///
/// The token is returned in the body and set as the `token` cookie.
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenEnvelopeSchema,
            headers(("Set-Cookie" = String, description = "HTTP-only `token` cookie"))),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Invalid credentials", body = ErrorSchema),
        (status = 404, description = "Unknown email", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "login",
    security([])
)]
#[post("/users/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let credentials = LoginCredentials::try_from_parts(&payload.email, &payload.password)
        .map_err(map_credential_error)?;
    let issued = state.accounts.login(credentials).await?;

    let mut builder = HttpResponse::Ok();
    builder.cookie(token_cookie(&issued, state.cookies));
    Ok(respond_with(
        builder,
        StatusCode::OK,
        "Logged in",
        Some(LoginResponse {
            token: issued.token.as_str(),
        }),
    ))
}

/// Drop the `token` cookie. The token itself stays valid until it expires.
#[utoipa::path(
    post,
    path = "/api/v1/users/logout",
    responses(
        (status = 200, description = "Logged out", body = EmptyEnvelopeSchema,
            headers(("Set-Cookie" = String, description = "Expired `token` cookie")))
    ),
    tags = ["users"],
    operation_id = "logout",
    security([])
)]
#[post("/users/logout")]
pub async fn logout(state: web::Data<HttpState>) -> HttpResponse {
    let mut builder = HttpResponse::Ok();
    builder.cookie(removal_cookie(state.cookies));
    respond_with(builder, StatusCode::OK, "Logged out", None::<()>)
}

/// Return the authenticated caller.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = UserEnvelopeSchema),
        (status = 401, description = "Not logged in", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "currentUser"
)]
#[get("/users/me")]
pub async fn current_user(user: AuthenticatedUser) -> HttpResponse {
    respond(StatusCode::OK, "User retrieved", user.into_inner())
}

/// Rename the authenticated caller.
#[utoipa::path(
    put,
    path = "/api/v1/users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user details", body = UserEnvelopeSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Not logged in", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "updateUser"
)]
#[put("/users")]
pub async fn update_user(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<UpdateUserRequest>,
) -> ApiResult<HttpResponse> {
    let name = UserName::new(&payload.name).map_err(map_user_error)?;
    let updated = state.accounts.update_profile(user.user(), name).await?;
    Ok(respond(StatusCode::OK, "Updated user details", updated))
}
