use std::env;
use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http, web, Error, HttpMessage, HttpRequest, HttpResponse,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use futures_util::future::{ok, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::user::{Role, UserAccount};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub cid: i64,
    pub exp: usize,
}

/// Authenticated caller, decoded from the bearer token by the
/// [`Authentication`] middleware and stashed in request extensions.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: Role,
    pub company_id: i64,
}

pub fn create_jwt(
    user_id: i64,
    role: Role,
    company_id: i64,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = Utc::now() + Duration::hours(24);
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        cid: company_id,
        exp: expiration.timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
}

pub fn verify_token(token: &str, secret: &str) -> Result<AuthUser, String> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| format!("Token decode error: {}", e))?;

    let user_id = token_data
        .claims
        .sub
        .parse::<i64>()
        .map_err(|_| "Token subject is not a user id".to_string())?;

    Ok(AuthUser {
        user_id,
        role: token_data.claims.role,
        company_id: token_data.claims.cid,
    })
}

/// Bearer-token middleware. A valid token puts an [`AuthUser`] into the
/// request extensions; an invalid one short-circuits with 401; a missing
/// header passes through and handlers reject via [`current_user`].
#[derive(Debug)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware { service })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
            if let Ok(auth_str) = auth_header.to_str() {
                if let Some(token) = auth_str.strip_prefix("Bearer ") {
                    let secret =
                        env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string());
                    match verify_token(token.trim(), &secret) {
                        Ok(user) => {
                            req.extensions_mut().insert(user);
                        }
                        Err(e) => {
                            log::warn!("rejected bearer token: {}", e);
                            let (req_parts, _payload) = req.into_parts();
                            let resp = HttpResponse::Unauthorized()
                                .json(serde_json::json!({ "message": "Invalid token" }))
                                .map_into_boxed_body();
                            let srv_resp = ServiceResponse::new(req_parts, resp);
                            return Box::pin(async move { Ok(srv_resp) });
                        }
                    }
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

pub fn current_user(req: &HttpRequest) -> AppResult<AuthUser> {
    req.extensions()
        .get::<AuthUser>()
        .copied()
        .ok_or(AppError::Unauthorized)
}

/// Per-route actions, checked against the role table below. Kept in one
/// place so route gating is never re-implemented per handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewTasks,
    EditTasks,
    ManageTasks,
    ViewProjects,
    ManageProjects,
    ViewUsers,
}

pub fn role_allows(role: Role, capability: Capability) -> bool {
    match role {
        Role::Admin | Role::Manager => true,
        Role::Employee => matches!(
            capability,
            Capability::ViewTasks
                | Capability::EditTasks
                | Capability::ViewProjects
                | Capability::ViewUsers
        ),
    }
}

pub fn require(user: &AuthUser, capability: Capability) -> AppResult<()> {
    if role_allows(user.role, capability) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub company_id: i64,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/signup
pub async fn signup(
    data: web::Data<AppState>,
    signup_info: web::Json<SignupRequest>,
) -> AppResult<HttpResponse> {
    if !email_regex().is_match(&signup_info.email) {
        return Err(AppError::Validation("invalid email address".to_string()));
    }

    let taken = sqlx::query_scalar::<_, i64>("SELECT user_id FROM users WHERE email = ?")
        .bind(&signup_info.email)
        .fetch_optional(&data.db)
        .await?;
    if taken.is_some() {
        return Err(AppError::Validation("email already registered".to_string()));
    }

    let hashed_password = hash(&signup_info.password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hash failed: {}", e)))?;
    let role = signup_info.role.unwrap_or(Role::Employee);

    let result = sqlx::query(
        "INSERT INTO users (company_id, first_name, last_name, email, password_hash, role) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(signup_info.company_id)
    .bind(&signup_info.first_name)
    .bind(&signup_info.last_name)
    .bind(&signup_info.email)
    .bind(&hashed_password)
    .bind(role)
    .execute(&data.db)
    .await?;
    let user_id = result.last_insert_rowid();

    info!("user {} signed up for company {}", user_id, signup_info.company_id);
    Ok(HttpResponse::Created().json(serde_json::json!({
        "status": "User created",
        "userId": user_id,
    })))
}

/// POST /auth/login
pub async fn login(
    data: web::Data<AppState>,
    login_info: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let account = sqlx::query_as::<_, UserAccount>(
        "SELECT user_id, company_id, first_name, last_name, email, password_hash, role \
         FROM users WHERE email = ?",
    )
    .bind(&login_info.email)
    .fetch_optional(&data.db)
    .await?;

    let account = match account {
        Some(a) => a,
        None => return Err(AppError::Unauthorized),
    };

    if !verify(&login_info.password, &account.password_hash).unwrap_or(false) {
        return Err(AppError::Unauthorized);
    }

    let token = create_jwt(
        account.user_id,
        account.role,
        account.company_id,
        &data.config.jwt_secret,
    )
    .map_err(|e| AppError::Internal(format!("token encode failed: {}", e)))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "token": token,
        "userId": account.user_id,
        "companyId": account.company_id,
        "firstName": account.first_name,
        "lastName": account.last_name,
        "role": account.role,
    })))
}
