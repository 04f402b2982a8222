use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::http::header::RETRY_AFTER;
use warp::{Rejection, Reply, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let code = if let Some(code) = err.find::<ApiErrorCode>() {
        code.clone()
    } else if err.is_not_found() {
        ApiErrorCode::NotFound
    } else if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        ApiErrorCode::Validation(e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ApiErrorCode::NotFound
    } else {
        warn!("Unhandled rejection: {:?}", err);
        ApiErrorCode::Internal
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(&code));
    let mut response = warp::reply::with_status(json, code.status()).into_response();
    if let Some(secs) = code.retry_after_secs() {
        response
            .headers_mut()
            .insert(RETRY_AFTER, warp::http::HeaderValue::from(secs));
    }
    Ok(response)
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

#[derive(Debug, Clone, Error)]
pub enum ApiErrorCode {
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Not found")]
    NotFound,
    #[error("Username or email already registered")]
    AlreadyRegistered,
    #[error("{0}")]
    Validation(String),
    #[error("Rate limit exceeded, retry in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },
    #[error("Internal error")]
    Internal,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::Internal
    }

    pub fn name(&self) -> &'static str {
        match self {
            ApiErrorCode::InvalidCredentials => "invalid_credentials",
            ApiErrorCode::InvalidToken => "invalid_token",
            ApiErrorCode::TokenExpired => "token_expired",
            ApiErrorCode::NotFound => "not_found",
            ApiErrorCode::AlreadyRegistered => "already_registered",
            ApiErrorCode::Validation(_) => "validation",
            ApiErrorCode::RateLimited { .. } => "rate_limit_exceeded",
            ApiErrorCode::Internal => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::AlreadyRegistered => StatusCode::CONFLICT,
            ApiErrorCode::Validation(_) => StatusCode::BAD_REQUEST,
            ApiErrorCode::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            ApiErrorCode::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::UserExists => ApiErrorCode::AlreadyRegistered,
            AuthError::NotFound => ApiErrorCode::NotFound,
            AuthError::TokenInvalid => ApiErrorCode::InvalidToken,
            AuthError::TokenExpired => ApiErrorCode::TokenExpired,
            AuthError::WeakPassword(reason) => {
                ApiErrorCode::Validation(format!("weak password: {reason}"))
            }
            AuthError::InvalidEmail => {
                ApiErrorCode::Validation("invalid email format".to_string())
            }
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::Internal(e) => ApiErrorCode::internal(e),
        }
    }
}
