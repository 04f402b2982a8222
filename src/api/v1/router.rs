use super::error::*;
use super::handler;
use super::identity;
use crate::application_port::{AuthService, AuthenticatedUser};
use crate::domain_model::EndpointClass;
use crate::ratelimit::{RateLimiter, RateVerdict};
use crate::server::Server;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let health = warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .and_then(handler::health);

    let register = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("register"))
        .and(warp::path::end())
        .and(with_rate_limit(
            server.rate_limiter.clone(),
            EndpointClass::Auth,
        ))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register);

    let login = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(with_rate_limit(
            server.rate_limiter.clone(),
            EndpointClass::Auth,
        ))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(with_rate_limit(
            server.rate_limiter.clone(),
            EndpointClass::Auth,
        ))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    // Logout tolerates an absent body; a bare POST still clears the session.
    let logout_body = warp::body::json::<handler::LogoutRequest>()
        .or(warp::any().map(handler::LogoutRequest::default))
        .unify();

    let logout = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(with_rate_limit(
            server.rate_limiter.clone(),
            EndpointClass::Auth,
        ))
        .and(logout_body)
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let me = warp::get()
        .and(warp::path("auth"))
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(with_rate_limit(
            server.rate_limiter.clone(),
            EndpointClass::General,
        ))
        .and(with_verification(server.auth_service.clone()))
        .and_then(handler::me);

    let revoke = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("revoke"))
        .and(warp::path::end())
        .and(with_rate_limit(
            server.rate_limiter.clone(),
            EndpointClass::Sensitive,
        ))
        .and(warp::body::json())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::revoke);

    health
        .or(register)
        .or(login)
        .or(refresh)
        .or(logout)
        .or(me)
        .or(revoke)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (AuthenticatedUser,), Error = warp::Rejection> + Clone {
    warp::cookie::optional::<String>(identity::ACCESS_TOKEN_COOKIE)
        .and(warp::header::optional::<String>(
            http::header::AUTHORIZATION.as_ref(),
        ))
        .and_then(
            move |cookie: Option<String>, authorization: Option<String>| {
                let auth_service = auth_service.clone();
                async move {
                    let token = identity::bearer_token(cookie, authorization)
                        .ok_or_else(|| reject::custom(ApiErrorCode::InvalidToken))?;
                    auth_service
                        .verify_access(&token)
                        .await
                        .map_err(ApiErrorCode::from)
                        .map_err(reject::custom)
                }
            },
        )
}

fn with_rate_limit(
    rate_limiter: Arc<RateLimiter>,
    class: EndpointClass,
) -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    warp::addr::remote()
        .and(warp::cookie::optional::<String>(identity::ACCESS_TOKEN_COOKIE))
        .and(warp::header::optional::<String>(
            http::header::AUTHORIZATION.as_ref(),
        ))
        .and_then(
            move |addr: Option<SocketAddr>,
                  cookie: Option<String>,
                  authorization: Option<String>| {
                let rate_limiter = rate_limiter.clone();
                async move {
                    let bearer = identity::bearer_token(cookie, authorization);
                    let key = identity::client_key(addr, bearer.as_deref());
                    match rate_limiter.check_and_consume(&key, class) {
                        RateVerdict::Allowed { .. } => Ok(()),
                        RateVerdict::Denied { retry_after_secs } => {
                            debug!(%key, %class, retry_after_secs, "rate limit exceeded");
                            Err(reject::custom(ApiErrorCode::RateLimited {
                                retry_after_secs,
                            }))
                        }
                    }
                }
            },
        )
        .untuple_one()
}
