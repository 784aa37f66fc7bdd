//! Bearer token middleware.
//!
//! Reads the access token from the `Authorization: Bearer <token>` header, or failing that, from the
//! [`ACCESS_TOKEN_HEADER`] header. A valid token's [`JwtClaims`] are stored in the request extensions. Requests without
//! a token, or with an invalid one, are rejected with 401 Unauthorized.
use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::{
    auth::{JwtClaims, TokenVerifier},
    errors::{AuthError, ServerError},
};

pub const ACCESS_TOKEN_HEADER: &str = "mkp_access_token";

pub struct JwtMiddlewareFactory {
    verifier: TokenVerifier,
}

impl JwtMiddlewareFactory {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(JwtMiddlewareService { verifier: self.verifier.clone(), service: Rc::new(service) })
    }
}

pub struct JwtMiddlewareService<S> {
    verifier: TokenVerifier,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let claims = extract_token(&req).and_then(|token| self.verifier.verify(&token));
        Box::pin(async move {
            let claims = claims.map_err(ServerError::AuthenticationError)?;
            trace!("💻️ Authenticated user {} with roles {:?}", claims.sub, claims.roles);
            req.extensions_mut().insert::<JwtClaims>(claims);
            service.call(req).await
        })
    }
}

fn extract_token(req: &ServiceRequest) -> Result<String, AuthError> {
    let headers = req.headers();
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        return match value.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(AuthError::PoorlyFormattedToken("Expected a Bearer token".into())),
        };
    }
    match headers.get(ACCESS_TOKEN_HEADER) {
        Some(value) => {
            value.to_str().map(|s| s.trim().to_string()).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))
        },
        None => Err(AuthError::MissingToken),
    }
}
