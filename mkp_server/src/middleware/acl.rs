//! Access control list middleware for the marketplace server.
//! This middleware can be placed on any route or service that sits behind the
//! [`JwtMiddlewareFactory`](crate::middleware::JwtMiddlewareFactory).
//!
//! It checks the verified claims of the caller against the roles the route accepts. If the caller holds at least one of
//! them, the request is allowed to continue. Otherwise, a 403 Forbidden response is returned. Finer grained ownership
//! checks (is this *your* order?) are left to the handlers.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;
use mkp_engine::db_types::Role;

use crate::{
    auth::JwtClaims,
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    allowed_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(allowed_roles: &[Role]) -> Self {
        AclMiddlewareFactory { allowed_roles: allowed_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { allowed_roles: self.allowed_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    allowed_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
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
        let allowed_roles = self.allowed_roles.clone();
        Box::pin(async move {
            let jwt_claims = req.extensions().get::<JwtClaims>().cloned().ok_or_else(|| {
                warn!("💻️ No JWT claims found in request extensions");
                ServerError::AuthenticationError(AuthError::MissingToken)
            })?;
            if allowed_roles.is_empty() || allowed_roles.iter().any(|role| jwt_claims.roles.contains(role)) {
                service.call(req).await
            } else {
                debug!("💻️ User {} was denied access to {}", jwt_claims.sub, req.path());
                Err(ServerError::AuthenticationError(AuthError::InsufficientPermissions(
                    "Insufficient permissions.".into(),
                ))
                .into())
            }
        })
    }
}

