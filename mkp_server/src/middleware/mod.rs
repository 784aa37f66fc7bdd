mod acl;
mod jwt;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use jwt::{JwtMiddlewareFactory, JwtMiddlewareService, ACCESS_TOKEN_HEADER};
