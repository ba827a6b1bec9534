/// Middleware module
///
/// The access-token gate for protected routes.

mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;
