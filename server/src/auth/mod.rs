//! Authentication for stage endpoints.

mod middleware;

pub use middleware::AuthUser;
