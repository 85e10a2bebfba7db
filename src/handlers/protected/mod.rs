// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Security Level: jwt_auth_middleware must have injected an AuthUser.
// Every handler passes that username explicitly into the service it calls;
// ownership is decided by the services, never by the handler.

pub mod auth;
pub mod files;
pub mod notes;
