// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Middleware: None. Every input is validated here since there is no trusted caller.

pub mod auth;
