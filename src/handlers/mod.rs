// handlers/mod.rs - Two-tier handler architecture
//
// Public (no auth) → Protected (bearer token required)
pub mod public;    // Tier 1: token acquisition (/api/auth/register, /api/auth/login)
pub mod protected; // Tier 2: JWT authentication required (/api/*)
