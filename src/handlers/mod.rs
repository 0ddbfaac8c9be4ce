// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (JWT + active user check)
pub mod protected; // Tier 2: JWT authentication required (/api/*)
pub mod public; // Tier 1: No authentication required (/, /health, /api/auth/login)
