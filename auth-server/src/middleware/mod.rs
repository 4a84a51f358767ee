//! # Cross-Cutting Request Checks
//!
//! Component 4.F's trusted-origin, CSRF, and rate-limit checks, kept as
//! plain functions/structs a handler calls explicitly rather than
//! `actix_web::dev::Transform` services — the same shape the source repo's
//! own `AuthMiddleware::authenticate` used (called directly from a wrapping
//! service function, not wired as a generic `Transform`), since every check
//! here needs the full [`AuthContext`] rather than just a `ServiceRequest`.

pub mod csrf;
pub mod origin;
pub mod rate_limit;
