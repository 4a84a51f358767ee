//! # HTTP Surface
//!
//! Component 4.E/4.H/4.I wired onto `actix-web`: [`AppState`] is the shared
//! process state every handler reads from (the assembled [`AuthContext`]
//! plus the pieces that don't belong inside it — the session engine, the
//! in-memory rate limiter, and the CIBA notifier), [`handlers`] holds the
//! route bodies, and [`routes::configure`] wires them onto an
//! `actix_web::web::ServiceConfig`.

pub mod dto;
pub mod handlers;
pub mod routes;

use std::sync::Arc;

use crate::context::AuthContext;
use crate::middleware::rate_limit::RateLimiter;
use crate::oauth::grants::ciba::Notifier;
use crate::session::SessionService;

/// Shared application state, cloned (cheaply — every field is an `Arc` or
/// itself cheap to clone) into each `actix-web` worker.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthContext>,
    pub sessions: SessionService,
    pub rate_limiter: RateLimiter,
    pub ciba_notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(auth: Arc<AuthContext>, sessions: SessionService, ciba_notifier: Arc<dyn Notifier>) -> Self {
        Self { auth, sessions, rate_limiter: RateLimiter::new(), ciba_notifier }
    }
}
