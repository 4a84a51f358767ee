//! # Auth Server
//!
//! Library crate backing the `auth` binary: an embeddable OAuth 2.1 / OpenID
//! Connect authorization server and session/credential engine, structured as
//! a plugin-extensible pipeline in the same spirit as the source repo's
//! layered `domain` → `repository`/`storage` → `service` → `api` split.
//!
//! ## Modules
//!
//! | Module | Component |
//! |--------|-----------|
//! | [`domain`] | Entities and domain events |
//! | [`storage`] | Generic storage adapter + named internal operations (4.C) |
//! | [`context`] | `AuthContext`/`AuthOptions`/plugin registry (4.D) |
//! | [`pipeline`] | Request pipeline and hook dispatch (4.E) |
//! | [`session`] | Session engine (4.F) |
//! | [`credential`] | Password/TOTP/email-OTP/trusted-device verification (4.G) |
//! | [`oauth`] | Authorize/token/introspect/userinfo/register/metadata (4.H, 4.I) |
//! | [`middleware`] | Origin/CSRF/rate-limit middleware (4.J) |
//! | [`api`] | HTTP DTOs, handlers, and route wiring |

use shared::ApiError;

pub mod api;
pub mod context;
pub mod credential;
pub mod domain;
pub mod middleware;
pub mod oauth;
pub mod pipeline;
pub mod session;
pub mod storage;

/// Result alias used throughout the auth-server crate, mirroring `shared`'s
/// `ApiResult` under the name the contract itself uses.
pub type AuthResult<T> = Result<T, ApiError>;
