//! # Auth Server - Shared Ambient Stack
//!
//! Cross-cutting functionality used by the `auth-server` library crate:
//! configuration, error types, the database/Redis connection layers, tracing
//! setup, request validation, and the cryptographic and cookie primitives
//! that back signed sessions, encrypted MFA secrets, and OAuth tokens.
//!
//! ## Modules
//!
//! | Module | Purpose | Key Types |
//! |--------|---------|-----------|
//! | [`config`] | Environment-based configuration | [`AppConfig`], [`AuthConfig`] |
//! | [`errors`] | Standardized error handling | [`ApiError`], [`ApiResult`] |
//! | [`crypto`] | HMAC, AEAD, argon2id, PKCE | component 4.A |
//! | [`cookies`] | Signed/encrypted cookie factory | component 4.B |
//! | [`database`] | PostgreSQL connection pool | [`create_pool`](database::create_pool) |
//! | [`redis_client`] | Redis, backing `secondaryStorage` + rate limiting | [`RedisClient`] |
//! | [`tracing_config`] | Structured logging setup | [`init_tracing`](tracing_config::init_tracing) |
//! | [`validation`] | Request validation helpers | Custom validators |

pub mod config;
pub mod cookies;
pub mod crypto;
pub mod database;
pub mod errors;
pub mod redis_client;
pub mod tracing_config;
pub mod validation;

pub use config::AppConfig;
pub use errors::{ApiError, ApiResult};
