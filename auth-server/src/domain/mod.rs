//! # Domain Layer
//!
//! Core entities and domain events for the authentication/authorization
//! server. This layer is **framework-agnostic**: nothing here depends on
//! actix-web, sqlx's runtime, or the storage adapter's query DSL — entities
//! are shapes, [`storage::Adapter`](crate::storage::Adapter) is what moves
//! them in and out of Postgres.
//!
//! ## Module Structure
//!
//! | Module     | Purpose                                                |
//! |------------|---------------------------------------------------------|
//! | `entities` | User/Account/Session/OAuth\*/MFA entities (§3)          |
//! | `events`   | Domain events for audit logging and notification hooks |
//!
//! ## Design Decisions
//!
//! 1. **Entities vs DTOs**: entities carry every persisted field; the API
//!    layer's `dto` module handles what actually crosses the wire.
//! 2. **`FromRow` derive**: entities use sqlx's `FromRow` for row mapping.
//! 3. **Hashed opaque values**: sessions, OAuth tokens, device/CIBA codes
//!    never persist their raw value, only its SHA-256 hash.

pub mod entities;
pub mod events;

pub use entities::*;
