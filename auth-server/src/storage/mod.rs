//! # Storage Layer
//!
//! Component 4.C. [`adapter`] defines the generic, model-agnostic CRUD
//! surface every backend implements; [`postgres`] is the production
//! implementation over `sqlx::PgPool`; [`internal`] wraps either behind the
//! named, typed operations the rest of the crate actually calls.

pub mod adapter;
pub mod internal;
pub mod postgres;

pub use adapter::{Adapter, Connector, FindManyQuery, Model, Operator, SortDirection, WhereClause};
pub use internal::InternalAdapter;
pub use postgres::PostgresAdapter;
