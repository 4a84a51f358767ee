//! # Storage Adapter
//!
//! Component 4.C: the only database-facing interface the rest of the crate
//! is allowed to use. Everything above this module — sessions, credentials,
//! OAuth grants — reads and writes through [`Adapter`], never through a raw
//! `sqlx::query!` call of its own. That mirrors the source repo's own rule
//! ("never string interpolation", `db/migrations` is the only place that
//! knows the schema) pushed one level further: here, no caller above this
//! module knows the schema either, only the model/field names.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::AuthResult;

/// The closed set of persisted models. Adding one here and to
/// `postgres::TABLES` is the only change needed to make a new model
/// reachable through the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    User,
    Account,
    Session,
    Verification,
    TwoFactor,
    TrustedDevice,
    OAuthClient,
    OAuthAccessToken,
    OAuthRefreshToken,
    OAuthConsent,
    DeviceCode,
    CibaRequest,
}

impl Model {
    /// The snake_case table name backing this model in Postgres.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Account => "accounts",
            Self::Session => "sessions",
            Self::Verification => "verifications",
            Self::TwoFactor => "two_factors",
            Self::TrustedDevice => "trusted_devices",
            Self::OAuthClient => "oauth_clients",
            Self::OAuthAccessToken => "oauth_access_tokens",
            Self::OAuthRefreshToken => "oauth_refresh_tokens",
            Self::OAuthConsent => "oauth_consents",
            Self::DeviceCode => "device_codes",
            Self::CibaRequest => "ciba_requests",
        }
    }
}

/// How multiple `WhereClause` entries combine with the ones before them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

/// Comparison applied between a field and its value. Mirrors the operator
/// list in the contract exactly — no subset, no extras.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    StartsWith,
    EndsWith,
    In,
}

/// One condition in a `find`/`update`/`delete` call. `connector` describes
/// how this clause joins with the clause *before* it; the first clause's
/// connector is ignored.
#[derive(Debug, Clone)]
pub struct WhereClause {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
    pub connector: Connector,
}

impl WhereClause {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: Operator::Eq,
            value: value.into(),
            connector: Connector::And,
        }
    }

    pub fn with_operator(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            connector: Connector::And,
        }
    }

    /// Returns `self` joined to the preceding clause with `OR` instead of
    /// the default `AND`.
    pub fn or(mut self) -> Self {
        self.connector = Connector::Or;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Parameters for [`Adapter::find_many`]. `Default::default()` is
/// "everything, unsorted, unpaginated".
#[derive(Debug, Clone, Default)]
pub struct FindManyQuery {
    pub where_: Vec<WhereClause>,
    pub sort_by: Option<(String, SortDirection)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl FindManyQuery {
    pub fn new(where_: Vec<WhereClause>) -> Self {
        Self { where_, ..Default::default() }
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn sorted_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_by = Some((field.into(), direction));
        self
    }
}

/// The generic CRUD surface every storage backend implements. Callers pass
/// and receive `serde_json::Value` records keyed by field name (camelCase,
/// matching the entity's `serde` rename); [`super::internal::InternalAdapter`]
/// is the layer that turns these into and out of typed `domain::entities`.
#[async_trait]
pub trait Adapter: Send + Sync {
    async fn create(&self, model: Model, data: Value, select: Option<&[&str]>) -> AuthResult<Value>;

    async fn find_one(
        &self,
        model: Model,
        where_: &[WhereClause],
        select: Option<&[&str]>,
    ) -> AuthResult<Option<Value>>;

    async fn find_many(&self, model: Model, query: FindManyQuery) -> AuthResult<Vec<Value>>;

    async fn update(&self, model: Model, where_: &[WhereClause], update: Value) -> AuthResult<Value>;

    async fn update_many(&self, model: Model, where_: &[WhereClause], update: Value) -> AuthResult<u64>;

    async fn delete(&self, model: Model, where_: &[WhereClause]) -> AuthResult<()>;

    async fn delete_many(&self, model: Model, where_: &[WhereClause]) -> AuthResult<u64>;

    async fn count(&self, model: Model, where_: &[WhereClause]) -> AuthResult<u64>;

    /// Runs `f` against a transactional view of the adapter, handed in as an
    /// `Arc` so the callback can hold onto it across `.await` points without
    /// fighting the trait's own lifetime. The default implementation has no
    /// transaction to offer and simply runs `f` against `self`; callers that
    /// need atomicity (refresh-token rotation) fall back to a
    /// compare-and-swap update when this default is in play, exactly as the
    /// contract allows. [`super::postgres::PostgresAdapter`] overrides this
    /// with a real `sqlx::Transaction`.
    async fn transaction(
        self: Arc<Self>,
        f: Box<dyn FnOnce(Arc<dyn Adapter>) -> BoxFuture<'static, AuthResult<Value>> + Send>,
    ) -> AuthResult<Value>
    where
        Self: Sized + 'static,
    {
        f(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_clause_defaults_to_and_and_eq() {
        let clause = WhereClause::eq("email", "a@b.com");
        assert_eq!(clause.connector, Connector::And);
        assert_eq!(clause.operator, Operator::Eq);
    }

    #[test]
    fn or_flips_the_connector() {
        let clause = WhereClause::eq("email", "a@b.com").or();
        assert_eq!(clause.connector, Connector::Or);
    }

    #[test]
    fn model_table_names_are_snake_case_plurals() {
        assert_eq!(Model::OAuthRefreshToken.table_name(), "oauth_refresh_tokens");
        assert_eq!(Model::CibaRequest.table_name(), "ciba_requests");
    }
}
