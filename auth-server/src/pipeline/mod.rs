//! # Request Pipeline
//!
//! Component 4.E: a request-scoped accumulator plus before/after hook
//! composition, modeled as an explicit value instead of the source spec's
//! mutated shared context object (see DESIGN.md on "hook chaining and header
//! merging"). Built-in endpoints are thin `actix-web` handlers in
//! `auth-server::api` that call straight into `session`/`credential`/`oauth`;
//! this module is what lets a [`crate::context::Plugin`] contribute more
//! endpoints and global hooks without touching `api::routes`.

pub mod response;

use std::sync::Arc;

use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};
use futures::future::BoxFuture;
use serde_json::Value;

use shared::cookies::SetCookie;

use crate::context::AuthContext;
use crate::AuthResult;

pub use response::EndpointResponse;

/// HTTP methods an [`Endpoint`] can be registered for. Kept to the subset
/// this spec's surface actually uses (§6); there is no PUT/PATCH/DELETE
/// endpoint anywhere in the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Content types an [`Endpoint`] declares it can parse its body as.
/// Multipart is reserved (§4.E) but never implemented since no endpoint in
/// §6 needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    FormUrlEncoded,
}

/// Request-scoped accumulator threaded through before-hooks, the handler,
/// and after-hooks. `headers`/`cookies` are append-only per §5's ordering
/// guarantee; a hook that needs to *replace* a cookie does so by appending a
/// `Max-Age: 0` clear cookie for the old one, never by mutating in place.
pub struct RequestContext {
    pub auth: Arc<AuthContext>,
    pub headers: HeaderMap,
    pub cookies: Vec<SetCookie>,
    pub returned: Option<Value>,
}

impl RequestContext {
    pub fn new(auth: Arc<AuthContext>) -> Self {
        Self { auth, headers: HeaderMap::new(), cookies: Vec::new(), returned: None }
    }

    pub fn set_header(&mut self, name: &'static str, value: impl Into<String>) {
        if let (Ok(name), Ok(value)) = (HeaderName::from_static(name), HeaderValue::from_str(&value.into())) {
            self.headers.insert(name, value);
        }
    }

    pub fn push_cookie(&mut self, cookie: SetCookie) {
        self.cookies.push(cookie);
    }
}

/// What a before-hook decided: either the request continues with a
/// (possibly modified) context, or the hook short-circuits with a response of
/// its own (e.g. a redirect, a 401).
pub enum HookOutcome {
    Continue(RequestContext),
    ShortCircuit(EndpointResponse),
}

pub type BeforeHook = Arc<dyn Fn(RequestContext) -> BoxFuture<'static, AuthResult<HookOutcome>> + Send + Sync>;
pub type AfterHook = Arc<dyn Fn(RequestContext) -> BoxFuture<'static, AuthResult<RequestContext>> + Send + Sync>;

/// Global before/after hooks contributed by options or a plugin. Plugin
/// hooks run after options-level hooks, both in registration order, matching
/// §4.E step 3's "options-level, then plugin-level, in registration order".
#[derive(Clone, Default)]
pub struct Hooks {
    pub before: Vec<BeforeHook>,
    pub after: Vec<AfterHook>,
}

/// A handler closure: takes the accumulated context plus the parsed request
/// body/query, returns the context (possibly with new headers/cookies) and
/// the JSON value to serialize as the response body.
pub type HandlerFn =
    Arc<dyn Fn(RequestContext, Value) -> BoxFuture<'static, AuthResult<(RequestContext, Value)>> + Send + Sync>;

/// A plugin-contributed route. Built-in routes (§6's table) are wired
/// directly in `api::routes` rather than through this struct — plugins are
/// the intended producer here, since the core surface is fixed and known at
/// compile time.
#[derive(Clone)]
pub struct Endpoint {
    pub path: String,
    pub methods: Vec<Method>,
    pub content_types: Vec<ContentType>,
    pub handler: HandlerFn,
}

/// Holds plugin-contributed endpoints and the global hook chains assembled
/// by [`crate::context::AuthBuilder`]. `dispatch` runs the full seven-step
/// sequence from §4.E for requests that land on a registered endpoint.
#[derive(Clone, Default)]
pub struct EndpointRegistry {
    endpoints: Vec<Endpoint>,
    hooks: Hooks,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, endpoint: Endpoint) {
        self.endpoints.push(endpoint);
    }

    pub fn add_hooks(&mut self, hooks: Hooks) {
        self.hooks.before.extend(hooks.before);
        self.hooks.after.extend(hooks.after);
    }

    pub fn find(&self, path: &str, method: Method) -> Option<&Endpoint> {
        self.endpoints
            .iter()
            .find(|e| e.path == path && e.methods.contains(&method))
    }

    /// Runs steps 3, 5, 6, 7 of §4.E (step 1/2 — path/method match and body
    /// parsing — already happened by the time an `Endpoint` and parsed
    /// `body` reach here; step 4, endpoint-scoped middlewares, is applied by
    /// the actix-web `Transform`s in `middleware` ahead of this call).
    pub async fn dispatch(&self, auth: Arc<AuthContext>, endpoint: &Endpoint, body: Value) -> EndpointResponse {
        let mut ctx = RequestContext::new(auth);

        for hook in &self.hooks.before {
            match hook(ctx).await {
                Ok(HookOutcome::Continue(next)) => ctx = next,
                Ok(HookOutcome::ShortCircuit(response)) => return response,
                Err(err) => return EndpointResponse::from_error(&err),
            }
        }

        let (mut ctx, value) = match (endpoint.handler)(ctx, body).await {
            Ok(pair) => pair,
            Err(err) => return EndpointResponse::from_error(&err),
        };
        ctx.returned = Some(value);

        for hook in &self.hooks.after {
            match hook(ctx).await {
                Ok(next) => ctx = next,
                Err(err) => return EndpointResponse::from_error(&err),
            }
        }

        EndpointResponse::ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_registry_finds_by_path_and_method() {
        let mut registry = EndpointRegistry::new();
        registry.register(Endpoint {
            path: "/plugin/ping".into(),
            methods: vec![Method::Get],
            content_types: vec![ContentType::Json],
            handler: Arc::new(|ctx, _body| Box::pin(async move { Ok((ctx, serde_json::json!({"pong": true}))) })),
        });
        assert!(registry.find("/plugin/ping", Method::Get).is_some());
        assert!(registry.find("/plugin/ping", Method::Post).is_none());
        assert!(registry.find("/other", Method::Get).is_none());
    }
}
