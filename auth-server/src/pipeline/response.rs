//! Response/error lifting for the pipeline (§4.E step 7): turns the
//! accumulated [`super::RequestContext`] or a propagated [`shared::errors::ApiError`]
//! into one normalized shape that `api::handlers` can render as an
//! `actix_web::HttpResponse`.

use actix_web::http::header::HeaderMap;
use actix_web::HttpResponse;
use serde_json::Value;

use shared::cookies::SetCookie;
use shared::errors::{ApiError, ErrorResponse};

use super::RequestContext;

/// A fully-resolved response: status, JSON body, headers accumulated by
/// hooks, and cookies to append as `Set-Cookie`. Building this is the last
/// thing `EndpointRegistry::dispatch` does; `actix-web` handlers convert it
/// to a real `HttpResponse` via [`EndpointResponse::into_http_response`].
pub struct EndpointResponse {
    pub status: u16,
    pub body: Value,
    pub headers: HeaderMap,
    pub cookies: Vec<SetCookie>,
}

impl EndpointResponse {
    pub fn ok(ctx: RequestContext) -> Self {
        Self {
            status: 200,
            body: ctx.returned.unwrap_or(Value::Null),
            headers: ctx.headers,
            cookies: ctx.cookies,
        }
    }

    /// Lifts a propagated `ApiError` into a response, per §7's propagation
    /// policy: the error's own status code and stable error code, never a
    /// leaked stack trace.
    pub fn from_error(error: &ApiError) -> Self {
        Self {
            status: error.status_code().as_u16(),
            body: serde_json::to_value(ErrorResponse::new(error)).unwrap_or(Value::Null),
            headers: HeaderMap::new(),
            cookies: Vec::new(),
        }
    }

    pub fn into_http_response(self) -> HttpResponse {
        let status = actix_web::http::StatusCode::from_u16(self.status)
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = HttpResponse::build(status);
        for (name, value) in self.headers.iter() {
            builder.insert_header((name.clone(), value.clone()));
        }
        for cookie in &self.cookies {
            if let Ok(value) = actix_web::http::header::HeaderValue::from_str(&cookie.to_header_value()) {
                builder.append_header((actix_web::http::header::SET_COOKIE, value));
            }
        }
        builder.json(self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_copies_status_code() {
        let response = EndpointResponse::from_error(&ApiError::InvalidCredentials);
        assert_eq!(response.status, 401);
    }
}
