use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Header, HeaderName, HeaderValue};

use crate::error::ApiError;

pub static X_REVISING_USER: HeaderName = HeaderName::from_static("x-revising-user");

/// `X-Revising-User: <user id>`, set by the host after it has authenticated
/// the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRevisingUser(pub i32);

impl Header for XRevisingUser {
    fn name() -> &'static HeaderName {
        &X_REVISING_USER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        values
            .next()
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<i32>().ok())
            .map(XRevisingUser)
            .ok_or_else(headers::Error::invalid)
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        values.extend(std::iter::once(HeaderValue::from(self.0)));
    }
}

/// The user a write is attributed to.
#[derive(Debug, Clone, Copy)]
pub struct RevisingUser {
    pub user_id: i32,
}

impl<S> FromRequestParts<S> for RevisingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let TypedHeader(XRevisingUser(user_id)) =
                TypedHeader::<XRevisingUser>::from_request_parts(parts, state)
                    .await
                    .map_err(|_| ApiError::revising_user_required())?;

            Ok(RevisingUser { user_id })
        }
    }
}
