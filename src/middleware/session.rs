//! Cookie transport for [`CheckoutSession`].
//!
//! The guest token lives for a year; the buy-now flag and draft id are
//! short-lived and cleared once an order is placed.

use std::convert::Infallible;

use axum::{
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
    },
    response::{IntoResponseParts, ResponseParts},
};
use cookie::{Cookie, SameSite, time::Duration};
use uuid::Uuid;

use crate::domain::{CheckoutMode, CheckoutSession};

pub const GUEST_COOKIE: &str = "guest_id";
pub const CHECKOUT_MODE_COOKIE: &str = "checkout_mode";
pub const DRAFT_COOKIE: &str = "checkout_draft_id";

const BUY_NOW: &str = "buy_now";
const GUEST_MAX_AGE_DAYS: i64 = 365;

/// Read the checkout session from the request's `Cookie` headers. Values that
/// do not look like ours are ignored.
pub fn read_session(headers: &HeaderMap) -> CheckoutSession {
    let mut session = CheckoutSession::default();
    let cookies = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok);

    for cookie in cookies {
        match cookie.name() {
            GUEST_COOKIE => {
                let value = cookie.value().trim();
                if Uuid::parse_str(value).is_ok() {
                    session.guest_id = Some(value.to_string());
                }
            }
            CHECKOUT_MODE_COOKIE if cookie.value() == BUY_NOW => {
                session.mode = CheckoutMode::BuyNow;
            }
            DRAFT_COOKIE => session.draft_id = Uuid::parse_str(cookie.value()).ok(),
            _ => {}
        }
    }
    session
}

/// `Set-Cookie` headers to attach to a response.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    secure: bool,
    buy_now_ttl_minutes: i64,
    cookies: Vec<Cookie<'static>>,
}

impl SessionUpdate {
    pub fn new(secure: bool, buy_now_ttl_minutes: i64) -> Self {
        Self {
            secure,
            buy_now_ttl_minutes,
            cookies: Vec::new(),
        }
    }

    fn cookie(&self, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(max_age)
            .build()
    }

    pub fn set_guest(mut self, guest_id: &str) -> Self {
        let cookie = self.cookie(
            GUEST_COOKIE,
            guest_id.to_string(),
            Duration::days(GUEST_MAX_AGE_DAYS),
        );
        self.cookies.push(cookie);
        self
    }

    pub fn start_buy_now(mut self, draft_id: Uuid) -> Self {
        let ttl = Duration::minutes(self.buy_now_ttl_minutes);
        let mode = self.cookie(CHECKOUT_MODE_COOKIE, BUY_NOW.to_string(), ttl);
        let draft = self.cookie(DRAFT_COOKIE, draft_id.to_string(), ttl);
        self.cookies.push(mode);
        self.cookies.push(draft);
        self
    }

    pub fn end_buy_now(mut self) -> Self {
        for name in [CHECKOUT_MODE_COOKIE, DRAFT_COOKIE] {
            let mut cookie = self.cookie(name, String::new(), Duration::ZERO);
            cookie.make_removal();
            self.cookies.push(cookie);
        }
        self
    }

    pub fn cookies(&self) -> &[Cookie<'static>] {
        &self.cookies
    }
}

impl IntoResponseParts for SessionUpdate {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        for cookie in self.cookies {
            if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
                res.headers_mut().append(SET_COOKIE, value);
            }
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn reads_guest_mode_and_draft() {
        let guest = Uuid::new_v4().simple().to_string();
        let draft = Uuid::new_v4();
        let session = read_session(&headers(&format!(
            "guest_id={guest}; checkout_mode=buy_now; checkout_draft_id={draft}; other=1"
        )));
        assert_eq!(session.guest_id.as_deref(), Some(guest.as_str()));
        assert_eq!(session.mode, CheckoutMode::BuyNow);
        assert_eq!(session.draft_id, Some(draft));
    }

    #[test]
    fn ignores_foreign_values() {
        let session = read_session(&headers("guest_id=<script>; checkout_mode=weird"));
        assert_eq!(session, CheckoutSession::default());
    }

    #[test]
    fn guest_cookie_is_http_only() {
        let update = SessionUpdate::new(true, 30).set_guest("abc");
        let cookie = &update.cookies()[0];
        assert_eq!(cookie.name(), GUEST_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn ending_buy_now_expires_both_cookies() {
        let update = SessionUpdate::new(false, 30).end_buy_now();
        let names: Vec<_> = update.cookies().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec![CHECKOUT_MODE_COOKIE, DRAFT_COOKIE]);
        assert!(update.cookies().iter().all(|c| c.value().is_empty()));
    }
}
