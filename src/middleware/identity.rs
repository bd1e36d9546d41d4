use axum::extract::FromRequestParts;

use crate::{
    domain::{CheckoutSession, Identity, Owner},
    middleware::{
        auth::{bearer_token, verify_token},
        session::{SessionUpdate, read_session},
    },
    state::AppState,
};

/// The caller's identity plus the checkout session it arrived with.
///
/// Never rejects: a missing or bad token just means "no user", and a visitor
/// without a guest cookie is `Identity::Anonymous` until something is written.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    pub identity: Identity,
    pub session: CheckoutSession,
    cookie_secure: bool,
    buy_now_ttl_minutes: i64,
}

impl RequestIdentity {
    pub fn new(identity: Identity, session: CheckoutSession) -> Self {
        Self {
            identity,
            session,
            cookie_secure: false,
            buy_now_ttl_minutes: 30,
        }
    }

    /// Owner for read paths; `None` for a visitor nobody has minted yet.
    pub fn owner(&self) -> Option<Owner> {
        self.identity.owner()
    }

    /// Owner for write paths. Mints a guest on first use and returns the
    /// cookie that makes it stick.
    pub fn owner_for_write(&self) -> (Owner, SessionUpdate) {
        match self.identity.owner() {
            Some(owner) => (owner, self.session_update()),
            None => {
                let owner = Owner::mint_guest();
                let update = match owner.guest_id() {
                    Some(guest_id) => self.session_update().set_guest(guest_id),
                    None => self.session_update(),
                };
                tracing::debug!("minted guest identity");
                (owner, update)
            }
        }
    }

    pub fn session_update(&self) -> SessionUpdate {
        SessionUpdate::new(self.cookie_secure, self.buy_now_ttl_minutes)
    }
}

impl FromRequestParts<AppState> for RequestIdentity {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = read_session(&parts.headers);
        let user_id = bearer_token(&parts.headers)
            .and_then(|token| verify_token(token, &state.config.jwt_secret))
            .map(|user| user.user_id);
        Ok(RequestIdentity {
            identity: Identity::resolve(user_id, &session),
            session,
            cookie_secure: state.config.cookie_secure,
            buy_now_ttl_minutes: state.config.buy_now_ttl_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn anonymous_write_mints_a_guest_cookie() {
        let request = RequestIdentity::new(Identity::Anonymous, CheckoutSession::default());
        let (owner, update) = request.owner_for_write();
        let guest = owner.guest_id().unwrap();
        assert_eq!(update.cookies().len(), 1);
        assert_eq!(update.cookies()[0].value(), guest);
    }

    #[test]
    fn known_identities_reuse_their_owner() {
        let user = Uuid::new_v4();
        let request = RequestIdentity::new(Identity::User(user), CheckoutSession::default());
        let (owner, update) = request.owner_for_write();
        assert_eq!(owner, Owner::User(user));
        assert!(update.cookies().is_empty());

        let request = RequestIdentity::new(Identity::Guest("g".into()), CheckoutSession::default());
        assert_eq!(request.owner_for_write().0, Owner::Guest("g".into()));
        assert_eq!(request.owner(), Some(Owner::Guest("g".into())));
    }
}
