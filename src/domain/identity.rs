use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Who is behind the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User(Uuid),
    Guest(String),
    Anonymous,
}

/// The identity that holds a cart or draft. Unlike [`Identity`] it is never
/// anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    User(Uuid),
    Guest(String),
}

impl Identity {
    /// Resolve from an optional verified user id and the session's guest id.
    /// A verified user always wins over a guest cookie.
    pub fn resolve(user_id: Option<Uuid>, session: &CheckoutSession) -> Identity {
        match (user_id, session.guest_id.as_ref()) {
            (Some(user_id), _) => Identity::User(user_id),
            (None, Some(guest_id)) => Identity::Guest(guest_id.clone()),
            (None, None) => Identity::Anonymous,
        }
    }

    pub fn owner(&self) -> Option<Owner> {
        match self {
            Identity::User(id) => Some(Owner::User(*id)),
            Identity::Guest(id) => Some(Owner::Guest(id.clone())),
            Identity::Anonymous => None,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Identity::User(id) => Some(*id),
            _ => None,
        }
    }
}

impl Owner {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Owner::User(id) => Some(*id),
            Owner::Guest(_) => None,
        }
    }

    pub fn guest_id(&self) -> Option<&str> {
        match self {
            Owner::User(_) => None,
            Owner::Guest(id) => Some(id),
        }
    }

    /// Does a row carrying `(user_id, guest_id)` belong to this owner?
    pub fn owns(&self, user_id: Option<Uuid>, guest_id: Option<&str>) -> bool {
        match self {
            Owner::User(id) => user_id == Some(*id),
            Owner::Guest(id) => guest_id == Some(id.as_str()),
        }
    }

    /// Fresh opaque guest token.
    pub fn mint_guest() -> Owner {
        Owner::Guest(Uuid::new_v4().simple().to_string())
    }
}

/// Which source a checkout should read its lines from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum CheckoutMode {
    BuyNow,
    #[default]
    Cart,
}

/// Client-held checkout state: the guest token, the buy-now flag and the
/// draft it points at. How it travels (cookies) is the middleware's business.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutSession {
    pub guest_id: Option<String>,
    pub mode: CheckoutMode,
    pub draft_id: Option<Uuid>,
}

impl CheckoutSession {
    /// The draft id to read, only while the session is in buy-now mode.
    pub fn buy_now_draft(&self) -> Option<Uuid> {
        match self.mode {
            CheckoutMode::BuyNow => self.draft_id,
            CheckoutMode::Cart => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_wins_over_guest_cookie() {
        let session = CheckoutSession {
            guest_id: Some("g1".into()),
            ..Default::default()
        };
        let user = Uuid::new_v4();
        assert_eq!(Identity::resolve(Some(user), &session), Identity::User(user));
        assert_eq!(
            Identity::resolve(None, &session),
            Identity::Guest("g1".into())
        );
        assert_eq!(
            Identity::resolve(None, &CheckoutSession::default()),
            Identity::Anonymous
        );
    }

    #[test]
    fn anonymous_has_no_owner() {
        assert_eq!(Identity::Anonymous.owner(), None);
    }

    #[test]
    fn ownership_checks_the_matching_column() {
        let user = Uuid::new_v4();
        let owner = Owner::User(user);
        assert!(owner.owns(Some(user), None));
        assert!(!owner.owns(None, Some("g1")));

        let guest = Owner::Guest("g1".into());
        assert!(guest.owns(None, Some("g1")));
        assert!(!guest.owns(Some(user), Some("g2")));
    }

    #[test]
    fn draft_is_only_read_in_buy_now_mode() {
        let draft = Uuid::new_v4();
        let mut session = CheckoutSession {
            draft_id: Some(draft),
            ..Default::default()
        };
        assert_eq!(session.buy_now_draft(), None);
        session.mode = CheckoutMode::BuyNow;
        assert_eq!(session.buy_now_draft(), Some(draft));
    }

    #[test]
    fn minted_guests_are_distinct() {
        assert_ne!(Owner::mint_guest(), Owner::mint_guest());
    }
}
