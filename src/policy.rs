//! Access policy shared by every handler.
//!
//! A single decision function answers "may this identity do this to that
//! resource". Ownership is the only relation that matters: there are no roles.
//! A visitor who is not the owner is told the resource does not exist, never
//! that access was forbidden, so that non-owners cannot tell which notes or
//! comments exist.

use uuid::Uuid;

use crate::{
    auth::Identity,
    error::AppError,
    models::{Comment, Note},
};

/// Anything with exactly one owning user.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for Note {
    fn owner_id(&self) -> Uuid {
        self.author_id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> Uuid {
        self.author_id
    }
}

/// What is being accessed.
#[derive(Clone, Copy)]
pub enum Resource<'a> {
    /// Home, news detail, login/signup/logout.
    PublicPage,
    /// Pages that only make sense for a signed-in user: note list, add form, success page.
    MemberArea,
    /// A looked-up note or comment; `None` when the lookup found nothing.
    Owned(Option<&'a dyn Owned>),
}

impl<'a> Resource<'a> {
    pub fn owned<T: Owned + 'a>(item: Option<&'a T>) -> Self {
        Self::Owned(item.map(|item| item as &dyn Owned))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Send the visitor to the login page and back afterwards.
    MustAuthenticate,
    /// Answer exactly as for a resource that does not exist.
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(Denial),
}

/// authorize
///
/// Anonymous visitors are asked to log in for anything but reading public
/// pages. Signed-in users may create anything and use member pages. Viewing,
/// editing or deleting an owned resource requires being its owner; a missing
/// resource and a foreign one are denied the same way.
pub fn authorize(identity: &Identity, resource: &Resource<'_>, action: Action) -> Decision {
    let user = match (identity, resource, action) {
        (_, Resource::PublicPage, Action::View) => return Decision::Allowed,
        (Identity::Anonymous, _, _) => return Decision::Denied(Denial::MustAuthenticate),
        (Identity::User(user), _, _) => user,
    };

    match (resource, action) {
        (_, Action::Create) | (Resource::PublicPage | Resource::MemberArea, _) => Decision::Allowed,
        (Resource::Owned(Some(item)), _) if item.owner_id() == user.id => Decision::Allowed,
        (Resource::Owned(_), _) => Decision::Denied(Denial::NotFound),
    }
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Self::Allowed
    }

    /// Converts a denial into the response it stands for. `next` is the
    /// originally requested path and query.
    pub fn require(self, login_url: &str, next: &str) -> Result<(), AppError> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied(Denial::MustAuthenticate) => {
                Err(AppError::must_authenticate(login_url, next))
            }
            Self::Denied(Denial::NotFound) => Err(AppError::NotFound),
        }
    }
}
