use std::fmt;

use crate::models::{Profile, Session, FORMCOACH_FEATURE};

pub const LOGIN: &str = "/login";
pub const HOME: &str = "/";
pub const PROFILE_SETUP: &str = "/profile-setup";

/// A single access predicate placed in front of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Guard {
    /// A session must be present.
    Authenticated,
    /// The signed-in user must have a profile.
    RequireProfile,
    /// The signed-in user must not have a profile yet.
    RedirectIfProfileExists,
    /// The profile must have the admin role.
    AdminRoute,
    /// The profile must list the `formcoach` feature.
    RequireFormCoachAccess,
}

impl Guard {
    pub fn as_str(&self) -> &'static str {
        match self {
            Guard::Authenticated => "authenticated",
            Guard::RequireProfile => "require_profile",
            Guard::RedirectIfProfileExists => "redirect_if_profile_exists",
            Guard::AdminRoute => "admin_route",
            Guard::RequireFormCoachAccess => "require_formcoach_access",
        }
    }

    /// Whether evaluating this guard needs the current user's profile.
    pub fn needs_profile(&self) -> bool {
        !matches!(self, Guard::Authenticated)
    }

    pub fn evaluate(&self, input: &GuardInput<'_>) -> GuardOutcome {
        if input.session_loading {
            return GuardOutcome::Pending(PendingOn::Session);
        }
        // Profile guards fail closed without a session.
        if input.session.is_none() {
            return GuardOutcome::Redirect(LOGIN);
        }
        if !self.needs_profile() {
            return GuardOutcome::Allow;
        }

        let profile = match input.profile {
            ProfileLookup::Loading => return GuardOutcome::Pending(PendingOn::Profile),
            ProfileLookup::Missing => None,
            ProfileLookup::Found(profile) => Some(profile),
        };

        match (self, profile) {
            (Guard::RequireProfile, Some(_)) => GuardOutcome::Allow,
            (Guard::RequireProfile, None) => GuardOutcome::Redirect(PROFILE_SETUP),
            (Guard::RedirectIfProfileExists, Some(_)) => GuardOutcome::Redirect(HOME),
            (Guard::RedirectIfProfileExists, None) => GuardOutcome::Allow,
            (Guard::AdminRoute, Some(p)) if p.is_admin() => GuardOutcome::Allow,
            (Guard::RequireFormCoachAccess, Some(p)) if p.has_feature(FORMCOACH_FEATURE) => {
                GuardOutcome::Allow
            }
            (Guard::AdminRoute | Guard::RequireFormCoachAccess, _) => GuardOutcome::Redirect(HOME),
            (Guard::Authenticated, _) => GuardOutcome::Allow,
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a guard is still waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOn {
    Session,
    Profile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    Redirect(&'static str),
    Pending(PendingOn),
}

/// State of the profile lookup for the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfileLookup<'a> {
    /// Not fetched yet, or the fetch is in flight.
    Loading,
    Missing,
    Found(&'a Profile),
}

impl<'a> From<Option<&'a Profile>> for ProfileLookup<'a> {
    fn from(profile: Option<&'a Profile>) -> Self {
        match profile {
            Some(p) => ProfileLookup::Found(p),
            None => ProfileLookup::Missing,
        }
    }
}

/// Everything a guard looks at.
#[derive(Debug, Clone, Copy)]
pub struct GuardInput<'a> {
    pub session: Option<&'a Session>,
    pub session_loading: bool,
    pub profile: ProfileLookup<'a>,
}

/// An ordered list of guards; the first one that does not allow decides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardChain(Vec<Guard>);

impl GuardChain {
    pub fn new(guards: Vec<Guard>) -> Self {
        GuardChain(guards)
    }

    pub fn open() -> Self {
        GuardChain(Vec::new())
    }

    pub fn guards(&self) -> &[Guard] {
        &self.0
    }

    pub fn requires_profile(&self) -> bool {
        self.0.iter().any(Guard::needs_profile)
    }

    pub fn evaluate(&self, input: &GuardInput<'_>) -> GuardOutcome {
        for guard in &self.0 {
            match guard.evaluate(input) {
                GuardOutcome::Allow => continue,
                other => return other,
            }
        }
        GuardOutcome::Allow
    }
}

impl From<Vec<Guard>> for GuardChain {
    fn from(guards: Vec<Guard>) -> Self {
        GuardChain(guards)
    }
}
