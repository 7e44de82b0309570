pub mod guard;
pub mod navigator;
pub mod routes;

pub use guard::{
    Guard, GuardChain, GuardInput, GuardOutcome, PendingOn, ProfileLookup, HOME, LOGIN,
    PROFILE_SETUP,
};
pub use navigator::{Navigator, Resolution};
pub use routes::{RouteDef, RouteMatch, RouteTable};
