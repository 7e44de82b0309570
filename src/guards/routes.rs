use std::collections::BTreeMap;

use super::guard::{Guard, GuardChain};

/// A named path pattern and the guards in front of it. Segments starting
/// with `:` capture a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDef {
    pub name: &'static str,
    pub pattern: &'static str,
    pub guards: GuardChain,
}

impl RouteDef {
    fn matches(&self, segments: &[&str]) -> Option<BTreeMap<String, String>> {
        let pattern: Vec<&str> = split_path(self.pattern);
        if pattern.len() != segments.len() {
            return None;
        }
        let mut params = BTreeMap::new();
        for (expected, actual) in pattern.iter().zip(segments) {
            match expected.strip_prefix(':') {
                Some(name) => {
                    params.insert(name.to_string(), actual.to_string());
                }
                None if expected == actual => {}
                None => return None,
            }
        }
        Some(params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteDef,
    pub params: BTreeMap<String, String>,
}

/// Ordered route table; the first matching pattern wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteDef>,
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Drop any query string or fragment.
fn strip_suffixes(path: &str) -> &str {
    let end = path.find(|c: char| c == '?' || c == '#').unwrap_or(path.len());
    &path[..end]
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, name: &'static str, pattern: &'static str, guards: Vec<Guard>) -> Self {
        self.routes.push(RouteDef {
            name,
            pattern,
            guards: guards.into(),
        });
        self
    }

    pub fn routes(&self) -> &[RouteDef] {
        &self.routes
    }

    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        let segments = split_path(strip_suffixes(path));
        self.routes.iter().find_map(|route| {
            route
                .matches(&segments)
                .map(|params| RouteMatch { route, params })
        })
    }

    /// The FormCoach client's screens.
    pub fn formcoach() -> Self {
        use Guard::*;

        let signed_in = || vec![Authenticated];
        let with_profile = || vec![Authenticated, RequireProfile];

        RouteTable::new()
            .route("login", "/login", vec![])
            .route("signup", "/signup", vec![])
            .route("forgot_password", "/forgot-password", vec![])
            .route("verify", "/verify", vec![])
            .route("welcome", "/welcome", signed_in())
            .route("medical_disclaimer", "/medical-disclaimer", signed_in())
            .route(
                "profile_setup",
                "/profile-setup",
                vec![Authenticated, RedirectIfProfileExists],
            )
            .route("home", "/", with_profile())
            .route(
                "workout_category_select",
                "/workout-category-select",
                with_profile(),
            )
            .route("workout_plan", "/workout-plan", with_profile())
            .route("workout_confirmation", "/workout-confirmation", with_profile())
            .route("profile", "/profile", with_profile())
            .route("cardio_type_select", "/cardio-type-select", with_profile())
            .route("cardio_warmup", "/cardio-warmup", with_profile())
            .route("workout_history", "/workout-history", with_profile())
            .route("workout_plans", "/workout-plans", with_profile())
            .route("workout_plan_editor", "/workout-plan-editor", with_profile())
            .route(
                "workout_plan_edit",
                "/workout-plan-editor/:planId",
                with_profile(),
            )
            .route("workout_review", "/workout-review", with_profile())
            .route(
                "test_options",
                "/test-options",
                vec![Authenticated, RequireProfile, AdminRoute],
            )
            .route(
                "trends",
                "/trends",
                vec![Authenticated, RequireProfile, RequireFormCoachAccess],
            )
    }
}
