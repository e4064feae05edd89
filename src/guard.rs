use serde::{Deserialize, Serialize};
use yew::prelude::*;
use yew_router::prelude::*;

use crate::session::{use_session, SessionState};
use crate::Route;

/// Privilege a protected subtree requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Authenticated,
    Admin,
}

/// Outcome of the policy check. Exactly one of child render or redirect,
/// never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    Allow,
    RedirectTo(Route),
}

/// Pure policy: no network call, no token liveness check. Staleness is only
/// discovered when an API call comes back unauthorized.
pub fn authorize(session: &SessionState, required: Privilege) -> Access {
    if !session.is_authenticated() {
        return Access::RedirectTo(Route::Login);
    }
    if required == Privilege::Admin && !session.is_admin() {
        return Access::RedirectTo(Route::NotAuthorized);
    }
    Access::Allow
}

/// Query carried to the login page so it can return the user to the path
/// they originally requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Properties, PartialEq)]
pub struct RequireAuthProps {
    #[prop_or_default]
    pub admin: bool,
    pub children: Html,
}

/// Gates a page subtree on the session store. Re-evaluates whenever the
/// session or the route changes, so a logout on a protected page redirects
/// immediately.
#[function_component(RequireAuth)]
pub fn require_auth(props: &RequireAuthProps) -> Html {
    let session = use_session();
    let navigator = use_navigator().expect("RequireAuth must be rendered inside a router");
    let location = use_location();

    let required = if props.admin {
        Privilege::Admin
    } else {
        Privilege::Authenticated
    };
    let access = authorize(session.state(), required);

    {
        // path plus query string, so login can restore the exact request
        let requested = location.map(|l| format!("{}{}", l.path(), l.query_str()));
        use_effect_with(access.clone(), move |access| match access {
            Access::RedirectTo(Route::Login) => {
                let query = LoginQuery { next: requested.clone() };
                if navigator.push_with_query(&Route::Login, &query).is_err() {
                    navigator.push(&Route::Login);
                }
            }
            Access::RedirectTo(route) => navigator.push(route),
            Access::Allow => {}
        });
    }

    if access == Access::Allow {
        props.children.clone()
    } else {
        html! {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{user, MemoryStore};

    fn logged_out() -> SessionState {
        SessionState::default()
    }

    fn logged_in(is_admin: bool) -> SessionState {
        SessionState::login(&MemoryStore::default(), user(is_admin), "tok".to_string())
    }

    #[test]
    fn anonymous_is_redirected_to_login() {
        assert_eq!(
            authorize(&logged_out(), Privilege::Authenticated),
            Access::RedirectTo(Route::Login)
        );
        assert_eq!(
            authorize(&logged_out(), Privilege::Admin),
            Access::RedirectTo(Route::Login)
        );
    }

    #[test]
    fn authenticated_user_is_allowed() {
        assert_eq!(
            authorize(&logged_in(false), Privilege::Authenticated),
            Access::Allow
        );
    }

    #[test]
    fn non_admin_is_redirected_to_not_authorized() {
        assert_eq!(
            authorize(&logged_in(false), Privilege::Admin),
            Access::RedirectTo(Route::NotAuthorized)
        );
    }

    #[test]
    fn admin_passes_both_levels() {
        assert_eq!(authorize(&logged_in(true), Privilege::Admin), Access::Allow);
        assert_eq!(
            authorize(&logged_in(true), Privilege::Authenticated),
            Access::Allow
        );
    }

    #[test]
    fn logout_on_protected_page_flips_to_redirect() {
        let store = MemoryStore::default();
        let state = SessionState::login(&store, user(false), "tok".to_string());
        assert_eq!(authorize(&state, Privilege::Authenticated), Access::Allow);

        let state = SessionState::logout(&store);
        assert_eq!(
            authorize(&state, Privilege::Authenticated),
            Access::RedirectTo(Route::Login)
        );
    }
}
