use web_sys::HtmlInputElement;
use yew::prelude::*;
use yew_router::prelude::*;

use crate::api::Api;
use crate::guard::LoginQuery;
use crate::session::{use_session, User};
use crate::Route;

/// The route (and its query parameters) to land on after a successful
/// login: the originally requested URL when the guard recorded one, the
/// dashboard otherwise. Unrecognized paths fall back to the dashboard.
fn destination(query: Option<LoginQuery>) -> (Route, Vec<(String, String)>) {
    let Some(next) = query.and_then(|q| q.next) else {
        return (Route::Dashboard, Vec::new());
    };
    let (path, raw_query) = match next.split_once('?') {
        Some((path, raw)) => (path, raw),
        None => (next.as_str(), ""),
    };
    match Route::recognize(path) {
        Some(route) => (
            route,
            serde_urlencoded::from_str(raw_query).unwrap_or_default(),
        ),
        None => (Route::Dashboard, Vec::new()),
    }
}

fn go(navigator: &Navigator, route: Route, query: Vec<(String, String)>) {
    if query.is_empty() || navigator.push_with_query(&route, &query).is_err() {
        navigator.push(&route);
    }
}

#[function_component(LoginPage)]
pub fn login_page() -> Html {
    let session = use_session();
    let navigator = use_navigator().expect("LoginPage must be rendered inside a router");
    let location = use_location();

    let email = use_state(String::new);
    let password = use_state(String::new);
    let error = use_state(|| None::<String>);
    let busy = use_state(|| false);

    let query = location.and_then(|l| l.query::<LoginQuery>().ok());

    if session.is_authenticated() {
        let (route, _) = destination(query);
        return html! { <Redirect<Route> to={route} /> };
    }

    let on_email = {
        let email = email.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            email.set(input.value());
        })
    };
    let on_password = {
        let password = password.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            password.set(input.value());
        })
    };

    let onsubmit = {
        let session = session.clone();
        let email = email.clone();
        let password = password.clone();
        let error = error.clone();
        let busy = busy.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *busy {
                return;
            }
            if email.is_empty() || password.is_empty() {
                error.set(Some("Please fill in all required fields".to_string()));
                return;
            }

            busy.set(true);
            error.set(None);

            let session = session.clone();
            let navigator = navigator.clone();
            let form_email = (*email).clone();
            let form_password = (*password).clone();
            let error = error.clone();
            let busy = busy.clone();
            let query = query.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match Api::new(None).login(&form_email, &form_password).await {
                    Ok(resp) => {
                        let user = User {
                            user_id: resp.user_id,
                            email: resp.email.unwrap_or(form_email),
                            is_admin: resp.is_admin,
                        };
                        session.login(user, resp.token);
                        let (route, params) = destination(query);
                        go(&navigator, route, params);
                    }
                    Err(err) => {
                        log::warn!("login failed: {err}");
                        error.set(Some(err.to_string()));
                        busy.set(false);
                    }
                }
            });
        })
    };

    html! {
        <div class="login-screen">
            <div class="panel login-panel">
                <div class="panel-heading">
                    <h2 class="panel-title">{ "Login to IoT Hub" }</h2>
                    <p class="text-muted">{ "Enter your credentials to access your account" }</p>
                </div>
                <div class="panel-body">
                    <form {onsubmit}>
                        if let Some(message) = (*error).clone() {
                            <div class="alert alert-danger">{ message }</div>
                        }
                        <label for="email">{ "Email" }</label>
                        <input id="email" type="email" class="form-control"
                            placeholder="Enter your email"
                            value={(*email).clone()} oninput={on_email} />
                        <label for="password">{ "Password" }</label>
                        <input id="password" type="password" class="form-control"
                            placeholder="Enter your password"
                            value={(*password).clone()} oninput={on_password} />
                        <button type="submit" class="btn btn-primary" disabled={*busy}>
                            { if *busy { "Logging in..." } else { "Login" } }
                        </button>
                    </form>
                </div>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(next: &str) -> Option<LoginQuery> {
        Some(LoginQuery {
            next: Some(next.to_string()),
        })
    }

    #[test]
    fn no_remembered_request_lands_on_dashboard() {
        assert_eq!(destination(None), (Route::Dashboard, Vec::new()));
        assert_eq!(
            destination(Some(LoginQuery::default())),
            (Route::Dashboard, Vec::new())
        );
    }

    #[test]
    fn remembered_path_is_recognized() {
        assert_eq!(destination(q("/devices")), (Route::Devices, Vec::new()));
        assert_eq!(
            destination(q("/device/42")),
            (Route::DeviceDetail { device_id: 42 }, Vec::new())
        );
    }

    #[test]
    fn query_string_of_the_request_survives() {
        let (route, params) = destination(q("/profiles/p-1/devices?page=2&q=a%20b"));
        assert_eq!(
            route,
            Route::ProfileDevices {
                profile_id: "p-1".to_string()
            }
        );
        assert_eq!(
            params,
            vec![
                ("page".to_string(), "2".to_string()),
                ("q".to_string(), "a b".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_path_falls_back_to_dashboard() {
        assert_eq!(destination(q("/no/such/page?x=1")), (Route::Dashboard, Vec::new()));
    }
}
