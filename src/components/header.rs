use yew::prelude::*;
use yew_router::prelude::*;

use crate::session::use_session;
use crate::Route;

#[function_component(Header)]
pub fn header() -> Html {
    let session = use_session();
    let navigator = use_navigator().expect("Header must be rendered inside a router");

    let user = session.user();
    let on_logout = {
        let session = session.clone();
        Callback::from(move |_| {
            session.logout();
            navigator.push(&Route::Login);
        })
    };

    html! {
        <header class="header">
            <h1 class="header-title">{ "IoT Hub" }</h1>
            <div class="header-user">
                if let Some(user) = user {
                    <span class="header-email">{ user.email }</span>
                    if user.is_admin {
                        <span class="badge">{ "Administrator" }</span>
                    }
                }
                <button class="btn" onclick={on_logout}>{ "Log out" }</button>
            </div>
        </header>
    }
}
