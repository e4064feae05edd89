use yew::prelude::*;
use yew_router::prelude::*;

use crate::session::use_session;
use crate::Route;

#[function_component(Sidebar)]
pub fn sidebar() -> Html {
    let session = use_session();
    let current = use_route::<Route>();

    let class_active = |route: Route| {
        if current.as_ref() == Some(&route) {
            "active"
        } else {
            ""
        }
    };

    let mut items = vec![
        (Route::Dashboard, "Dashboard"),
        (Route::Devices, "Devices"),
        (Route::Profiles, "Profiles"),
        (Route::Firmware, "Firmware"),
    ];
    if session.is_admin() {
        items.push((Route::Users, "Users"));
        items.push((Route::Organisations, "Organisations"));
    }

    let links: Html = items
        .into_iter()
        .map(|(route, label)| {
            html! {
                <li class={class_active(route.clone())}>
                    <Link<Route> to={route}>{ label }</Link<Route>>
                </li>
            }
        })
        .collect();

    html! {
        <aside class="sidebar">
            <div class="sidebar-brand">{ "IoT Hub" }</div>
            <ul class="nav nav-sidebar">
                { links }
            </ul>
            <div class="sidebar-footer">
                { format!("v{}", env!("CARGO_PKG_VERSION")) }
            </div>
        </aside>
    }
}
