use yew::prelude::*;
use yew_router::prelude::*;

mod api;
mod components;
mod config;
mod guard;
mod models;
mod pages;
mod session;
mod utils;

use components::layout::Layout;
use guard::RequireAuth;
use pages::dashboard::DashboardPage;
use pages::device_detail::DeviceDetailPage;
use pages::devices::DevicesPage;
use pages::firmware::FirmwarePage;
use pages::login::LoginPage;
use pages::not_found::{NotAuthorizedPage, NotFoundPage};
use pages::organisations::OrganisationsPage;
use pages::profile_devices::ProfileDevicesPage;
use pages::profiles::ProfilesPage;
use pages::users::UsersPage;
use session::SessionProvider;

#[derive(Debug, Clone, PartialEq, Routable)]
pub enum Route {
    #[at("/login")]
    Login,
    #[at("/")]
    Dashboard,
    #[at("/devices")]
    Devices,
    #[at("/device/:device_id")]
    DeviceDetail { device_id: i64 },
    #[at("/profiles")]
    Profiles,
    #[at("/profiles/:profile_id/devices")]
    ProfileDevices { profile_id: String },
    #[at("/firmware")]
    Firmware,
    #[at("/users")]
    Users,
    #[at("/organisations")]
    Organisations,
    #[at("/not-authorized")]
    NotAuthorized,
    #[not_found]
    #[at("/404")]
    NotFound,
}

/// Every route except login renders inside the shell, gated on the session.
/// The users and organisations pages additionally require admin.
fn protected(admin: bool, page: Html) -> Html {
    html! {
        <RequireAuth {admin}>
            <Layout>{ page }</Layout>
        </RequireAuth>
    }
}

fn switch(route: Route) -> Html {
    match route {
        Route::Login => html! { <LoginPage /> },
        Route::Dashboard => protected(false, html! { <DashboardPage /> }),
        Route::Devices => protected(false, html! { <DevicesPage /> }),
        Route::DeviceDetail { device_id } => {
            protected(false, html! { <DeviceDetailPage {device_id} /> })
        }
        Route::Profiles => protected(false, html! { <ProfilesPage /> }),
        Route::ProfileDevices { profile_id } => {
            protected(false, html! { <ProfileDevicesPage {profile_id} /> })
        }
        Route::Firmware => protected(false, html! { <FirmwarePage /> }),
        Route::Users => protected(true, html! { <UsersPage /> }),
        Route::Organisations => protected(true, html! { <OrganisationsPage /> }),
        Route::NotAuthorized => protected(false, html! { <NotAuthorizedPage /> }),
        Route::NotFound => protected(false, html! { <NotFoundPage /> }),
    }
}

#[function_component(App)]
fn app() -> Html {
    html! {
        <BrowserRouter>
            <SessionProvider>
                <Switch<Route> render={switch} />
            </SessionProvider>
        </BrowserRouter>
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("starting iothub console v{}", env!("CARGO_PKG_VERSION"));
    yew::Renderer::<App>::new().render();
}
