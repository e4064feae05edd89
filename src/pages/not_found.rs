use yew::prelude::*;
use yew_router::prelude::*;

use crate::Route;

#[function_component(NotFoundPage)]
pub fn not_found_page() -> Html {
    html! {
        <div class="page centered-page">
            <h2>{ "Page not found" }</h2>
            <p class="text-muted">{ "The page you were looking for does not exist." }</p>
            <Link<Route> to={Route::Dashboard} classes="btn btn-primary">
                { "Back to dashboard" }
            </Link<Route>>
        </div>
    }
}

#[function_component(NotAuthorizedPage)]
pub fn not_authorized_page() -> Html {
    html! {
        <div class="page centered-page">
            <h2>{ "Not authorized" }</h2>
            <p class="text-muted">{ "This area is restricted to administrators." }</p>
            <Link<Route> to={Route::Dashboard} classes="btn btn-primary">
                { "Back to dashboard" }
            </Link<Route>>
        </div>
    }
}
