use yew::prelude::*;

use crate::components::header::Header;
use crate::components::sidebar::Sidebar;

#[derive(Properties, PartialEq)]
pub struct LayoutProps {
    pub children: Html,
}

/// App shell around every protected page: sidebar navigation, header with
/// the user menu, content area.
#[function_component(Layout)]
pub fn layout(props: &LayoutProps) -> Html {
    html! {
        <div class="app-shell">
            <Sidebar />
            <div class="app-main">
                <Header />
                <main class="app-content">
                    { props.children.clone() }
                </main>
            </div>
        </div>
    }
}
