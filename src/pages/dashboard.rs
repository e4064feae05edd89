use chrono::Utc;
use yew::prelude::*;
use yew_hooks::{use_async_with_options, UseAsyncOptions};

use crate::api::{expire_if_unauthorized, Api};
use crate::models::{sort_firmware_for_display, FirmwareType};
use crate::session::use_session;

#[function_component(DashboardPage)]
pub fn dashboard_page() -> Html {
    let session = use_session();
    let api = Api::from_session(&session);

    let devices = {
        let api = api.clone();
        use_async_with_options(
            async move { api.devices().await },
            UseAsyncOptions::enable_auto(),
        )
    };
    let profiles = {
        let api = api.clone();
        use_async_with_options(
            async move { api.profiles().await },
            UseAsyncOptions::enable_auto(),
        )
    };
    let firmware = {
        let api = api.clone();
        use_async_with_options(
            async move { api.firmware_versions().await },
            UseAsyncOptions::enable_auto(),
        )
    };

    {
        let session = session.clone();
        use_effect_with(
            (
                devices.error.clone(),
                profiles.error.clone(),
                firmware.error.clone(),
            ),
            move |(d, p, f)| {
                expire_if_unauthorized(&session, d);
                expire_if_unauthorized(&session, p);
                expire_if_unauthorized(&session, f);
            },
        );
    }

    let device_cards = if devices.loading {
        html! { <p class="text-muted">{ "Loading devices..." }</p> }
    } else if let Some(err) = &devices.error {
        html! { <div class="alert alert-danger">{ err.to_string() }</div> }
    } else if let Some(list) = &devices.data {
        let now = Utc::now();
        let online = list.iter().filter(|d| d.is_online(now)).count();
        html! {
            <div class="card-row">
                <div class="card stat-card">
                    <span class="stat-value">{ list.len() }</span>
                    <span class="stat-label">{ "Total devices" }</span>
                </div>
                <div class="card stat-card">
                    <span class="stat-value text-success">{ online }</span>
                    <span class="stat-label">{ "Online" }</span>
                </div>
                <div class="card stat-card">
                    <span class="stat-value text-muted">{ list.len() - online }</span>
                    <span class="stat-label">{ "Offline" }</span>
                </div>
            </div>
        }
    } else {
        Html::default()
    };

    let profile_card = if profiles.loading {
        html! { <p class="text-muted">{ "Loading profiles..." }</p> }
    } else if let Some(err) = &profiles.error {
        html! { <div class="alert alert-danger">{ err.to_string() }</div> }
    } else if let Some(list) = &profiles.data {
        html! {
            <div class="card stat-card">
                <span class="stat-value">{ list.len() }</span>
                <span class="stat-label">{ "Profiles" }</span>
            </div>
        }
    } else {
        Html::default()
    };

    let firmware_card = if firmware.loading {
        html! { <p class="text-muted">{ "Loading firmware..." }</p> }
    } else if let Some(err) = &firmware.error {
        html! { <div class="alert alert-danger">{ err.to_string() }</div> }
    } else if let Some(list) = &firmware.data {
        let mut sorted = list.clone();
        sort_firmware_for_display(&mut sorted);
        let latest_stable = sorted
            .iter()
            .find(|v| v.kind() == FirmwareType::Stable)
            .map(|v| v.firmware_version.clone());
        html! {
            <div class="card-row">
                <div class="card stat-card">
                    <span class="stat-value">{ list.len() }</span>
                    <span class="stat-label">{ "Firmware versions" }</span>
                </div>
                <div class="card stat-card">
                    <span class="stat-value">
                        { latest_stable.unwrap_or_else(|| "—".to_string()) }
                    </span>
                    <span class="stat-label">{ "Latest stable release" }</span>
                </div>
            </div>
        }
    } else {
        Html::default()
    };

    html! {
        <div class="page dashboard-page">
            <h2 class="page-title">{ "Dashboard" }</h2>
            <section class="dashboard-section">
                <h3>{ "Devices" }</h3>
                { device_cards }
            </section>
            <section class="dashboard-section">
                <h3>{ "Profiles" }</h3>
                { profile_card }
            </section>
            <section class="dashboard-section">
                <h3>{ "Firmware" }</h3>
                { firmware_card }
            </section>
        </div>
    }
}
