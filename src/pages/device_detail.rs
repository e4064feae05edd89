use std::collections::HashMap;

use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;
use yew_hooks::{use_async_with_options, UseAsyncOptions};

use crate::api::{expire_if_unauthorized, Api};
use crate::components::data_table::DataTable;
use crate::components::graphs::DeviceDataGraphs;
use crate::models::{ConfigUpdate, DataEntry, DeviceDetail, FieldMap};
use crate::session::use_session;

#[derive(Properties, PartialEq)]
pub struct DeviceDetailProps {
    pub device_id: i64,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tab {
    SensorData,
    Metadata,
    Configuration,
}

#[function_component(DeviceDetailPage)]
pub fn device_detail_page(props: &DeviceDetailProps) -> Html {
    let session = use_session();
    let api = Api::from_session(&session);
    let device_id = props.device_id;

    let detail = {
        let api = api.clone();
        use_async_with_options(
            async move { api.device(device_id).await },
            UseAsyncOptions::enable_auto(),
        )
    };

    {
        let session = session.clone();
        use_effect_with(detail.error.clone(), move |error| {
            expire_if_unauthorized(&session, error);
        });
    }

    let tab = use_state(|| Tab::SensorData);

    let retry = {
        let detail = detail.clone();
        Callback::from(move |_| detail.run())
    };

    if detail.loading && detail.data.is_none() {
        return html! { <p class="text-muted">{ "Loading device..." }</p> };
    }
    if let Some(err) = &detail.error {
        return html! {
            <div class="alert alert-danger">
                { err.to_string() }
                <button class="btn btn-sm" onclick={retry}>{ "Retry" }</button>
            </div>
        };
    }
    let Some(device) = &detail.data else {
        return Html::default();
    };

    let tab_button = |target: Tab, label: &str| {
        let tab = tab.clone();
        let class = if *tab == target { "tab active" } else { "tab" };
        let onclick = Callback::from(move |_| tab.set(target));
        html! { <button {class} {onclick}>{ label.to_string() }</button> }
    };

    let tab_body = match *tab {
        Tab::SensorData => html! {
            <DeviceDataGraphs
                entries={device.device_data.clone()}
                fields={device.profile.field_map()} />
        },
        Tab::Metadata => html! {
            <DataTable
                entries={device.meta_data.clone()}
                fields={device.profile.metadata_map()} />
        },
        Tab::Configuration => html! {
            <>
                <ConfigForm
                    api={api.clone()}
                    device_id={device_id}
                    configs={device.profile.config_map()}
                    current={device.config_data.clone()}
                    on_saved={{
                        let detail = detail.clone();
                        Callback::from(move |_| detail.run())
                    }} />
                <DataTable
                    entries={device.config_data.clone()}
                    fields={device.profile.config_map()} />
            </>
        },
    };

    html! {
        <div class="page device-detail-page">
            <div class="page-header">
                <h2 class="page-title">{ &device.name }</h2>
                if let Some(target) = device.pending_firmware() {
                    <span class="badge badge-pending">
                        { format!("Update to {target} pending") }
                    </span>
                }
            </div>
            { summary_cards(device) }
            <div class="tabs">
                { tab_button(Tab::SensorData, "Sensor Data") }
                { tab_button(Tab::Metadata, "Metadata") }
                { tab_button(Tab::Configuration, "Configuration") }
            </div>
            <div class="tab-content">{ tab_body }</div>
        </div>
    }
}

fn summary_cards(device: &DeviceDetail) -> Html {
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "—".to_string());
    html! {
        <div class="card-row">
            <div class="card">
                <span class="stat-label">{ "Device ID" }</span>
                <span class="stat-value">{ device.device_id }</span>
            </div>
            <div class="card">
                <span class="stat-label">{ "Network ID" }</span>
                <span class="stat-value">{ text(&device.network_id) }</span>
            </div>
            <div class="card">
                <span class="stat-label">{ "Firmware" }</span>
                <span class="stat-value">{ text(&device.current_firmware_version) }</span>
                <span class="text-muted">
                    { format!("previous: {}", text(&device.previous_firmware_version)) }
                </span>
            </div>
            <div class="card">
                <span class="stat-label">{ "Read key" }</span>
                <code>{ &device.readkey }</code>
                <span class="stat-label">{ "Write key" }</span>
                <code>{ &device.writekey }</code>
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct ConfigFormProps {
    api: Api,
    device_id: i64,
    configs: FieldMap,
    current: Vec<DataEntry>,
    on_saved: Callback<()>,
}

fn initial_values(configs: &FieldMap, current: &[DataEntry]) -> HashMap<String, String> {
    // the first entry is the newest reported configuration
    let latest = current.first();
    configs
        .iter()
        .map(|(key, _)| {
            let value = latest.and_then(|e| e.display(key)).unwrap_or_default();
            (key.to_string(), value)
        })
        .collect()
}

/// Edit form for the profile-defined config keys. Submitting queues the new
/// configuration on the backend; the device picks it up on its next poll.
#[function_component(ConfigForm)]
fn config_form(props: &ConfigFormProps) -> Html {
    let values = use_state(|| initial_values(&props.configs, &props.current));
    let error = use_state(|| None::<String>);
    let saved = use_state(|| false);
    let busy = use_state(|| false);

    {
        let values = values.clone();
        use_effect_with(
            (props.configs.clone(), props.current.clone()),
            move |(configs, current)| {
                values.set(initial_values(configs, current));
            },
        );
    }

    if props.configs.is_empty() {
        return html! {
            <p class="text-muted">{ "This profile defines no configuration keys." }</p>
        };
    }

    let onsubmit = {
        let api = props.api.clone();
        let device_id = props.device_id;
        let on_saved = props.on_saved.clone();
        let values = values.clone();
        let error = error.clone();
        let saved = saved.clone();
        let busy = busy.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *busy {
                return;
            }
            busy.set(true);
            error.set(None);
            saved.set(false);

            let update = ConfigUpdate {
                device_id,
                configs: (*values).clone(),
            };
            let api = api.clone();
            let on_saved = on_saved.clone();
            let error = error.clone();
            let saved = saved.clone();
            let busy = busy.clone();
            spawn_local(async move {
                match api.update_config(&update).await {
                    Ok(_) => {
                        saved.set(true);
                        busy.set(false);
                        on_saved.emit(());
                    }
                    Err(err) => {
                        error.set(Some(err.to_string()));
                        busy.set(false);
                    }
                }
            });
        })
    };

    let inputs: Html = props
        .configs
        .iter()
        .map(|(key, label)| {
            let value = values.get(key).cloned().unwrap_or_default();
            let oninput = {
                let key = key.to_string();
                let values = values.clone();
                Callback::from(move |e: InputEvent| {
                    let input: HtmlInputElement = e.target_unchecked_into();
                    let mut next = (*values).clone();
                    next.insert(key.clone(), input.value());
                    values.set(next);
                })
            };
            html! {
                <div class="form-group">
                    <label>{ label.to_string() }</label>
                    <input class="form-control" {value} {oninput} />
                </div>
            }
        })
        .collect();

    html! {
        <form class="config-form" {onsubmit}>
            if let Some(message) = (*error).clone() {
                <div class="alert alert-danger">{ message }</div>
            }
            if *saved {
                <div class="alert alert-success">{ "Configuration update queued" }</div>
            }
            { inputs }
            <button type="submit" class="btn btn-primary" disabled={*busy}>
                { if *busy { "Saving..." } else { "Save configuration" } }
            </button>
        </form>
    }
}
