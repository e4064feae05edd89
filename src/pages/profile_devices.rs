use std::collections::{HashMap, HashSet};

use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;
use yew_hooks::{use_async_with_options, UseAsyncOptions};
use yew_router::prelude::*;

use crate::api::{expire_if_unauthorized, Api};
use crate::models::{FieldMap, MassConfigUpdate, ProfileDevice};
use crate::session::use_session;
use crate::Route;

fn matches_search(device: &ProfileDevice, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    needle.is_empty()
        || device.name.to_lowercase().contains(&needle)
        || device.device_id.to_lowercase().contains(&needle)
}

/// Header checkbox behavior: everything visible selected → clear, anything
/// else → select all visible rows.
fn toggle_all(selected: &HashSet<String>, visible: &[&ProfileDevice]) -> HashSet<String> {
    let all_selected =
        !visible.is_empty() && visible.iter().all(|d| selected.contains(&d.device_id));
    if all_selected {
        HashSet::new()
    } else {
        visible.iter().map(|d| d.device_id.clone()).collect()
    }
}

/// Blank inputs mean "keep the device's current value" and are dropped from
/// the payload.
fn mass_update(selected: &HashSet<String>, values: &HashMap<String, String>) -> MassConfigUpdate {
    let mut device_ids: Vec<String> = selected.iter().cloned().collect();
    device_ids.sort();
    MassConfigUpdate {
        device_ids,
        config_values: values
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

#[derive(Properties, PartialEq)]
pub struct ProfileDevicesProps {
    pub profile_id: String,
}

#[function_component(ProfileDevicesPage)]
pub fn profile_devices_page(props: &ProfileDevicesProps) -> Html {
    let session = use_session();
    let api = Api::from_session(&session);
    let profile_id = props.profile_id.clone();

    let profile = {
        let api = api.clone();
        let profile_id = profile_id.clone();
        use_async_with_options(
            async move { api.profile(&profile_id).await },
            UseAsyncOptions::enable_auto(),
        )
    };

    {
        let session = session.clone();
        use_effect_with(profile.error.clone(), move |error| {
            expire_if_unauthorized(&session, error);
        });
    }

    let search = use_state(String::new);
    let selected = use_state(HashSet::<String>::new);
    let show_config = use_state(|| false);
    let applied = use_state(|| None::<usize>);

    let retry = {
        let profile = profile.clone();
        Callback::from(move |_| profile.run())
    };

    if profile.loading && profile.data.is_none() {
        return html! { <p class="text-muted">{ "Loading profile..." }</p> };
    }
    if let Some(err) = &profile.error {
        return html! {
            <div class="alert alert-danger">
                { err.to_string() }
                <button class="btn btn-sm" onclick={retry}>{ "Retry" }</button>
            </div>
        };
    }
    let Some(data) = &profile.data else {
        return Html::default();
    };

    let configs = data.config_map();
    let visible: Vec<&ProfileDevice> = data
        .devices
        .iter()
        .filter(|d| matches_search(d, &search))
        .collect();
    let all_selected =
        !visible.is_empty() && visible.iter().all(|d| selected.contains(&d.device_id));

    let on_search = {
        let search = search.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            search.set(input.value());
        })
    };

    let on_toggle_all = {
        let selected = selected.clone();
        let visible_rows: Vec<ProfileDevice> = visible.iter().map(|d| (*d).clone()).collect();
        Callback::from(move |_| {
            let refs: Vec<&ProfileDevice> = visible_rows.iter().collect();
            selected.set(toggle_all(&selected, &refs));
        })
    };

    let open_config = {
        let show_config = show_config.clone();
        let selected = selected.clone();
        let applied = applied.clone();
        Callback::from(move |_| {
            if selected.is_empty() {
                return;
            }
            applied.set(None);
            show_config.set(true);
        })
    };

    let body = if data.devices.is_empty() {
        html! {
            <div class="empty-state">
                <p>{ "No devices use this profile yet." }</p>
                <Link<Route> to={Route::Devices} classes="btn btn-primary">
                    { "Add Device" }
                </Link<Route>>
            </div>
        }
    } else if visible.is_empty() {
        html! {
            <div class="empty-state">
                <p>{ "No devices match the search." }</p>
                <button class="btn" onclick={{
                    let search = search.clone();
                    Callback::from(move |_| search.set(String::new()))
                }}>{ "Clear Search" }</button>
            </div>
        }
    } else {
        let config_headers: Html = configs
            .iter()
            .map(|(_, label)| html! { <th>{ label.to_string() }</th> })
            .collect();
        let rows: Html = visible
            .iter()
            .map(|device| {
                let checked = selected.contains(&device.device_id);
                let on_toggle = {
                    let selected = selected.clone();
                    let id = device.device_id.clone();
                    Callback::from(move |_| {
                        let mut next = (*selected).clone();
                        if !next.remove(&id) {
                            next.insert(id.clone());
                        }
                        selected.set(next);
                    })
                };
                let on_configure_one = {
                    let selected = selected.clone();
                    let show_config = show_config.clone();
                    let applied = applied.clone();
                    let id = device.device_id.clone();
                    Callback::from(move |_| {
                        selected.set(HashSet::from([id.clone()]));
                        applied.set(None);
                        show_config.set(true);
                    })
                };
                let config_cells: Html = configs
                    .iter()
                    .map(|(key, _)| match device.config_value(key) {
                        Some(value) => html! { <td>{ value }</td> },
                        None => html! { <td class="cell-empty">{ "Not set" }</td> },
                    })
                    .collect();
                html! {
                    <tr key={device.device_id.clone()}>
                        <td>
                            <input type="checkbox" {checked} onchange={on_toggle} />
                        </td>
                        <td>{ &device.name }</td>
                        <td><code>{ &device.device_id }</code></td>
                        { config_cells }
                        <td>
                            <button class="btn btn-sm" onclick={on_configure_one}>
                                { "Configure" }
                            </button>
                        </td>
                    </tr>
                }
            })
            .collect();
        html! {
            <table class="table">
                <thead>
                    <tr>
                        <th>
                            <input type="checkbox" checked={all_selected} onchange={on_toggle_all} />
                        </th>
                        <th>{ "Device Name" }</th>
                        <th>{ "Device ID" }</th>
                        { config_headers }
                        <th></th>
                    </tr>
                </thead>
                <tbody>{ rows }</tbody>
            </table>
        }
    };

    html! {
        <div class="page profile-devices-page">
            <Link<Route> to={Route::Profiles} classes="btn btn-sm">
                { "← Back to profiles" }
            </Link<Route>>
            <div class="page-header">
                <div>
                    <h2 class="page-title">{ format!("{} Devices", data.name) }</h2>
                    if let Some(description) = &data.description {
                        <p class="text-muted">{ description }</p>
                    }
                </div>
                <div class="toolbar">
                    <span class="text-muted">
                        { format!("{} selected", selected.len()) }
                    </span>
                    <button class="btn btn-primary" disabled={selected.is_empty()}
                        onclick={open_config}>
                        { "Configure Selected" }
                    </button>
                </div>
            </div>
            <div class="card-row">
                <div class="card stat-card">
                    <span class="stat-value">{ data.devices.len() }</span>
                    <span class="stat-label">{ "Devices" }</span>
                </div>
                <div class="card stat-card">
                    <span class="stat-value">{ data.field_map().len() }</span>
                    <span class="stat-label">{ "Data fields" }</span>
                </div>
                <div class="card stat-card">
                    <span class="stat-value">{ configs.len() }</span>
                    <span class="stat-label">{ "Configurations" }</span>
                </div>
                <div class="card stat-card">
                    <span class="stat-value">{ data.metadata_map().len() }</span>
                    <span class="stat-label">{ "Metadata" }</span>
                </div>
            </div>
            if let Some(count) = *applied {
                <div class="alert alert-success">
                    { format!("Updated {count} devices successfully") }
                </div>
            }
            <div class="toolbar">
                <input class="form-control" placeholder="Search devices by name or ID..."
                    value={(*search).clone()} oninput={on_search} />
            </div>
            { body }
            if *show_config {
                <MassConfigDialog
                    api={api}
                    configs={configs.clone()}
                    selected_count={selected.len()}
                    update_base={mass_update(&selected, &HashMap::new())}
                    on_close={{
                        let show_config = show_config.clone();
                        Callback::from(move |_| show_config.set(false))
                    }}
                    on_applied={{
                        let show_config = show_config.clone();
                        let selected = selected.clone();
                        let applied = applied.clone();
                        let profile = profile.clone();
                        Callback::from(move |count: usize| {
                            show_config.set(false);
                            selected.set(HashSet::new());
                            applied.set(Some(count));
                            profile.run();
                        })
                    }}
                />
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct MassConfigDialogProps {
    api: Api,
    configs: FieldMap,
    selected_count: usize,
    /// Update carrying the target device ids; the dialog fills in the values.
    update_base: MassConfigUpdate,
    on_close: Callback<()>,
    on_applied: Callback<usize>,
}

#[function_component(MassConfigDialog)]
fn mass_config_dialog(props: &MassConfigDialogProps) -> Html {
    let values = use_state(HashMap::<String, String>::new);
    let error = use_state(|| None::<String>);
    let busy = use_state(|| false);

    let onsubmit = {
        let api = props.api.clone();
        let base = props.update_base.clone();
        let on_applied = props.on_applied.clone();
        let values = values.clone();
        let error = error.clone();
        let busy = busy.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *busy {
                return;
            }
            busy.set(true);
            error.set(None);

            let targets: HashSet<String> = base.device_ids.iter().cloned().collect();
            let update = mass_update(&targets, &values);
            let api = api.clone();
            let on_applied = on_applied.clone();
            let error = error.clone();
            let busy = busy.clone();
            spawn_local(async move {
                match api.mass_edit_config(&update).await {
                    Ok(report) => on_applied.emit(report.results.success.len()),
                    Err(err) => {
                        error.set(Some(err.to_string()));
                        busy.set(false);
                    }
                }
            });
        })
    };

    let on_cancel = {
        let on_close = props.on_close.clone();
        Callback::from(move |_| on_close.emit(()))
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
                    <input class="form-control"
                        placeholder={format!("Enter value for {label}...")}
                        {value} {oninput} />
                </div>
            }
        })
        .collect();

    html! {
        <div class="dialog-backdrop">
            <div class="dialog dialog-wide">
                <h3>{ "Configure Devices" }</h3>
                <p class="text-muted">
                    { format!(
                        "Update configuration for {} selected {}. Leave fields empty to keep current values.",
                        props.selected_count,
                        if props.selected_count == 1 { "device" } else { "devices" },
                    ) }
                </p>
                <form {onsubmit}>
                    if let Some(message) = (*error).clone() {
                        <div class="alert alert-danger">{ message }</div>
                    }
                    { inputs }
                    <div class="dialog-actions">
                        <button type="button" class="btn" onclick={on_cancel}>{ "Cancel" }</button>
                        <button type="submit" class="btn btn-primary" disabled={*busy}>
                            { if *busy { "Updating..." } else { "Apply Configuration" } }
                        </button>
                    </div>
                </form>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device(name: &str, id: &str, config1: Option<&str>) -> ProfileDevice {
        ProfileDevice {
            name: name.to_string(),
            device_id: id.to_string(),
            recent_config: config1
                .map(|v| serde_json::from_value(json!({ "config1": v })).unwrap()),
        }
    }

    #[test]
    fn search_matches_name_or_id_case_insensitive() {
        let d = device("Boiler Sensor", "DEV-42", None);
        assert!(matches_search(&d, "boiler"));
        assert!(matches_search(&d, "dev-42"));
        assert!(matches_search(&d, ""));
        assert!(!matches_search(&d, "turbine"));
    }

    #[test]
    fn toggle_all_selects_then_clears() {
        let a = device("a", "1", None);
        let b = device("b", "2", None);
        let visible = vec![&a, &b];

        let selected = toggle_all(&HashSet::new(), &visible);
        assert_eq!(selected.len(), 2);
        assert!(selected.contains("1") && selected.contains("2"));

        assert!(toggle_all(&selected, &visible).is_empty());

        // partial selection selects everything rather than clearing
        let partial = HashSet::from(["1".to_string()]);
        assert_eq!(toggle_all(&partial, &visible).len(), 2);
    }

    #[test]
    fn toggle_all_on_empty_list_selects_nothing() {
        assert!(toggle_all(&HashSet::new(), &[]).is_empty());
    }

    #[test]
    fn mass_update_drops_blank_values_and_orders_ids() {
        let selected = HashSet::from(["b".to_string(), "a".to_string()]);
        let values = HashMap::from([
            ("config1".to_string(), "30".to_string()),
            ("config2".to_string(), "  ".to_string()),
            ("config3".to_string(), String::new()),
        ]);
        let update = mass_update(&selected, &values);
        assert_eq!(update.device_ids, ["a", "b"]);
        assert_eq!(update.config_values.len(), 1);
        assert_eq!(update.config_values["config1"], "30");
    }

    #[test]
    fn mass_update_serializes_expected_shape() {
        let update = mass_update(
            &HashSet::from(["d1".to_string()]),
            &HashMap::from([("config1".to_string(), "5".to_string())]),
        );
        let wire = serde_json::to_value(&update).unwrap();
        assert_eq!(wire["device_ids"], json!(["d1"]));
        assert_eq!(wire["config_values"]["config1"], "5");
    }

    #[test]
    fn config_value_reads_recent_config() {
        let d = device("a", "1", Some("42"));
        assert_eq!(d.config_value("config1").as_deref(), Some("42"));
        assert_eq!(d.config_value("config2"), None);
        assert_eq!(device("b", "2", None).config_value("config1"), None);
    }
}
