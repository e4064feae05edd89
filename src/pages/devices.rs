use std::collections::BTreeSet;

use chrono::Utc;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;
use yew_hooks::{use_async, use_async_with_options, UseAsyncOptions};
use yew_router::prelude::*;

use crate::api::{expire_if_unauthorized, Api, ApiError};
use crate::models::{
    format_last_active, sort_firmware_for_display, Device, FirmwareUpdateRequest, FirmwareVersion,
    NewDevice,
};
use crate::session::use_session;
use crate::Route;

fn input_value(e: &InputEvent) -> String {
    let input: HtmlInputElement = e.target_unchecked_into();
    input.value()
}

fn select_value(e: &Event) -> String {
    let select: HtmlSelectElement = e.target_unchecked_into();
    select.value()
}

/// Distinguishes "no devices exist yet" (call-to-action) from "the filters
/// hide everything".
fn empty_notice(total: usize, visible: usize) -> Option<&'static str> {
    match (total, visible) {
        (0, _) => Some("No devices yet."),
        (_, 0) => Some("No devices match the current filters."),
        _ => None,
    }
}

/// Client-side list filters. "all" disables a dimension.
#[derive(Clone, PartialEq, Default)]
struct DeviceFilters {
    status: String,
    profile: String,
    firmware_state: String,
}

impl DeviceFilters {
    fn matches(&self, device: &Device, now: chrono::DateTime<Utc>) -> bool {
        let status_ok = match self.status.as_str() {
            "online" => device.is_online(now),
            "offline" => !device.is_online(now),
            _ => true,
        };
        let profile_ok = match self.profile.as_str() {
            "" | "all" => true,
            wanted => device.profile_name.as_deref() == Some(wanted),
        };
        let state_ok = match self.firmware_state.as_str() {
            "" | "all" => true,
            wanted => device.firmware_download_state.as_deref() == Some(wanted),
        };
        status_ok && profile_ok && state_ok
    }
}

#[function_component(DevicesPage)]
pub fn devices_page() -> Html {
    let session = use_session();
    let api = Api::from_session(&session);

    let devices = {
        let api = api.clone();
        use_async_with_options(
            async move { api.devices().await },
            UseAsyncOptions::enable_auto(),
        )
    };
    // Fetched on demand when one of the dialogs opens.
    let profiles = {
        let api = api.clone();
        use_async(async move { api.profiles().await })
    };
    let firmware = {
        let api = api.clone();
        use_async(async move {
            let mut versions = api.firmware_versions().await?;
            sort_firmware_for_display(&mut versions);
            Ok::<_, ApiError>(versions)
        })
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

    let filters = use_state(DeviceFilters::default);
    let show_add = use_state(|| false);
    // Device currently targeted by the firmware update dialog.
    let update_target = use_state(|| None::<Device>);

    let set_filter = |field: fn(&mut DeviceFilters, String)| {
        let filters = filters.clone();
        Callback::from(move |e: Event| {
            let mut next = (*filters).clone();
            field(&mut next, select_value(&e));
            filters.set(next);
        })
    };
    let on_status = set_filter(|f, v| f.status = v);
    let on_profile = set_filter(|f, v| f.profile = v);
    let on_state = set_filter(|f, v| f.firmware_state = v);

    let open_add = {
        let show_add = show_add.clone();
        let profiles = profiles.clone();
        let firmware = firmware.clone();
        Callback::from(move |_| {
            profiles.run();
            firmware.run();
            show_add.set(true);
        })
    };

    let retry = {
        let devices = devices.clone();
        Callback::from(move |_| devices.run())
    };

    let body = if devices.loading && devices.data.is_none() {
        html! { <p class="text-muted">{ "Loading devices..." }</p> }
    } else if let Some(err) = &devices.error {
        html! {
            <div class="alert alert-danger">
                { err.to_string() }
                <button class="btn btn-sm" onclick={retry}>{ "Retry" }</button>
            </div>
        }
    } else if devices.data.as_ref().is_some_and(|list| list.is_empty()) {
        html! {
            <div class="empty-state">
                <p>{ empty_notice(0, 0).unwrap_or_default() }</p>
                <button class="btn btn-primary" onclick={open_add.clone()}>
                    { "Add Device" }
                </button>
            </div>
        }
    } else if let Some(list) = &devices.data {
        let now = Utc::now();
        let visible: Vec<&Device> = list.iter().filter(|d| filters.matches(d, now)).collect();

        let profile_names: BTreeSet<&str> = list
            .iter()
            .filter_map(|d| d.profile_name.as_deref())
            .collect();
        let state_names: BTreeSet<&str> = list
            .iter()
            .filter_map(|d| d.firmware_download_state.as_deref())
            .collect();

        let rows: Html = visible
            .iter()
            .map(|device| {
                let online = device.is_online(now);
                let on_update = {
                    let update_target = update_target.clone();
                    let firmware = firmware.clone();
                    let device = (*device).clone();
                    Callback::from(move |_| {
                        firmware.run();
                        update_target.set(Some(device.clone()));
                    })
                };
                html! {
                    <tr key={device.id.clone()}>
                        <td>
                            <span class={if online { "status-dot online" } else { "status-dot offline" }} />
                            { if online { "Online" } else { "Offline" } }
                        </td>
                        <td>
                            <Link<Route> to={Route::DeviceDetail { device_id: device.device_id }}>
                                { &device.name }
                            </Link<Route>>
                        </td>
                        <td>{ device.device_id }</td>
                        <td>{ device.profile_name.clone().unwrap_or_else(|| "—".to_string()) }</td>
                        <td>{ device.current_firmware_version.clone().unwrap_or_else(|| "—".to_string()) }</td>
                        <td>{ device.firmware_download_state.clone().unwrap_or_else(|| "—".to_string()) }</td>
                        <td>{ format_last_active(device.last_posted_time.as_deref(), now) }</td>
                        <td>
                            <button class="btn btn-sm" onclick={on_update}>{ "Update Firmware" }</button>
                        </td>
                    </tr>
                }
            })
            .collect();

        html! {
            <>
                <div class="toolbar">
                    <select class="form-control" onchange={on_status}>
                        <option value="all" selected={filters.status.is_empty() || filters.status == "all"}>{ "All statuses" }</option>
                        <option value="online" selected={filters.status == "online"}>{ "Online" }</option>
                        <option value="offline" selected={filters.status == "offline"}>{ "Offline" }</option>
                    </select>
                    <select class="form-control" onchange={on_profile}>
                        <option value="all">{ "All profiles" }</option>
                        { for profile_names.iter().map(|name| html! {
                            <option value={name.to_string()} selected={filters.profile == *name}>{ *name }</option>
                        }) }
                    </select>
                    <select class="form-control" onchange={on_state}>
                        <option value="all">{ "All firmware states" }</option>
                        { for state_names.iter().map(|name| html! {
                            <option value={name.to_string()} selected={filters.firmware_state == *name}>{ *name }</option>
                        }) }
                    </select>
                </div>
                if let Some(notice) = empty_notice(list.len(), visible.len()) {
                    <p class="text-muted">{ notice }</p>
                } else {
                    <table class="table">
                        <thead>
                            <tr>
                                <th>{ "Status" }</th>
                                <th>{ "Name" }</th>
                                <th>{ "Device ID" }</th>
                                <th>{ "Profile" }</th>
                                <th>{ "Firmware" }</th>
                                <th>{ "Firmware State" }</th>
                                <th>{ "Last Active" }</th>
                                <th></th>
                            </tr>
                        </thead>
                        <tbody>{ rows }</tbody>
                    </table>
                }
            </>
        }
    } else {
        Html::default()
    };

    html! {
        <div class="page devices-page">
            <div class="page-header">
                <h2 class="page-title">{ "Devices" }</h2>
                <button class="btn btn-primary" onclick={open_add}>{ "Add Device" }</button>
            </div>
            { body }
            if *show_add {
                <AddDeviceDialog
                    api={api.clone()}
                    profiles={profiles.data.clone().unwrap_or_default()}
                    firmware={firmware.data.clone().unwrap_or_default()}
                    on_close={{
                        let show_add = show_add.clone();
                        Callback::from(move |_| show_add.set(false))
                    }}
                    on_created={{
                        let show_add = show_add.clone();
                        let devices = devices.clone();
                        Callback::from(move |_| {
                            show_add.set(false);
                            devices.run();
                        })
                    }}
                />
            }
            if let Some(device) = (*update_target).clone() {
                <UpdateFirmwareDialog
                    api={api}
                    device={device}
                    firmware={firmware.data.clone().unwrap_or_default()}
                    on_close={{
                        let update_target = update_target.clone();
                        Callback::from(move |_| update_target.set(None))
                    }}
                    on_updated={{
                        let update_target = update_target.clone();
                        let devices = devices.clone();
                        Callback::from(move |_| {
                            update_target.set(None);
                            devices.run();
                        })
                    }}
                />
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct AddDeviceProps {
    api: Api,
    profiles: Vec<crate::models::Profile>,
    firmware: Vec<FirmwareVersion>,
    on_close: Callback<()>,
    on_created: Callback<()>,
}

#[function_component(AddDeviceDialog)]
fn add_device_dialog(props: &AddDeviceProps) -> Html {
    let name = use_state(String::new);
    let network_id = use_state(String::new);
    let profile_id = use_state(String::new);
    let firmware_version = use_state(String::new);
    let error = use_state(|| None::<String>);
    let busy = use_state(|| false);

    let onsubmit = {
        let api = props.api.clone();
        let on_created = props.on_created.clone();
        let name = name.clone();
        let network_id = network_id.clone();
        let profile_id = profile_id.clone();
        let firmware_version = firmware_version.clone();
        let error = error.clone();
        let busy = busy.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *busy {
                return;
            }
            if name.is_empty() || profile_id.is_empty() {
                error.set(Some("Please fill in all required fields".to_string()));
                return;
            }
            busy.set(true);
            error.set(None);

            let device = NewDevice::new(
                (*name).clone(),
                Some((*network_id).clone()).filter(|v| !v.is_empty()),
                (*profile_id).clone(),
                Some((*firmware_version).clone()).filter(|v| !v.is_empty()),
            );
            let api = api.clone();
            let on_created = on_created.clone();
            let error = error.clone();
            let busy = busy.clone();
            spawn_local(async move {
                match api.create_device(&device).await {
                    Ok(_) => on_created.emit(()),
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

    html! {
        <div class="dialog-backdrop">
            <div class="dialog">
                <h3>{ "Add Device" }</h3>
                <form {onsubmit}>
                    if let Some(message) = (*error).clone() {
                        <div class="alert alert-danger">{ message }</div>
                    }
                    <label>{ "Name" }</label>
                    <input class="form-control" value={(*name).clone()}
                        oninput={{
                            let name = name.clone();
                            Callback::from(move |e: InputEvent| name.set(input_value(&e)))
                        }} />
                    <label>{ "Network ID" }</label>
                    <input class="form-control" value={(*network_id).clone()}
                        oninput={{
                            let network_id = network_id.clone();
                            Callback::from(move |e: InputEvent| network_id.set(input_value(&e)))
                        }} />
                    <label>{ "Profile" }</label>
                    <select class="form-control" onchange={{
                        let profile_id = profile_id.clone();
                        Callback::from(move |e: Event| profile_id.set(select_value(&e)))
                    }}>
                        <option value="" selected={profile_id.is_empty()}>{ "Select a profile" }</option>
                        { for props.profiles.iter().map(|p| html! {
                            <option value={p.id.clone()} selected={*profile_id == p.id}>{ &p.name }</option>
                        }) }
                    </select>
                    <label>{ "Initial firmware" }</label>
                    <select class="form-control" onchange={{
                        let firmware_version = firmware_version.clone();
                        Callback::from(move |e: Event| firmware_version.set(select_value(&e)))
                    }}>
                        <option value="" selected={firmware_version.is_empty()}>{ "None" }</option>
                        { for props.firmware.iter().map(|v| html! {
                            <option value={v.firmware_version.clone()}
                                selected={*firmware_version == v.firmware_version}>
                                { format!("{} ({})", v.firmware_version, v.kind().label()) }
                            </option>
                        }) }
                    </select>
                    <div class="dialog-actions">
                        <button type="button" class="btn" onclick={on_cancel}>{ "Cancel" }</button>
                        <button type="submit" class="btn btn-primary" disabled={*busy}>
                            { if *busy { "Creating..." } else { "Create" } }
                        </button>
                    </div>
                </form>
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct UpdateFirmwareProps {
    api: Api,
    device: Device,
    firmware: Vec<FirmwareVersion>,
    on_close: Callback<()>,
    on_updated: Callback<()>,
}

#[function_component(UpdateFirmwareDialog)]
fn update_firmware_dialog(props: &UpdateFirmwareProps) -> Html {
    let selected_id = use_state(String::new);
    let error = use_state(|| None::<String>);
    let busy = use_state(|| false);

    let onsubmit = {
        let api = props.api.clone();
        let firmware = props.firmware.clone();
        let device_id = props.device.device_id;
        let on_updated = props.on_updated.clone();
        let selected_id = selected_id.clone();
        let error = error.clone();
        let busy = busy.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *busy {
                return;
            }
            let Some(version) = firmware.iter().find(|v| v.id == **selected_id) else {
                error.set(Some("Please select a firmware version".to_string()));
                return;
            };
            busy.set(true);
            error.set(None);

            let request = FirmwareUpdateRequest {
                firmware_id: version.id.clone(),
                firmware_version: version.firmware_version.clone(),
            };
            let api = api.clone();
            let on_updated = on_updated.clone();
            let error = error.clone();
            let busy = busy.clone();
            spawn_local(async move {
                match api.update_device_firmware(device_id, &request).await {
                    Ok(_) => on_updated.emit(()),
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

    html! {
        <div class="dialog-backdrop">
            <div class="dialog">
                <h3>{ format!("Update firmware on {}", props.device.name) }</h3>
                <p class="text-muted">
                    { format!(
                        "Current version: {}",
                        props.device.current_firmware_version.as_deref().unwrap_or("—"),
                    ) }
                </p>
                <form {onsubmit}>
                    if let Some(message) = (*error).clone() {
                        <div class="alert alert-danger">{ message }</div>
                    }
                    <label>{ "Target version" }</label>
                    <select class="form-control" onchange={{
                        let selected_id = selected_id.clone();
                        Callback::from(move |e: Event| selected_id.set(select_value(&e)))
                    }}>
                        <option value="" selected={selected_id.is_empty()}>{ "Select a version" }</option>
                        { for props.firmware.iter().map(|v| html! {
                            <option value={v.id.clone()} selected={*selected_id == v.id}>
                                { format!("{} ({})", v.firmware_version, v.kind().label()) }
                            </option>
                        }) }
                    </select>
                    <div class="dialog-actions">
                        <button type="button" class="btn" onclick={on_cancel}>{ "Cancel" }</button>
                        <button type="submit" class="btn btn-primary" disabled={*busy}>
                            { if *busy { "Updating..." } else { "Update" } }
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
    use chrono::Duration;
    use serde_json::json;

    fn device(profile: Option<&str>, state: Option<&str>, minutes_ago: Option<i64>) -> Device {
        let last = minutes_ago.map(|m| (Utc::now() - Duration::minutes(m)).to_rfc3339());
        serde_json::from_value(json!({
            "id": "d-1",
            "name": "boiler",
            "deviceID": 1,
            "profile_name": profile,
            "firmwareDownloadState": state,
            "last_posted_time": last,
        }))
        .unwrap()
    }

    fn filters(status: &str, profile: &str, state: &str) -> DeviceFilters {
        DeviceFilters {
            status: status.to_string(),
            profile: profile.to_string(),
            firmware_state: state.to_string(),
        }
    }

    #[test]
    fn empty_notice_distinguishes_no_devices_from_filtered_out() {
        assert_eq!(empty_notice(0, 0), Some("No devices yet."));
        assert_eq!(empty_notice(3, 0), Some("No devices match the current filters."));
        assert_eq!(empty_notice(3, 2), None);
    }

    #[test]
    fn status_filter_splits_on_online_state() {
        let now = Utc::now();
        let online = device(None, None, Some(5));
        let offline = device(None, None, None);

        assert!(filters("online", "all", "all").matches(&online, now));
        assert!(!filters("online", "all", "all").matches(&offline, now));
        assert!(filters("offline", "all", "all").matches(&offline, now));
        assert!(filters("all", "all", "all").matches(&offline, now));
    }

    #[test]
    fn profile_and_state_filters_match_exactly() {
        let now = Utc::now();
        let d = device(Some("Boiler"), Some("updated"), Some(5));

        assert!(filters("all", "Boiler", "all").matches(&d, now));
        assert!(!filters("all", "Turbine", "all").matches(&d, now));
        assert!(filters("all", "all", "updated").matches(&d, now));
        assert!(!filters("all", "all", "pending").matches(&d, now));
        assert!(!filters("all", "Boiler", "pending").matches(&d, now));
    }
}
