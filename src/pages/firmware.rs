use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement};
use yew::prelude::*;
use yew_hooks::{use_async_with_options, UseAsyncOptions};

use crate::api::{expire_if_unauthorized, Api, ApiError, FirmwareUpload};
use crate::models::{sort_firmware_for_display, FirmwareType, FirmwareVersion};
use crate::session::use_session;
use crate::utils::format_timestamp;

const TYPE_CHOICES: [FirmwareType; 4] = [
    FirmwareType::Stable,
    FirmwareType::Beta,
    FirmwareType::Legacy,
    FirmwareType::Deprecated,
];

#[function_component(FirmwarePage)]
pub fn firmware_page() -> Html {
    let session = use_session();
    let api = Api::from_session(&session);

    let firmware = {
        let api = api.clone();
        use_async_with_options(
            async move {
                let mut versions = api.firmware_versions().await?;
                sort_firmware_for_display(&mut versions);
                Ok::<_, ApiError>(versions)
            },
            UseAsyncOptions::enable_auto(),
        )
    };

    {
        let session = session.clone();
        use_effect_with(firmware.error.clone(), move |error| {
            expire_if_unauthorized(&session, error);
        });
    }

    let show_upload = use_state(|| false);

    let retry = {
        let firmware = firmware.clone();
        Callback::from(move |_| firmware.run())
    };

    let body = if firmware.loading && firmware.data.is_none() {
        html! { <p class="text-muted">{ "Loading firmware..." }</p> }
    } else if let Some(err) = &firmware.error {
        html! {
            <div class="alert alert-danger">
                { err.to_string() }
                <button class="btn btn-sm" onclick={retry}>{ "Retry" }</button>
            </div>
        }
    } else if let Some(list) = &firmware.data {
        if list.is_empty() {
            html! { <p class="text-muted">{ "No firmware uploaded yet." }</p> }
        } else {
            list.iter()
                .map(|version| {
                    html! {
                        <FirmwareCard
                            key={version.id.clone()}
                            api={api.clone()}
                            version={version.clone()}
                            on_changed={{
                                let firmware = firmware.clone();
                                Callback::from(move |_| firmware.run())
                            }} />
                    }
                })
                .collect::<Html>()
        }
    } else {
        Html::default()
    };

    html! {
        <div class="page firmware-page">
            <div class="page-header">
                <h2 class="page-title">{ "Firmware" }</h2>
                <button class="btn btn-primary" onclick={{
                    let show_upload = show_upload.clone();
                    Callback::from(move |_| show_upload.set(true))
                }}>{ "Upload Firmware" }</button>
            </div>
            { body }
            if *show_upload {
                <UploadFirmwareDialog
                    api={api}
                    on_close={{
                        let show_upload = show_upload.clone();
                        Callback::from(move |_| show_upload.set(false))
                    }}
                    on_uploaded={{
                        let show_upload = show_upload.clone();
                        let firmware = firmware.clone();
                        Callback::from(move |_| {
                            show_upload.set(false);
                            firmware.run();
                        })
                    }}
                />
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct FirmwareCardProps {
    api: Api,
    version: FirmwareVersion,
    on_changed: Callback<()>,
}

#[function_component(FirmwareCard)]
fn firmware_card(props: &FirmwareCardProps) -> Html {
    let version = &props.version;
    let kind = version.kind();
    let error = use_state(|| None::<String>);
    let show_details = use_state(|| false);

    // resolved on demand so the details reflect the stored record, not the
    // possibly stale list row
    let details = {
        let api = props.api.clone();
        let id = version.id.clone();
        yew_hooks::use_async(async move { api.firmware(&id).await })
    };

    let on_details = {
        let show_details = show_details.clone();
        let details = details.clone();
        Callback::from(move |_| {
            if *show_details {
                show_details.set(false);
            } else {
                details.run();
                show_details.set(true);
            }
        })
    };

    let on_type_change = {
        let api = props.api.clone();
        let firmware_id = version.id.clone();
        let on_changed = props.on_changed.clone();
        let error = error.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            let api = api.clone();
            let firmware_id = firmware_id.clone();
            let firmware_type = select.value();
            let on_changed = on_changed.clone();
            let error = error.clone();
            spawn_local(async move {
                match api.update_firmware_type(&firmware_id, &firmware_type).await {
                    Ok(_) => on_changed.emit(()),
                    Err(err) => error.set(Some(err.to_string())),
                }
            });
        })
    };

    let changelog = version.changelog();
    let download = |artifact: &str, present: bool, label: &str| {
        if present {
            html! {
                <a class="btn btn-sm"
                    href={Api::firmware_download_url(&version.id, artifact)}
                    download="">
                    { label.to_string() }
                </a>
            }
        } else {
            Html::default()
        }
    };

    html! {
        <div class="panel firmware-panel">
            <div class="panel-heading">
                <h3 class="panel-title">{ &version.firmware_version }</h3>
                <span class={kind.badge_class()}>{ kind.label() }</span>
                if let Some(created) = &version.created_at {
                    <span class="text-muted">{ format_timestamp(created) }</span>
                }
            </div>
            <div class="panel-body">
                if let Some(message) = (*error).clone() {
                    <div class="alert alert-danger">{ message }</div>
                }
                if let Some(description) = &version.description {
                    <p>{ description }</p>
                }
                if !changelog.is_empty() {
                    <ul class="changelog">
                        { for changelog.iter().map(|line| html! { <li>{ line.to_string() }</li> }) }
                    </ul>
                }
                <div class="firmware-actions">
                    { download("firmware_file", version.firmware_string.is_some(), "Binary") }
                    { download("firmware_hex", version.firmware_string_hex.is_some(), "Hex") }
                    { download(
                        "firmware_bootloader",
                        version.firmware_string_bootloader.is_some(),
                        "Bootloader",
                    ) }
                    <select class="form-control form-inline" onchange={on_type_change}>
                        { for TYPE_CHOICES.iter().map(|choice| html! {
                            <option value={choice.label().to_lowercase()}
                                selected={*choice == kind}>
                                { choice.label() }
                            </option>
                        }) }
                    </select>
                    <button class="btn btn-sm" onclick={on_details}>
                        { if *show_details { "Hide details" } else { "Details" } }
                    </button>
                </div>
                if *show_details {
                    if details.loading {
                        <p class="text-muted">{ "Loading details..." }</p>
                    } else if let Some(err) = &details.error {
                        <div class="alert alert-danger">{ err.to_string() }</div>
                    } else if let Some(full) = &details.data {
                        <dl class="firmware-details">
                            <dt>{ "Version" }</dt>
                            <dd>{ &full.firmware_version }</dd>
                            <dt>{ "Type" }</dt>
                            <dd>{ full.kind().label() }</dd>
                            <dt>{ "Binary" }</dt>
                            <dd>{ full.firmware_string.clone().unwrap_or_else(|| "—".to_string()) }</dd>
                            <dt>{ "Hex" }</dt>
                            <dd>{ full.firmware_string_hex.clone().unwrap_or_else(|| "—".to_string()) }</dd>
                            <dt>{ "Bootloader" }</dt>
                            <dd>{ full.firmware_string_bootloader.clone().unwrap_or_else(|| "—".to_string()) }</dd>
                            if let Some(updated) = &full.updated_at {
                                <dt>{ "Updated" }</dt>
                                <dd>{ format_timestamp(updated) }</dd>
                            }
                        </dl>
                    }
                }
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct UploadFirmwareProps {
    api: Api,
    on_close: Callback<()>,
    on_uploaded: Callback<()>,
}

async fn read_file_bytes(file: &web_sys::File) -> Result<Vec<u8>, String> {
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|_| "could not read the selected file".to_string())?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

#[function_component(UploadFirmwareDialog)]
fn upload_firmware_dialog(props: &UploadFirmwareProps) -> Html {
    let file = use_state(|| None::<web_sys::File>);
    let firmware_version = use_state(String::new);
    let firmware_type = use_state(|| "stable".to_string());
    let description = use_state(String::new);
    let error = use_state(|| None::<String>);
    let busy = use_state(|| false);

    let on_file = {
        let file = file.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            file.set(input.files().and_then(|list| list.get(0)));
        })
    };

    let onsubmit = {
        let api = props.api.clone();
        let on_uploaded = props.on_uploaded.clone();
        let file = file.clone();
        let firmware_version = firmware_version.clone();
        let firmware_type = firmware_type.clone();
        let description = description.clone();
        let error = error.clone();
        let busy = busy.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *busy {
                return;
            }
            let Some(selected) = (*file).clone() else {
                error.set(Some("Please select a firmware file".to_string()));
                return;
            };
            if firmware_version.is_empty() {
                error.set(Some("Please fill in all required fields".to_string()));
                return;
            }
            busy.set(true);
            error.set(None);

            let api = api.clone();
            let on_uploaded = on_uploaded.clone();
            let upload_version = (*firmware_version).clone();
            let upload_type = (*firmware_type).clone();
            let upload_description = (*description).clone();
            let error = error.clone();
            let busy = busy.clone();
            spawn_local(async move {
                let bytes = match read_file_bytes(&selected).await {
                    Ok(bytes) => bytes,
                    Err(message) => {
                        error.set(Some(message));
                        busy.set(false);
                        return;
                    }
                };
                let upload = FirmwareUpload {
                    file_name: selected.name(),
                    bytes,
                    firmware_version: upload_version,
                    firmware_type: upload_type,
                    description: upload_description,
                };
                match api.upload_firmware(upload).await {
                    Ok(_) => on_uploaded.emit(()),
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
                <h3>{ "Upload Firmware" }</h3>
                <form {onsubmit}>
                    if let Some(message) = (*error).clone() {
                        <div class="alert alert-danger">{ message }</div>
                    }
                    <label>{ "Firmware file" }</label>
                    <input type="file" class="form-control" onchange={on_file} />
                    <label>{ "Version" }</label>
                    <input class="form-control" placeholder="e.g. 2.4.1"
                        value={(*firmware_version).clone()}
                        oninput={{
                            let firmware_version = firmware_version.clone();
                            Callback::from(move |e: InputEvent| {
                                let input: HtmlInputElement = e.target_unchecked_into();
                                firmware_version.set(input.value());
                            })
                        }} />
                    <label>{ "Type" }</label>
                    <select class="form-control" onchange={{
                        let firmware_type = firmware_type.clone();
                        Callback::from(move |e: Event| {
                            let select: HtmlSelectElement = e.target_unchecked_into();
                            firmware_type.set(select.value());
                        })
                    }}>
                        { for TYPE_CHOICES.iter().map(|choice| html! {
                            <option value={choice.label().to_lowercase()}
                                selected={*firmware_type == choice.label().to_lowercase()}>
                                { choice.label() }
                            </option>
                        }) }
                    </select>
                    <label>{ "Description" }</label>
                    <textarea class="form-control" value={(*description).clone()}
                        oninput={{
                            let description = description.clone();
                            Callback::from(move |e: InputEvent| {
                                let area: HtmlTextAreaElement = e.target_unchecked_into();
                                description.set(area.value());
                            })
                        }} />
                    <div class="dialog-actions">
                        <button type="button" class="btn" onclick={on_cancel}>{ "Cancel" }</button>
                        <button type="submit" class="btn btn-primary" disabled={*busy}>
                            { if *busy { "Uploading..." } else { "Upload" } }
                        </button>
                    </div>
                </form>
            </div>
        </div>
    }
}
