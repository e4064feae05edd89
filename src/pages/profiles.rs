use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;
use yew_hooks::{use_async_with_options, UseAsyncOptions};
use yew_router::prelude::*;

use crate::api::{expire_if_unauthorized, Api};
use crate::models::{LabelMap, NewProfile};
use crate::session::use_session;
use crate::Route;

/// Builds the backend's `{ "field1": label, "field2": label, ... }` shape
/// from an ordered list of labels, skipping blank entries without leaving
/// gaps in the numbering.
fn label_map(prefix: &str, labels: &[String]) -> LabelMap {
    let mut map = LabelMap::new();
    for (i, label) in labels
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .enumerate()
    {
        map.insert(format!("{prefix}{}", i + 1), label.into());
    }
    map
}

#[function_component(ProfilesPage)]
pub fn profiles_page() -> Html {
    let session = use_session();
    let api = Api::from_session(&session);

    let profiles = {
        let api = api.clone();
        use_async_with_options(
            async move { api.profiles().await },
            UseAsyncOptions::enable_auto(),
        )
    };

    {
        let session = session.clone();
        use_effect_with(profiles.error.clone(), move |error| {
            expire_if_unauthorized(&session, error);
        });
    }

    let show_create = use_state(|| false);

    let retry = {
        let profiles = profiles.clone();
        Callback::from(move |_| profiles.run())
    };

    let body = if profiles.loading && profiles.data.is_none() {
        html! { <p class="text-muted">{ "Loading profiles..." }</p> }
    } else if let Some(err) = &profiles.error {
        html! {
            <div class="alert alert-danger">
                { err.to_string() }
                <button class="btn btn-sm" onclick={retry}>{ "Retry" }</button>
            </div>
        }
    } else if let Some(list) = &profiles.data {
        if list.is_empty() {
            html! { <p class="text-muted">{ "No profiles yet." }</p> }
        } else {
            let rows: Html = list
                .iter()
                .map(|profile| {
                    html! {
                        <tr key={profile.id.clone()}>
                            <td>
                                <Link<Route> to={Route::ProfileDevices { profile_id: profile.id.clone() }}>
                                    { &profile.name }
                                </Link<Route>>
                            </td>
                            <td>{ profile.description.clone().unwrap_or_else(|| "—".to_string()) }</td>
                            <td>{ profile.field_map().len() }</td>
                            <td>{ profile.config_map().len() }</td>
                            <td>{ profile.metadata_map().len() }</td>
                            <td>{ profile.device_count.unwrap_or(0) }</td>
                        </tr>
                    }
                })
                .collect();
            html! {
                <table class="table">
                    <thead>
                        <tr>
                            <th>{ "Name" }</th>
                            <th>{ "Description" }</th>
                            <th>{ "Fields" }</th>
                            <th>{ "Configs" }</th>
                            <th>{ "Metadata" }</th>
                            <th>{ "Devices" }</th>
                        </tr>
                    </thead>
                    <tbody>{ rows }</tbody>
                </table>
            }
        }
    } else {
        Html::default()
    };

    html! {
        <div class="page profiles-page">
            <div class="page-header">
                <h2 class="page-title">{ "Profiles" }</h2>
                <button class="btn btn-primary" onclick={{
                    let show_create = show_create.clone();
                    Callback::from(move |_| show_create.set(true))
                }}>{ "Add Profile" }</button>
            </div>
            { body }
            if *show_create {
                <CreateProfileDialog
                    api={api}
                    on_close={{
                        let show_create = show_create.clone();
                        Callback::from(move |_| show_create.set(false))
                    }}
                    on_created={{
                        let show_create = show_create.clone();
                        let profiles = profiles.clone();
                        Callback::from(move |_| {
                            show_create.set(false);
                            profiles.run();
                        })
                    }}
                />
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct CreateProfileProps {
    api: Api,
    on_close: Callback<()>,
    on_created: Callback<()>,
}

#[function_component(CreateProfileDialog)]
fn create_profile_dialog(props: &CreateProfileProps) -> Html {
    let name = use_state(String::new);
    let description = use_state(String::new);
    let fields = use_state(|| vec![String::new()]);
    let configs = use_state(Vec::<String>::new);
    let metadata = use_state(Vec::<String>::new);
    let error = use_state(|| None::<String>);
    let busy = use_state(|| false);

    let onsubmit = {
        let api = props.api.clone();
        let on_created = props.on_created.clone();
        let name = name.clone();
        let description = description.clone();
        let fields = fields.clone();
        let configs = configs.clone();
        let metadata = metadata.clone();
        let error = error.clone();
        let busy = busy.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *busy {
                return;
            }
            let field_labels = label_map("field", &fields);
            if name.is_empty() {
                error.set(Some("Please fill in all required fields".to_string()));
                return;
            }
            if field_labels.is_empty() {
                error.set(Some("A profile needs at least one field".to_string()));
                return;
            }
            busy.set(true);
            error.set(None);

            let profile = NewProfile {
                name: (*name).clone(),
                description: Some((*description).clone()).filter(|d| !d.is_empty()),
                fields: field_labels,
                configs: label_map("config", &configs),
                metadata: label_map("metadata", &metadata),
            };
            let api = api.clone();
            let on_created = on_created.clone();
            let error = error.clone();
            let busy = busy.clone();
            spawn_local(async move {
                match api.create_profile(&profile).await {
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
            <div class="dialog dialog-wide">
                <h3>{ "Add Profile" }</h3>
                <form {onsubmit}>
                    if let Some(message) = (*error).clone() {
                        <div class="alert alert-danger">{ message }</div>
                    }
                    <label>{ "Name" }</label>
                    <input class="form-control" value={(*name).clone()}
                        oninput={{
                            let name = name.clone();
                            Callback::from(move |e: InputEvent| {
                                let input: HtmlInputElement = e.target_unchecked_into();
                                name.set(input.value());
                            })
                        }} />
                    <label>{ "Description" }</label>
                    <input class="form-control" value={(*description).clone()}
                        oninput={{
                            let description = description.clone();
                            Callback::from(move |e: InputEvent| {
                                let input: HtmlInputElement = e.target_unchecked_into();
                                description.set(input.value());
                            })
                        }} />
                    <LabelListEditor title="Fields" labels={fields.clone()} />
                    <LabelListEditor title="Configuration keys" labels={configs.clone()} />
                    <LabelListEditor title="Metadata keys" labels={metadata.clone()} />
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
struct LabelListEditorProps {
    title: AttrValue,
    labels: UseStateHandle<Vec<String>>,
}

/// Growable list of label inputs backing one of the three profile maps.
#[function_component(LabelListEditor)]
fn label_list_editor(props: &LabelListEditorProps) -> Html {
    let labels = props.labels.clone();

    let add = {
        let labels = labels.clone();
        Callback::from(move |_| {
            let mut next = (*labels).clone();
            next.push(String::new());
            labels.set(next);
        })
    };

    let inputs: Html = labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let oninput = {
                let labels = labels.clone();
                Callback::from(move |e: InputEvent| {
                    let input: HtmlInputElement = e.target_unchecked_into();
                    let mut next = (*labels).clone();
                    next[i] = input.value();
                    labels.set(next);
                })
            };
            let remove = {
                let labels = labels.clone();
                Callback::from(move |_| {
                    let mut next = (*labels).clone();
                    next.remove(i);
                    labels.set(next);
                })
            };
            html! {
                <div class="label-row">
                    <input class="form-control" value={label.clone()} {oninput} />
                    <button type="button" class="btn btn-sm" onclick={remove}>{ "✕" }</button>
                </div>
            }
        })
        .collect();

    html! {
        <fieldset class="label-list">
            <legend>{ props.title.clone() }</legend>
            { inputs }
            <button type="button" class="btn btn-sm" onclick={add}>{ "Add" }</button>
        </fieldset>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_map_numbers_from_one() {
        let map = label_map("field", &["Temperature".to_string(), "Humidity".to_string()]);
        let pairs: Vec<_> = map.iter().map(|(k, v)| (k.as_str(), v.as_str().unwrap())).collect();
        assert_eq!(pairs, [("field1", "Temperature"), ("field2", "Humidity")]);
    }

    #[test]
    fn label_map_skips_blanks_without_gaps() {
        let labels = vec!["A".to_string(), "  ".to_string(), "B".to_string()];
        let map = label_map("config", &labels);
        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["config1", "config2"]);
        assert_eq!(map["config2"], "B");
    }

    #[test]
    fn empty_labels_give_empty_map() {
        assert!(label_map("metadata", &[]).is_empty());
        assert!(label_map("metadata", &[String::new()]).is_empty());
    }
}
