use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;
use yew_hooks::{use_async_with_options, UseAsyncOptions};

use crate::api::{expire_if_unauthorized, Api};
use crate::models::NewOrganisation;
use crate::session::use_session;
use crate::utils::format_timestamp;

#[function_component(OrganisationsPage)]
pub fn organisations_page() -> Html {
    let session = use_session();
    let api = Api::from_session(&session);

    let organisations = {
        let api = api.clone();
        use_async_with_options(
            async move { api.organisations().await },
            UseAsyncOptions::enable_auto(),
        )
    };

    {
        let session = session.clone();
        use_effect_with(organisations.error.clone(), move |error| {
            expire_if_unauthorized(&session, error);
        });
    }

    let show_create = use_state(|| false);

    let retry = {
        let organisations = organisations.clone();
        Callback::from(move |_| organisations.run())
    };

    let body = if organisations.loading && organisations.data.is_none() {
        html! { <p class="text-muted">{ "Loading organisations..." }</p> }
    } else if let Some(err) = &organisations.error {
        html! {
            <div class="alert alert-danger">
                { err.to_string() }
                <button class="btn btn-sm" onclick={retry}>{ "Retry" }</button>
            </div>
        }
    } else if let Some(list) = &organisations.data {
        if list.is_empty() {
            html! { <p class="text-muted">{ "No organisations yet." }</p> }
        } else {
            let rows: Html = list
                .iter()
                .map(|org| {
                    html! {
                        <tr key={org.id.clone()}>
                            <td>{ &org.name }</td>
                            <td>{ org.description.clone().unwrap_or_else(|| "—".to_string()) }</td>
                            <td>{ if org.is_active { "Active" } else { "Inactive" } }</td>
                            <td>{ org.created_at.as_deref().map(format_timestamp).unwrap_or_else(|| "—".to_string()) }</td>
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
                            <th>{ "Status" }</th>
                            <th>{ "Created" }</th>
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
        <div class="page organisations-page">
            <div class="page-header">
                <h2 class="page-title">{ "Organisations" }</h2>
                <button class="btn btn-primary" onclick={{
                    let show_create = show_create.clone();
                    Callback::from(move |_| show_create.set(true))
                }}>{ "Add Organisation" }</button>
            </div>
            { body }
            if *show_create {
                <CreateOrganisationDialog
                    api={api}
                    on_close={{
                        let show_create = show_create.clone();
                        Callback::from(move |_| show_create.set(false))
                    }}
                    on_created={{
                        let show_create = show_create.clone();
                        let organisations = organisations.clone();
                        Callback::from(move |_| {
                            show_create.set(false);
                            organisations.run();
                        })
                    }}
                />
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct CreateOrganisationProps {
    api: Api,
    on_close: Callback<()>,
    on_created: Callback<()>,
}

/// Creating an organisation also provisions its first admin account, so the
/// form asks for that account's credentials alongside the organisation
/// details.
#[function_component(CreateOrganisationDialog)]
fn create_organisation_dialog(props: &CreateOrganisationProps) -> Html {
    let name = use_state(String::new);
    let description = use_state(String::new);
    let email = use_state(String::new);
    let password = use_state(String::new);
    let error = use_state(|| None::<String>);
    let busy = use_state(|| false);

    let text_input = |state: &UseStateHandle<String>| {
        let state = state.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            state.set(input.value());
        })
    };
    let on_name = text_input(&name);
    let on_description = text_input(&description);
    let on_email = text_input(&email);
    let on_password = text_input(&password);

    let onsubmit = {
        let api = props.api.clone();
        let on_created = props.on_created.clone();
        let name = name.clone();
        let description = description.clone();
        let email = email.clone();
        let password = password.clone();
        let error = error.clone();
        let busy = busy.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *busy {
                return;
            }
            if name.is_empty() || email.is_empty() || password.is_empty() {
                error.set(Some("Please fill in all required fields".to_string()));
                return;
            }
            busy.set(true);
            error.set(None);

            let organisation = NewOrganisation {
                name: (*name).clone(),
                description: (*description).clone(),
                email: (*email).clone(),
                password: (*password).clone(),
            };
            let api = api.clone();
            let on_created = on_created.clone();
            let error = error.clone();
            let busy = busy.clone();
            spawn_local(async move {
                match api.create_organisation(&organisation).await {
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
                <h3>{ "Add Organisation" }</h3>
                <form {onsubmit}>
                    if let Some(message) = (*error).clone() {
                        <div class="alert alert-danger">{ message }</div>
                    }
                    <label>{ "Name" }</label>
                    <input class="form-control" value={(*name).clone()} oninput={on_name} />
                    <label>{ "Description" }</label>
                    <input class="form-control" value={(*description).clone()} oninput={on_description} />
                    <label>{ "Admin email" }</label>
                    <input type="email" class="form-control" value={(*email).clone()} oninput={on_email} />
                    <label>{ "Admin password" }</label>
                    <input type="password" class="form-control" value={(*password).clone()} oninput={on_password} />
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
