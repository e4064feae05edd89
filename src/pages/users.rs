use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;
use yew_hooks::{use_async_with_options, UseAsyncOptions};

use crate::api::{expire_if_unauthorized, Api};
use crate::models::NewUser;
use crate::session::use_session;
use crate::utils::format_timestamp;

#[function_component(UsersPage)]
pub fn users_page() -> Html {
    let session = use_session();
    let api = Api::from_session(&session);

    let users = {
        let api = api.clone();
        use_async_with_options(
            async move { api.users().await },
            UseAsyncOptions::enable_auto(),
        )
    };

    {
        let session = session.clone();
        use_effect_with(users.error.clone(), move |error| {
            expire_if_unauthorized(&session, error);
        });
    }

    let show_create = use_state(|| false);

    let retry = {
        let users = users.clone();
        Callback::from(move |_| users.run())
    };

    let body = if users.loading && users.data.is_none() {
        html! { <p class="text-muted">{ "Loading users..." }</p> }
    } else if let Some(err) = &users.error {
        html! {
            <div class="alert alert-danger">
                { err.to_string() }
                <button class="btn btn-sm" onclick={retry}>{ "Retry" }</button>
            </div>
        }
    } else if let Some(list) = &users.data {
        if list.is_empty() {
            html! { <p class="text-muted">{ "No users yet." }</p> }
        } else {
            let rows: Html = list
                .iter()
                .map(|user| {
                    let organisations = user
                        .organisations
                        .iter()
                        .map(|o| o.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    html! {
                        <tr key={user.id.clone()}>
                            <td>{ user.username.clone().unwrap_or_else(|| "—".to_string()) }</td>
                            <td>{ &user.email }</td>
                            <td>{ if user.is_active { "Active" } else { "Inactive" } }</td>
                            <td>{ if organisations.is_empty() { "—".to_string() } else { organisations } }</td>
                            <td>{ user.created_at.as_deref().map(format_timestamp).unwrap_or_else(|| "—".to_string()) }</td>
                        </tr>
                    }
                })
                .collect();
            html! {
                <table class="table">
                    <thead>
                        <tr>
                            <th>{ "Username" }</th>
                            <th>{ "Email" }</th>
                            <th>{ "Status" }</th>
                            <th>{ "Organisations" }</th>
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
        <div class="page users-page">
            <div class="page-header">
                <h2 class="page-title">{ "Users" }</h2>
                <button class="btn btn-primary" onclick={{
                    let show_create = show_create.clone();
                    Callback::from(move |_| show_create.set(true))
                }}>{ "Add User" }</button>
            </div>
            { body }
            if *show_create {
                <CreateUserDialog
                    api={api}
                    on_close={{
                        let show_create = show_create.clone();
                        Callback::from(move |_| show_create.set(false))
                    }}
                    on_created={{
                        let show_create = show_create.clone();
                        let users = users.clone();
                        Callback::from(move |_| {
                            show_create.set(false);
                            users.run();
                        })
                    }}
                />
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct CreateUserProps {
    api: Api,
    on_close: Callback<()>,
    on_created: Callback<()>,
}

#[function_component(CreateUserDialog)]
fn create_user_dialog(props: &CreateUserProps) -> Html {
    let username = use_state(String::new);
    let email = use_state(String::new);
    let password = use_state(String::new);
    let organisation = use_state(String::new);
    let error = use_state(|| None::<String>);
    let busy = use_state(|| false);

    let text_input = |state: &UseStateHandle<String>| {
        let state = state.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            state.set(input.value());
        })
    };
    let on_username = text_input(&username);
    let on_email = text_input(&email);
    let on_password = text_input(&password);
    let on_organisation = text_input(&organisation);

    let onsubmit = {
        let api = props.api.clone();
        let on_created = props.on_created.clone();
        let username = username.clone();
        let email = email.clone();
        let password = password.clone();
        let organisation = organisation.clone();
        let error = error.clone();
        let busy = busy.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *busy {
                return;
            }
            if username.is_empty() || email.is_empty() || password.is_empty() {
                error.set(Some("Please fill in all required fields".to_string()));
                return;
            }
            busy.set(true);
            error.set(None);

            let user = NewUser {
                username: (*username).clone(),
                email: (*email).clone(),
                password: (*password).clone(),
                organisation_name: Some((*organisation).clone()).filter(|o| !o.is_empty()),
            };
            let api = api.clone();
            let on_created = on_created.clone();
            let error = error.clone();
            let busy = busy.clone();
            spawn_local(async move {
                match api.create_user(&user).await {
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
                <h3>{ "Add User" }</h3>
                <form {onsubmit}>
                    if let Some(message) = (*error).clone() {
                        <div class="alert alert-danger">{ message }</div>
                    }
                    <label>{ "Username" }</label>
                    <input class="form-control" value={(*username).clone()} oninput={on_username} />
                    <label>{ "Email" }</label>
                    <input type="email" class="form-control" value={(*email).clone()} oninput={on_email} />
                    <label>{ "Password" }</label>
                    <input type="password" class="form-control" value={(*password).clone()} oninput={on_password} />
                    <label>{ "Organisation (optional)" }</label>
                    <input class="form-control" value={(*organisation).clone()} oninput={on_organisation} />
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
