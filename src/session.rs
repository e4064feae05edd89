use gloo_storage::{LocalStorage, Storage};
use serde::{Deserialize, Serialize};
use yew::prelude::*;

use crate::api::Api;

pub const TOKEN_KEY: &str = "authToken";
pub const USER_KEY: &str = "authUser";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub is_admin: bool,
}

/// Key-value persistence behind the session. The trait exists so the state
/// transitions can be exercised without a browser.
pub trait CredentialStore {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str);
    fn clear(&self, key: &str);
}

/// LocalStorage-backed store; the only durable client state in the app.
pub struct BrowserStore;

impl CredentialStore for BrowserStore {
    fn read(&self, key: &str) -> Option<String> {
        LocalStorage::get::<String>(key).ok()
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(err) = LocalStorage::set(key, value) {
            log::error!("failed to persist {key}: {err}");
        }
    }

    fn clear(&self, key: &str) {
        LocalStorage::delete(key);
    }
}

/// Who is logged in. `user` and `token` are set and cleared together; there
/// is no state where only one is present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    user: Option<User>,
    token: Option<String>,
}

impl SessionState {
    /// Restore the persisted session on startup. A corrupt or half-written
    /// record degrades to logged-out and purges both keys so the corruption
    /// does not recur on the next load.
    pub fn restore(store: &impl CredentialStore) -> Self {
        match (store.read(TOKEN_KEY), store.read(USER_KEY)) {
            (Some(token), Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Self {
                    user: Some(user),
                    token: Some(token),
                },
                Err(err) => {
                    log::warn!("purging corrupt persisted session: {err}");
                    store.clear(TOKEN_KEY);
                    store.clear(USER_KEY);
                    Self::default()
                }
            },
            (None, None) => Self::default(),
            _ => {
                log::warn!("purging half-written persisted session");
                store.clear(TOKEN_KEY);
                store.clear(USER_KEY);
                Self::default()
            }
        }
    }

    pub fn login(store: &impl CredentialStore, user: User, token: String) -> Self {
        store.write(TOKEN_KEY, &token);
        if let Ok(raw) = serde_json::to_string(&user) {
            store.write(USER_KEY, &raw);
        }
        Self {
            user: Some(user),
            token: Some(token),
        }
    }

    pub fn logout(store: &impl CredentialStore) -> Self {
        store.clear(TOKEN_KEY);
        store.clear(USER_KEY);
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().map(|u| u.is_admin).unwrap_or(false)
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// Context handle handed to the component tree; the single source of truth
/// for session state.
#[derive(Clone, PartialEq)]
pub struct SessionHandle {
    state: UseStateHandle<SessionState>,
}

impl SessionHandle {
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.state.is_admin()
    }

    pub fn user(&self) -> Option<User> {
        self.state.user().cloned()
    }

    pub fn token(&self) -> Option<String> {
        self.state.token().map(str::to_string)
    }

    pub fn login(&self, user: User, token: String) {
        self.state
            .set(SessionState::login(&BrowserStore, user, token));
    }

    /// Explicit logout: clear locally no matter what, notify the server in
    /// the background.
    pub fn logout(&self) {
        let api = Api::from_session(self);
        wasm_bindgen_futures::spawn_local(async move { api.logout().await });
        self.state.set(SessionState::logout(&BrowserStore));
    }

    /// Session invalidated by the backend (401); no logout call, the token
    /// is already dead.
    pub fn expire(&self) {
        self.state.set(SessionState::logout(&BrowserStore));
    }
}

#[derive(Properties, PartialEq)]
pub struct SessionProviderProps {
    pub children: Html,
}

#[function_component(SessionProvider)]
pub fn session_provider(props: &SessionProviderProps) -> Html {
    let state = use_state(|| SessionState::restore(&BrowserStore));
    let handle = SessionHandle { state };

    html! {
        <ContextProvider<SessionHandle> context={handle}>
            { props.children.clone() }
        </ContextProvider<SessionHandle>>
    }
}

#[hook]
pub fn use_session() -> SessionHandle {
    use_context::<SessionHandle>().expect("SessionProvider is missing from the component tree")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct MemoryStore {
        cells: RefCell<HashMap<String, String>>,
    }

    impl MemoryStore {
        pub fn len(&self) -> usize {
            self.cells.borrow().len()
        }

        pub fn insert(&self, key: &str, value: &str) {
            self.cells
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
        }
    }

    impl CredentialStore for MemoryStore {
        fn read(&self, key: &str) -> Option<String> {
            self.cells.borrow().get(key).cloned()
        }

        fn write(&self, key: &str, value: &str) {
            self.insert(key, value);
        }

        fn clear(&self, key: &str) {
            self.cells.borrow_mut().remove(key);
        }
    }

    pub fn user(is_admin: bool) -> User {
        User {
            user_id: "u-1".to_string(),
            email: "op@example.com".to_string(),
            is_admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{user, MemoryStore};
    use super::*;

    #[test]
    fn login_sets_identity_and_persists() {
        let store = MemoryStore::default();
        let state = SessionState::login(&store, user(true), "tok-1".to_string());

        assert!(state.is_authenticated());
        assert!(state.is_admin());
        assert_eq!(state.token(), Some("tok-1"));
        assert_eq!(store.read(TOKEN_KEY).as_deref(), Some("tok-1"));
        assert!(store.read(USER_KEY).is_some());
    }

    #[test]
    fn login_then_restore_round_trips() {
        let store = MemoryStore::default();
        let before = SessionState::login(&store, user(false), "tok-2".to_string());
        let after = SessionState::restore(&store);

        assert_eq!(before, after);
        assert!(!after.is_admin());
    }

    #[test]
    fn logout_after_login_is_initial_state() {
        let store = MemoryStore::default();
        SessionState::login(&store, user(true), "tok-3".to_string());
        let state = SessionState::logout(&store);

        assert_eq!(state, SessionState::default());
        assert!(!state.is_authenticated());
        assert_eq!(store.len(), 0);
        assert_eq!(SessionState::restore(&store), SessionState::default());
    }

    #[test]
    fn corrupt_user_record_degrades_to_logged_out_and_purges() {
        let store = MemoryStore::default();
        store.insert(TOKEN_KEY, "tok-4");
        store.insert(USER_KEY, "{not json");

        let state = SessionState::restore(&store);
        assert!(!state.is_authenticated());
        assert_eq!(store.len(), 0);

        // second load starts from a clean slate
        assert_eq!(SessionState::restore(&store), SessionState::default());
    }

    #[test]
    fn half_written_record_is_purged() {
        let store = MemoryStore::default();
        store.insert(TOKEN_KEY, "tok-5");

        let state = SessionState::restore(&store);
        assert!(!state.is_authenticated());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn empty_store_restores_logged_out() {
        let store = MemoryStore::default();
        assert_eq!(SessionState::restore(&store), SessionState::default());
        assert!(!SessionState::default().is_admin());
    }
}
