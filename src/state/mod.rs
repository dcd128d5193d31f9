use crate::api::SupabaseClient;
use crate::models::{AuthUser, Bookmark};
use crate::storage::load_user_from_storage;
use leptos::prelude::*;

/// Session + dashboard state, provided at the app root and torn down with it.
///
/// The cached user is only a fast-path projection; `RequireSession`
/// re-validates it against the backend before any bookmark data renders.
#[derive(Clone)]
pub(crate) struct AppState {
    pub client: RwSignal<SupabaseClient>,
    pub current_user: RwSignal<Option<AuthUser>>,

    /// Loaded from backend, newest-first.
    pub bookmarks: RwSignal<Vec<Bookmark>>,
    pub bookmarks_loading: RwSignal<bool>,
    pub bookmarks_error: RwSignal<Option<String>>,

    /// Load guard (ignore stale responses when loads overlap).
    pub bookmarks_request_id: RwSignal<u64>,
}

impl AppState {
    pub fn new() -> Self {
        let stored_client = SupabaseClient::load_from_storage();
        let stored_user = load_user_from_storage();

        Self {
            client: RwSignal::new(stored_client),
            current_user: RwSignal::new(stored_user),
            bookmarks: RwSignal::new(vec![]),
            bookmarks_loading: RwSignal::new(false),
            bookmarks_error: RwSignal::new(None),
            bookmarks_request_id: RwSignal::new(0),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);
