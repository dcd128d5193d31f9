mod api;
mod app;
mod components;
mod models;
mod pages;
mod realtime;
mod state;
mod storage;
mod util;

use crate::app::App;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use crate::api::SupabaseClient;
    use crate::models::AuthUser;
    use crate::storage::{load_user_from_storage, save_user_to_storage};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_access_token_storage_roundtrip() {
        SupabaseClient::clear_storage();

        let mut c = SupabaseClient::new("http://localhost:54321".to_string(), "k".to_string());
        assert!(!c.is_authenticated());

        c.set_access_token("t1".to_string());
        c.save_to_storage();

        let c2 = SupabaseClient::load_from_storage();
        assert_eq!(c2.access_token.as_deref(), Some("t1"));

        SupabaseClient::clear_storage();
        let c3 = SupabaseClient::load_from_storage();
        assert!(c3.access_token.is_none());
    }

    #[wasm_bindgen_test]
    fn test_user_storage_roundtrip() {
        let user = AuthUser {
            id: "u-1".to_string(),
            email: Some("u@example.com".to_string()),
            user_metadata: serde_json::json!({"full_name": "U"}),
        };
        save_user_to_storage(&user);
        let loaded = load_user_from_storage().expect("should load user from localStorage");
        assert_eq!(loaded.id, "u-1");
        assert_eq!(loaded.display_name(), "U");
    }
}

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(App);
}
