use crate::models::{AuthUser, Bookmark, NewBookmark};
use crate::storage::{clear_session_storage, load_token_from_storage, save_token_to_storage};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    Unauthorized,
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug)]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct EnvConfig {
    pub supabase_url: String,
    pub anon_key: String,
}

impl EnvConfig {
    pub fn new() -> Self {
        // Local development stack default (`supabase start`).
        let mut cfg = Self {
            supabase_url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
        };

        // We support BOTH `window.ENV.SUPABASE_URL` (documented in README)
        // and `window.ENV.supabase_url` (legacy/implementation detail).
        if let Some(window) = web_sys::window() {
            if let Some(env) = window.get("ENV") {
                if !env.is_undefined() && env.is_object() {
                    if let Some(url) = read_env_str(&env, "SUPABASE_URL", "supabase_url") {
                        cfg.supabase_url = url;
                    }
                    if let Some(key) = read_env_str(&env, "SUPABASE_ANON_KEY", "supabase_anon_key")
                    {
                        cfg.anon_key = key;
                    }
                }
            }
        }

        cfg
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn read_env_str(env: &js_sys::Object, key: &str, fallback_key: &str) -> Option<String> {
    for k in [key, fallback_key] {
        if let Ok(v) = js_sys::Reflect::get(env, &k.into()) {
            if let Some(s) = v.as_string() {
                return Some(s);
            }
        }
    }
    None
}

/// Extracts the access token from an OAuth implicit-flow callback fragment
/// (`#access_token=...&refresh_token=...&token_type=bearer...`).
///
/// The backend does not expose a refresh endpoint usable from this client;
/// when the access token expires the user is sent back through the provider.
pub(crate) fn parse_fragment_access_token(fragment: &str) -> Option<String> {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);

    for pair in fragment.split('&') {
        let mut kv = pair.splitn(2, '=');
        if kv.next() == Some("access_token") {
            let token = kv.next().unwrap_or_default();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    None
}

/// Thin client for the managed backend: auth endpoints under `/auth/v1`,
/// the bookmarks table under `/rest/v1`.
#[derive(Clone)]
pub(crate) struct SupabaseClient {
    pub(crate) base_url: String,
    pub(crate) anon_key: String,
    pub(crate) access_token: Option<String>,
}

impl SupabaseClient {
    #[allow(dead_code)]
    pub fn new(base_url: String, anon_key: String) -> Self {
        Self {
            base_url,
            anon_key,
            access_token: None,
        }
    }

    pub fn load_from_storage() -> Self {
        let cfg = EnvConfig::new();
        Self {
            base_url: cfg.supabase_url,
            anon_key: cfg.anon_key,
            access_token: load_token_from_storage(),
        }
    }

    pub fn save_to_storage(&self) {
        if let Some(token) = &self.access_token {
            save_token_to_storage(token);
        }
    }

    pub fn clear_storage() {
        clear_session_storage();
    }

    pub fn set_access_token(&mut self, token: String) {
        self.access_token = Some(token);
    }

    pub fn sign_out_local(&mut self) {
        self.access_token = None;
        Self::clear_storage();
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub(crate) fn bearer_header(&self) -> Option<String> {
        self.access_token.as_ref().map(|t| format!("Bearer {}", t))
    }

    /// Full-page redirect target that starts the provider's OAuth flow.
    pub fn authorize_url(&self, provider: &str, redirect_to: &str) -> String {
        format!(
            "{}/auth/v1/authorize?provider={}&redirect_to={}",
            self.base_url,
            provider,
            urlencoding::encode(redirect_to)
        )
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let client = reqwest::Client::new();
        let mut req = client.request(method, url).header("apikey", &self.anon_key);
        if let Some(header) = self.bearer_header() {
            req = req.header("Authorization", header);
        }
        req
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        req: reqwest::RequestBuilder,
        ctx: &str,
    ) -> ApiResult<T> {
        let res = req.send().await.map_err(ApiError::network)?;

        if res.status().is_success() {
            res.json().await.map_err(ApiError::parse)
        } else if res.status().as_u16() == 401 {
            Err(ApiError::unauthorized())
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, ctx))
        }
    }

    /// For endpoints that answer with an empty body (logout, delete).
    async fn send_expect_ok(req: reqwest::RequestBuilder, ctx: &str) -> ApiResult<()> {
        let res = req.send().await.map_err(ApiError::network)?;

        if res.status().is_success() {
            Ok(())
        } else if res.status().as_u16() == 401 {
            Err(ApiError::unauthorized())
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, ctx))
        }
    }

    pub async fn get_user(&self) -> ApiResult<AuthUser> {
        let url = format!("{}/auth/v1/user", self.base_url);
        Self::send_json(self.request(reqwest::Method::GET, url), "Session check failed").await
    }

    pub async fn sign_out(&self) -> ApiResult<()> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        Self::send_expect_ok(self.request(reqwest::Method::POST, url), "Sign-out failed").await
    }

    pub(crate) fn parse_bookmark_rows(data: serde_json::Value) -> ApiResult<Vec<Bookmark>> {
        // The table endpoint answers `null` for an empty result in some
        // configurations; treat it as the empty list.
        if data.is_null() {
            return Ok(vec![]);
        }
        serde_json::from_value(data).map_err(ApiError::parse)
    }

    pub(crate) fn parse_inserted_bookmark(data: serde_json::Value) -> ApiResult<Bookmark> {
        // With `Prefer: return=representation` the insert answers a
        // one-element array of the created rows.
        let rows: Vec<Bookmark> = serde_json::from_value(data).map_err(ApiError::parse)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::parse("Insert succeeded but response carried no row"))
    }

    pub async fn list_bookmarks(&self, owner_id: &str) -> ApiResult<Vec<Bookmark>> {
        let url = format!(
            "{}/rest/v1/bookmarks?select=*&user_id=eq.{}&order=created_at.desc",
            self.base_url,
            urlencoding::encode(owner_id)
        );
        let data: serde_json::Value =
            Self::send_json(self.request(reqwest::Method::GET, url), "Loading bookmarks failed")
                .await?;
        Self::parse_bookmark_rows(data)
    }

    pub async fn insert_bookmark(&self, new: &NewBookmark) -> ApiResult<Bookmark> {
        let url = format!("{}/rest/v1/bookmarks", self.base_url);
        let req = self
            .request(reqwest::Method::POST, url)
            .header("Prefer", "return=representation")
            .json(new);
        let data: serde_json::Value = Self::send_json(req, "Saving bookmark failed").await?;
        Self::parse_inserted_bookmark(data)
    }

    pub async fn delete_bookmark(&self, id: i64) -> ApiResult<()> {
        let url = format!("{}/rest/v1/bookmarks?id=eq.{}", self.base_url, id);
        Self::send_expect_ok(
            self.request(reqwest::Method::DELETE, url),
            "Deleting bookmark failed",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SupabaseClient {
        SupabaseClient::new(
            "http://localhost:54321".to_string(),
            "anon-key".to_string(),
        )
    }

    #[test]
    fn test_client_new_is_unauthenticated() {
        let c = client();
        assert_eq!(c.base_url, "http://localhost:54321");
        assert!(!c.is_authenticated());
        assert!(c.bearer_header().is_none());
    }

    #[test]
    fn test_bearer_header_with_token() {
        let mut c = client();
        c.set_access_token("jwt-token".to_string());
        assert_eq!(c.bearer_header().as_deref(), Some("Bearer jwt-token"));
        assert!(c.is_authenticated());
    }

    #[test]
    fn test_authorize_url_encodes_redirect() {
        let c = client();
        let url = c.authorize_url("google", "http://localhost:8080/dashboard");
        assert_eq!(
            url,
            "http://localhost:54321/auth/v1/authorize?provider=google&redirect_to=http%3A%2F%2Flocalhost%3A8080%2Fdashboard"
        );
    }

    #[test]
    fn test_parse_fragment_access_token() {
        let token = parse_fragment_access_token(
            "#access_token=jwt-token&expires_in=3600&refresh_token=r1&token_type=bearer",
        );
        assert_eq!(token.as_deref(), Some("jwt-token"));
    }

    #[test]
    fn test_parse_fragment_ignores_unrelated_hashes() {
        assert!(parse_fragment_access_token("#section-2").is_none());
        assert!(parse_fragment_access_token("").is_none());
        assert!(parse_fragment_access_token("#access_token=").is_none());
    }

    #[test]
    fn test_parse_bookmark_rows_null_is_empty() {
        let rows = SupabaseClient::parse_bookmark_rows(serde_json::Value::Null)
            .expect("null response should be tolerated");
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_bookmark_rows_keeps_backend_order() {
        // Contract: rest/v1 answers newest-first because the query orders by
        // created_at.desc; the client must not re-sort.
        let data = serde_json::json!([
            {"id": 2, "user_id": "u", "url": "https://b.example", "title": "B",
             "created_at": "2026-08-02T00:00:00+00:00"},
            {"id": 1, "user_id": "u", "url": "https://a.example", "title": "A",
             "created_at": "2026-08-01T00:00:00+00:00"}
        ]);
        let rows = SupabaseClient::parse_bookmark_rows(data).expect("rows should parse");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 2);
        assert_eq!(rows[1].id, 1);
    }

    #[test]
    fn test_parse_inserted_bookmark_takes_first_row() {
        let data = serde_json::json!([
            {"id": 1, "user_id": "u", "url": "https://example.com", "title": "Example",
             "created_at": "2026-08-01T00:00:00+00:00"}
        ]);
        let b = SupabaseClient::parse_inserted_bookmark(data).expect("row should parse");
        assert_eq!(b.id, 1);
        assert_eq!(b.title, "Example");
    }

    #[test]
    fn test_parse_inserted_bookmark_empty_representation_is_error() {
        let err = SupabaseClient::parse_inserted_bookmark(serde_json::json!([]))
            .expect_err("empty representation must not pass");
        assert_eq!(err.kind, ApiErrorKind::Parse);
    }
}
