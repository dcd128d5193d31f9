use crate::api::SupabaseClient;
use leptos::prelude::*;
use std::sync::{Arc, Mutex};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

/// Channel topic for row changes on the bookmarks table.
pub(crate) const BOOKMARKS_TOPIC: &str = "realtime:bookmarks";

/// Phoenix drops the socket after ~60s of silence; ping well inside that.
const HEARTBEAT_MS: i32 = 25_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChangeEvent {
    Insert,
    Update,
    Delete,
}

/// Websocket endpoint derived from the REST base url.
pub(crate) fn realtime_socket_url(base_url: &str, anon_key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };

    format!(
        "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
        ws_base,
        urlencoding::encode(anon_key)
    )
}

/// `phx_join` frame subscribing to all change events on public.bookmarks.
pub(crate) fn join_frame(topic: &str, msg_ref: u64) -> String {
    serde_json::json!({
        "topic": topic,
        "event": "phx_join",
        "payload": {
            "config": {
                "postgres_changes": [
                    {"event": "*", "schema": "public", "table": "bookmarks"}
                ]
            }
        },
        "ref": msg_ref.to_string(),
    })
    .to_string()
}

pub(crate) fn heartbeat_frame(msg_ref: u64) -> String {
    serde_json::json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": msg_ref.to_string(),
    })
    .to_string()
}

/// Maps an inbound frame to a row change, ignoring joins, acks and
/// heartbeat replies. The change type rides in `payload.data.type`.
pub(crate) fn parse_change_event(raw: &str) -> Option<ChangeEvent> {
    let msg: serde_json::Value = serde_json::from_str(raw).ok()?;

    if msg.get("event").and_then(|v| v.as_str()) != Some("postgres_changes") {
        return None;
    }

    let change_type = msg
        .get("payload")
        .and_then(|p| p.get("data"))
        .and_then(|d| d.get("type"))
        .and_then(|t| t.as_str())?;

    match change_type {
        "INSERT" => Some(ChangeEvent::Insert),
        "UPDATE" => Some(ChangeEvent::Update),
        "DELETE" => Some(ChangeEvent::Delete),
        _ => None,
    }
}

/// Long-lived subscription to the bookmarks change channel.
///
/// Every received row change bumps `change_tick`; a single tracking effect
/// on the dashboard consumes the tick and reloads through the guarded
/// loader, so reload-on-event is serialized against user mutations instead
/// of racing them. Full-list reload is a deliberate scalability trade at
/// this data size; the parsed delta is available the day that changes.
pub(crate) struct BookmarkFeed {
    socket: web_sys::WebSocket,
    heartbeat_timer: Option<i32>,

    // Keep the JS callbacks alive for the connection's lifetime.
    _on_open: Closure<dyn FnMut(web_sys::Event)>,
    _on_message: Closure<dyn FnMut(web_sys::MessageEvent)>,
    _heartbeat: Closure<dyn FnMut()>,
}

impl BookmarkFeed {
    pub fn connect(client: &SupabaseClient, change_tick: RwSignal<u64>) -> Option<Self> {
        let url = realtime_socket_url(&client.base_url, &client.anon_key);
        let socket = web_sys::WebSocket::new(&url).ok()?;

        let msg_ref = Arc::new(Mutex::new(1u64));

        let join_socket = socket.clone();
        let on_open = Closure::wrap(Box::new(move |_ev: web_sys::Event| {
            let _ = join_socket.send_with_str(&join_frame(BOOKMARKS_TOPIC, 1));
        }) as Box<dyn FnMut(web_sys::Event)>);
        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        let on_message = Closure::wrap(Box::new(move |ev: web_sys::MessageEvent| {
            if let Some(raw) = ev.data().as_string() {
                if parse_change_event(&raw).is_some() {
                    change_tick.update(|n| *n = n.wrapping_add(1));
                }
            }
        }) as Box<dyn FnMut(web_sys::MessageEvent)>);
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let hb_socket = socket.clone();
        let hb_ref = msg_ref.clone();
        let heartbeat = Closure::wrap(Box::new(move || {
            let r = if let Ok(mut n) = hb_ref.lock() {
                *n = n.wrapping_add(1);
                *n
            } else {
                return;
            };
            let _ = hb_socket.send_with_str(&heartbeat_frame(r));
        }) as Box<dyn FnMut()>);

        let heartbeat_timer = web_sys::window().and_then(|win| {
            win.set_interval_with_callback_and_timeout_and_arguments_0(
                heartbeat.as_ref().unchecked_ref(),
                HEARTBEAT_MS,
            )
            .ok()
        });

        Some(Self {
            socket,
            heartbeat_timer,
            _on_open: on_open,
            _on_message: on_message,
            _heartbeat: heartbeat,
        })
    }

    /// Tears the subscription down; called from the owning view's cleanup.
    pub fn close(&self) {
        if let Some(tid) = self.heartbeat_timer {
            if let Some(win) = web_sys::window() {
                win.clear_interval_with_handle(tid);
            }
        }

        self.socket.set_onopen(None);
        self.socket.set_onmessage(None);
        let _ = self.socket.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url_swaps_scheme() {
        assert_eq!(
            realtime_socket_url("https://proj.supabase.co", "k"),
            "wss://proj.supabase.co/realtime/v1/websocket?apikey=k&vsn=1.0.0"
        );
        assert_eq!(
            realtime_socket_url("http://localhost:54321/", "k"),
            "ws://localhost:54321/realtime/v1/websocket?apikey=k&vsn=1.0.0"
        );
    }

    #[test]
    fn test_join_frame_shape() {
        let frame: serde_json::Value =
            serde_json::from_str(&join_frame(BOOKMARKS_TOPIC, 1)).expect("frame is JSON");
        assert_eq!(frame["topic"], "realtime:bookmarks");
        assert_eq!(frame["event"], "phx_join");
        assert_eq!(
            frame["payload"]["config"]["postgres_changes"][0]["table"],
            "bookmarks"
        );
        assert_eq!(frame["ref"], "1");
    }

    #[test]
    fn test_heartbeat_frame_shape() {
        let frame: serde_json::Value =
            serde_json::from_str(&heartbeat_frame(7)).expect("frame is JSON");
        assert_eq!(frame["topic"], "phoenix");
        assert_eq!(frame["event"], "heartbeat");
        assert_eq!(frame["ref"], "7");
    }

    #[test]
    fn test_parse_change_event_types() {
        for (t, expected) in [
            ("INSERT", ChangeEvent::Insert),
            ("UPDATE", ChangeEvent::Update),
            ("DELETE", ChangeEvent::Delete),
        ] {
            let raw = serde_json::json!({
                "topic": BOOKMARKS_TOPIC,
                "event": "postgres_changes",
                "payload": {"data": {"type": t, "table": "bookmarks"}},
                "ref": null,
            })
            .to_string();
            assert_eq!(parse_change_event(&raw), Some(expected));
        }
    }

    #[test]
    fn test_parse_ignores_acks_and_heartbeats() {
        let ack = serde_json::json!({
            "topic": BOOKMARKS_TOPIC,
            "event": "phx_reply",
            "payload": {"status": "ok", "response": {}},
            "ref": "1",
        })
        .to_string();
        assert!(parse_change_event(&ack).is_none());

        let hb = serde_json::json!({
            "topic": "phoenix",
            "event": "phx_reply",
            "payload": {"status": "ok"},
            "ref": "2",
        })
        .to_string();
        assert!(parse_change_event(&hb).is_none());
    }

    #[test]
    fn test_parse_ignores_garbage() {
        assert!(parse_change_event("not json").is_none());
        assert!(parse_change_event("{}").is_none());
    }
}
