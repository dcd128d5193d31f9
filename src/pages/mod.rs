use crate::api::{parse_fragment_access_token, ApiErrorKind};
use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Card, CardContent,
    CardDescription, CardHeader, CardItem, CardList, CardTitle, Input, Label, Spinner,
};
use crate::models::NewBookmark;
use crate::realtime::BookmarkFeed;
use crate::state::AppContext;
use crate::storage::{save_user_to_storage, TOKEN_KEY};
use crate::util::validate_new_bookmark;
use icons::X;
use leptos::ev;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::window_event_listener;

#[component]
pub fn LandingPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    // A returning visitor with a stored session goes straight to the
    // dashboard; the guard there re-validates it.
    Effect::new(move |_| {
        if app_state.0.client.get().is_authenticated() {
            let _ = window().location().set_href("/dashboard");
        }
    });

    let on_login = move |_ev: web_sys::MouseEvent| {
        let client = app_state.0.client.get_untracked();
        let origin = window().location().origin().unwrap_or_default();
        let url = client.authorize_url("google", &format!("{}/dashboard", origin));
        let _ = window().location().set_href(&url);
    };

    view! {
        <main class="flex min-h-screen items-center justify-center bg-background">
            <div class="flex flex-col items-center gap-6 text-center">
                <div class="space-y-2">
                    <h1 class="text-4xl font-bold tracking-tight">"Smartmark"</h1>
                    <p class="text-sm text-muted-foreground">
                        "Your bookmarks, private and live on every device."
                    </p>
                </div>
                <Button size=ButtonSize::Lg on:click=on_login>
                    "Continue with Google"
                </Button>
            </div>
        </main>
    }
}

/// Gates children behind a validated session.
///
/// On mount it adopts an OAuth callback if one is sitting in the URL
/// fragment, then asks the backend who the token belongs to. Anything but a
/// positive answer is treated as "no session" and lands on the landing
/// route. A window `storage` listener mirrors sign-ins/outs from other tabs
/// for the lifetime of the view.
#[component]
pub fn RequireSession(children: ChildrenFn) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let checking: RwSignal<bool> = RwSignal::new(true);

    let redirect_to_landing = move || {
        let mut c = app_state.0.client.get_untracked();
        c.sign_out_local();
        app_state.0.client.set(c);
        app_state.0.current_user.set(None);
        let _ = window().location().set_href("/");
    };

    let validate_session = move || {
        let client = app_state.0.client.get_untracked();
        if !client.is_authenticated() {
            redirect_to_landing();
            return;
        }

        spawn_local(async move {
            match client.get_user().await {
                Ok(user) => {
                    save_user_to_storage(&user);
                    app_state.0.current_user.set(Some(user));
                    checking.set(false);
                }
                // Any failure counts as "no session"; there is no retry.
                Err(_) => redirect_to_landing(),
            }
        });
    };

    // The OAuth redirect lands here with the session in the fragment; adopt
    // it and scrub the credentials from the address bar.
    let adopt_callback_fragment = move || {
        let Some(win) = web_sys::window() else {
            return;
        };
        let hash = win.location().hash().unwrap_or_default();
        let Some(token) = parse_fragment_access_token(&hash) else {
            return;
        };

        let mut c = app_state.0.client.get_untracked();
        c.set_access_token(token);
        c.save_to_storage();
        app_state.0.client.set(c);

        let path = win
            .location()
            .pathname()
            .unwrap_or_else(|_| "/dashboard".to_string());
        if let Ok(history) = win.history() {
            let _ =
                history.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&path));
        }
    };

    // Reads only untracked state, so this runs once on mount.
    Effect::new(move |_| {
        adopt_callback_fragment();
        validate_session();
    });

    // Session-change notifications: another tab writing the token key is a
    // sign-in or sign-out we must mirror.
    let storage_handle = window_event_listener(ev::storage, move |ev: web_sys::StorageEvent| {
        if ev.key().as_deref() != Some(TOKEN_KEY) {
            return;
        }

        match ev.new_value() {
            None => redirect_to_landing(),
            Some(token) => {
                checking.set(true);
                let mut c = app_state.0.client.get_untracked();
                c.set_access_token(token);
                app_state.0.client.set(c);
                validate_session();
            }
        }
    });
    on_cleanup(move || storage_handle.remove());

    // Store children so the view macro sees an `Fn` (not an `FnOnce`).
    let children = StoredValue::new(children);

    view! {
        <Show
            when=move || !checking.get() && app_state.0.current_user.get().is_some()
            fallback=move || view! {
                <div class="flex min-h-screen items-center justify-center bg-background">
                    <Spinner class="size-6 text-muted-foreground" />
                </div>
            }
        >
            {move || children.with_value(|c| c())}
        </Show>
    }
}

#[component]
pub fn DashboardPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let url: RwSignal<String> = RwSignal::new(String::new());
    let title: RwSignal<String> = RwSignal::new(String::new());
    let form_error: RwSignal<Option<String>> = RwSignal::new(None);
    let add_loading: RwSignal<bool> = RwSignal::new(false);
    let delete_error: RwSignal<Option<String>> = RwSignal::new(None);

    // Bumped by the realtime feed on every row change.
    let change_tick: RwSignal<u64> = RwSignal::new(0);

    let display_name = move || {
        app_state
            .0
            .current_user
            .get()
            .map(|u| u.display_name())
            .unwrap_or_default()
    };

    let handle_unauthorized = move || {
        let mut c = app_state.0.client.get_untracked();
        c.sign_out_local();
        app_state.0.client.set(c);
        app_state.0.current_user.set(None);
        let _ = window().location().set_href("/");
    };

    // Loads are guarded by a request id so a reload triggered mid-flight
    // (realtime event racing a mutation) never clobbers newer state.
    let load_bookmarks_sv = StoredValue::new(move |force: bool| {
        let uid = app_state
            .0
            .current_user
            .get_untracked()
            .map(|u| u.id)
            .unwrap_or_default();
        if uid.is_empty() {
            return;
        }

        if !force && app_state.0.bookmarks_loading.get_untracked() {
            return;
        }

        let req_id = app_state
            .0
            .bookmarks_request_id
            .get_untracked()
            .saturating_add(1);
        app_state.0.bookmarks_request_id.set(req_id);

        app_state.0.bookmarks_loading.set(true);
        app_state.0.bookmarks_error.set(None);

        let client = app_state.0.client.get_untracked();
        spawn_local(async move {
            let result = client.list_bookmarks(&uid).await;

            // Ignore stale responses.
            if app_state.0.bookmarks_request_id.get_untracked() != req_id {
                return;
            }

            match result {
                Ok(rows) => app_state.0.bookmarks.set(rows),
                Err(e) => {
                    if e.kind == ApiErrorKind::Unauthorized {
                        handle_unauthorized();
                        return;
                    }
                    // Keep whatever we had; the list is only ever stale.
                    app_state.0.bookmarks_error.set(Some(e.to_string()));
                }
            }
            app_state.0.bookmarks_loading.set(false);
        });
    });

    // Initial load once the guard has published the user.
    Effect::new(move |_| {
        if app_state.0.current_user.get().is_none() {
            return;
        }
        load_bookmarks_sv.with_value(|f| f(false));
    });

    // Live re-sync: a change from any session (including our own writes
    // echoing back) reloads the list through the guarded loader.
    let feed = StoredValue::new_local(BookmarkFeed::connect(
        &app_state.0.client.get_untracked(),
        change_tick,
    ));
    on_cleanup(move || {
        feed.with_value(|f| {
            if let Some(f) = f {
                f.close();
            }
        });
    });

    Effect::new(move |_| {
        if change_tick.get() == 0 {
            return;
        }
        load_bookmarks_sv.with_value(|f| f(true));
    });

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        form_error.set(None);

        let (valid_url, valid_title) =
            match validate_new_bookmark(&url.get_untracked(), &title.get_untracked()) {
                Ok(pair) => pair,
                Err(msg) => {
                    form_error.set(Some(msg));
                    return;
                }
            };

        let uid = app_state
            .0
            .current_user
            .get_untracked()
            .map(|u| u.id)
            .unwrap_or_default();
        if uid.is_empty() {
            return;
        }

        let client = app_state.0.client.get_untracked();
        add_loading.set(true);

        spawn_local(async move {
            let req = NewBookmark {
                url: valid_url,
                title: valid_title,
                user_id: uid,
            };

            match client.insert_bookmark(&req).await {
                Ok(b) => {
                    // Prepend to keep newest-first; the realtime echo will
                    // converge the list against backend truth anyway.
                    app_state.0.bookmarks.update(|list| list.insert(0, b));
                    url.set(String::new());
                    title.set(String::new());
                }
                Err(e) => {
                    if e.kind == ApiErrorKind::Unauthorized {
                        handle_unauthorized();
                        return;
                    }
                    form_error.set(Some("Could not save the bookmark".to_string()));
                }
            }
            add_loading.set(false);
        });
    };

    let on_delete = move |id: i64| {
        delete_error.set(None);

        let client = app_state.0.client.get_untracked();
        spawn_local(async move {
            match client.delete_bookmark(id).await {
                Ok(()) => {
                    app_state.0.bookmarks.update(|list| list.retain(|b| b.id != id));
                }
                Err(e) => {
                    if e.kind == ApiErrorKind::Unauthorized {
                        handle_unauthorized();
                        return;
                    }
                    delete_error.set(Some("Could not delete the bookmark".to_string()));
                }
            }
        });
    };

    let on_logout = move |_ev: web_sys::MouseEvent| {
        let client = app_state.0.client.get_untracked();
        spawn_local(async move {
            // Best-effort; local sign-out proceeds regardless.
            let _ = client.sign_out().await;

            let mut c = app_state.0.client.get_untracked();
            c.sign_out_local();
            app_state.0.client.set(c);
            app_state.0.current_user.set(None);
            let _ = window().location().set_href("/");
        });
    };

    let bookmarks = app_state.0.bookmarks;
    let bookmarks_loading = app_state.0.bookmarks_loading;
    let bookmarks_error = app_state.0.bookmarks_error;

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto w-full max-w-[720px] px-4 py-8">
                <div class="mb-6 flex items-center justify-between">
                    <div class="space-y-1">
                        <h1 class="text-xl font-semibold">"Smartmark"</h1>
                        <p class="text-xs text-muted-foreground">
                            {move || format!("Welcome {}", display_name())}
                        </p>
                    </div>

                    <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=on_logout>
                        "Sign out"
                    </Button>
                </div>

                <Card class="mb-6">
                    <CardHeader>
                        <CardTitle class="text-base">"Add bookmark"</CardTitle>
                        <CardDescription>"Saved privately to your account."</CardDescription>
                    </CardHeader>

                    <CardContent>
                        <form class="flex flex-col gap-4" on:submit=on_submit>
                            <div class="flex flex-col gap-2">
                                <Label html_for="url">"URL"</Label>
                                <Input
                                    id="url"
                                    r#type="url"
                                    placeholder="https://example.com"
                                    bind_value=url
                                />
                            </div>

                            <div class="flex flex-col gap-2">
                                <Label html_for="title">"Title"</Label>
                                <Input id="title" placeholder="Example" bind_value=title />
                            </div>

                            <Show when=move || form_error.get().is_some() fallback=|| ().into_view()>
                                {move || {
                                    form_error.get().map(|e| view! {
                                        <Alert class="border-destructive/30">
                                            <AlertDescription class="text-destructive">{e}</AlertDescription>
                                        </Alert>
                                    })
                                }}
                            </Show>

                            <Button
                                class="w-full"
                                size=ButtonSize::Sm
                                attr:disabled=move || add_loading.get()
                            >
                                <span class="inline-flex items-center gap-2">
                                    <Show when=move || add_loading.get() fallback=|| ().into_view()>
                                        <Spinner />
                                    </Show>
                                    {move || if add_loading.get() { "Saving..." } else { "Add bookmark" }}
                                </span>
                            </Button>
                        </form>
                    </CardContent>
                </Card>

                <Show when=move || bookmarks_error.get().is_some() fallback=|| ().into_view()>
                    {move || {
                        bookmarks_error.get().map(|e| view! {
                            <Alert class="mb-4 border-destructive/30">
                                <AlertDescription class="text-destructive">{e}</AlertDescription>
                            </Alert>
                        })
                    }}
                </Show>

                <Show when=move || delete_error.get().is_some() fallback=|| ().into_view()>
                    {move || {
                        delete_error.get().map(|e| view! {
                            <Alert class="mb-4 border-destructive/30">
                                <AlertDescription class="text-destructive">{e}</AlertDescription>
                            </Alert>
                        })
                    }}
                </Show>

                <Card>
                    <CardHeader>
                        <CardTitle class="text-base">"Bookmarks"</CardTitle>
                        <CardDescription>
                            {move || format!("{} total", bookmarks.get().len())}
                        </CardDescription>
                    </CardHeader>

                    <CardContent>
                        <Show
                            when=move || !bookmarks.get().is_empty()
                            fallback=move || view! {
                                <div class="text-xs text-muted-foreground">
                                    {move || if bookmarks_loading.get() {
                                        "Loading bookmarks..."
                                    } else {
                                        "No bookmarks yet."
                                    }}
                                </div>
                            }
                        >
                            <CardList>
                                {move || {
                                    bookmarks
                                        .get()
                                        .into_iter()
                                        .map(|b| {
                                            let id = b.id;
                                            view! {
                                                <CardItem class="justify-between gap-3 rounded-md border px-4 py-3">
                                                    <div class="flex min-w-0 flex-col gap-0.5">
                                                        <a
                                                            href=b.url.clone()
                                                            target="_blank"
                                                            rel="noreferrer"
                                                            class="truncate text-sm font-medium hover:underline"
                                                        >
                                                            {b.title}
                                                        </a>
                                                        <span class="truncate text-xs text-muted-foreground">{b.url}</span>
                                                    </div>

                                                    <Button
                                                        variant=ButtonVariant::Ghost
                                                        size=ButtonSize::Icon
                                                        class="h-7 w-7 text-muted-foreground hover:text-destructive"
                                                        attr:title="Delete"
                                                        on:click=move |_| on_delete(id)
                                                    >
                                                        <X />
                                                    </Button>
                                                </CardItem>
                                            }
                                        })
                                        .collect_view()
                                }}
                            </CardList>
                        </Show>
                    </CardContent>
                </Card>
            </div>
        </div>
    }
}
