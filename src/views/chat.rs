use crate::conversation::{Entry, EntryId, MessageBody};
use crate::render::COPIED_FEEDBACK;
use crate::session::{ChatSession, drive_exchange};
use crate::types::Role;
use crate::ui::AppServices;
use dioxus::events::Key;
use dioxus::prelude::*;
use serde::Deserialize;
use std::time::{Duration, Instant};

pub const CHAT_CONTAINER_ID: &str = "chat-container";

/// Forwards clicks on injected copy buttons to Rust as `{entry, index}`.
const COPY_LISTENER_JS: &str = r#"
const container = document.getElementById('chat-container');
if (container && !container.dataset.copyListener) {
    container.dataset.copyListener = 'yes';
    container.addEventListener('click', (event) => {
        const button = event.target.closest('.copy-btn');
        if (!button) return;
        const message = button.closest('[data-entry-id]');
        if (!message) return;
        dioxus.send({
            entry: Number(message.dataset.entryId),
            index: Number(button.dataset.copyIndex),
        });
    });
}
await new Promise(() => {});
"#;

const FOCUS_PROMPT_JS: &str = "document.getElementById('prompt-input')?.focus();";

#[derive(Debug, Deserialize)]
struct CopyRequest {
    entry: u64,
    index: usize,
}

fn schedule_scroll(delay: Duration) {
    spawn(async move {
        tokio::time::sleep(delay).await;
        let script = format!(
            "const el = document.getElementById('{CHAT_CONTAINER_ID}'); if (el) {{ el.scrollTop = el.scrollHeight; }}"
        );
        let _ = document::eval(&script);
    });
}

fn scroll_if_requested(session: &mut Signal<ChatSession>) {
    if let Some(delay) = session.write().take_scroll_request() {
        schedule_scroll(delay);
    }
}

fn show_copy_label(id: EntryId, index: usize, label: &str, copied: bool) {
    let label = serde_json::to_string(label).unwrap_or_else(|_| "\"Copy\"".to_string());
    let script = format!(
        r#"const button = document.querySelector('[data-entry-id="{id}"] [data-copy-index="{index}"]');
if (button) {{
    button.classList.toggle('copied', {copied});
    const text = button.querySelector('.copy-text');
    if (text) text.textContent = {label};
}}"#
    );
    let _ = document::eval(&script);
}

#[cfg(not(target_arch = "wasm32"))]
fn copy_block(session: &mut Signal<ChatSession>, id: EntryId, index: usize) -> bool {
    let mut clipboard = crate::render::SystemClipboard;
    session
        .write()
        .copy_code_block(id, index, &mut clipboard, Instant::now())
}

#[cfg(target_arch = "wasm32")]
fn copy_block(session: &mut Signal<ChatSession>, id: EntryId, index: usize) -> bool {
    let Some(code) = session.peek().code_block_text(id, index) else {
        return false;
    };
    let Ok(code) = serde_json::to_string(&code) else {
        return false;
    };
    let _ = document::eval(&format!("navigator.clipboard.writeText({code});"));
    session.write().mark_copied(id, index, Instant::now());
    true
}

fn handle_copy_request(mut session: Signal<ChatSession>, request: CopyRequest) {
    let Some(id) = session.peek().log().find_id(request.entry) else {
        tracing::debug!(entry = request.entry, "copy request for unknown entry");
        return;
    };
    if !copy_block(&mut session, id, request.index) {
        return;
    }
    let label = session.peek().copy_label(id, request.index, Instant::now());
    show_copy_label(id, request.index, label, true);
    spawn(async move {
        tokio::time::sleep(COPIED_FEEDBACK).await;
        let now = Instant::now();
        let session = session.peek();
        let label = session.copy_label(id, request.index, now);
        show_copy_label(id, request.index, label, label != crate::render::copy::COPY_LABEL);
    });
}

fn render_entry(id: EntryId, entry: &Entry) -> Element {
    let Entry::Message(message) = entry else {
        let label = Role::Assistant.label();
        let class = Role::Assistant.css_class();
        return rsx! {
            div { class: "message {class}", "data-entry-id": "{id}",
                div { class: "message-label", "{label}" }
                div { class: "typing", span {} span {} span {} }
            }
        };
    };
    let view = message.view();
    let timestamp = message.timestamp_label();
    let body = match view.body {
        MessageBody::Text(text) => rsx! { div { class: "message-text", "{text}" } },
        MessageBody::Html(html) => rsx! { div { class: "md", dangerous_inner_html: "{html}" } },
    };
    rsx! {
        div { class: "message {view.class}", "data-entry-id": "{id}",
            div { class: "message-label", "{view.label}" }
            {body}
            if let Some(ts) = timestamp {
                div { class: "message-timestamp", "{ts}" }
            }
        }
    }
}

#[component]
pub fn ChatView(session: Signal<ChatSession>, input: Signal<String>) -> Element {
    let services = use_context::<AppServices>();
    let transport = use_hook(|| CopyValue::new(services.transport.clone()));
    let mut input = input;

    use_future(move || async move {
        let mut listener = document::eval(COPY_LISTENER_JS);
        loop {
            match listener.recv::<CopyRequest>().await {
                Ok(request) => handle_copy_request(session, request),
                Err(err) => {
                    tracing::debug!(?err, "copy listener stopped");
                    break;
                }
            }
        }
    });

    // Hand focus back to the composer whenever a reply ends.
    let input_ready = use_memo(move || session.read().input_enabled());
    use_effect(move || {
        if input_ready() {
            let _ = document::eval(FOCUS_PROMPT_JS);
        }
    });

    let mut send_message = move |text: String| {
        let mut session = session;
        let prompt = match session.write().submit(&text) {
            Ok(prompt) => prompt,
            Err(err) => {
                tracing::debug!(%err, "send ignored");
                return;
            }
        };
        input.set(String::new());
        scroll_if_requested(&mut session);

        let transport = transport.read().clone();
        spawn(async move {
            drive_exchange(&*transport, &prompt, |event| {
                session.write().handle(event);
                scroll_if_requested(&mut session);
            })
            .await;
        });
    };

    let snapshot = session.read();
    let input_enabled = snapshot.input_enabled();

    rsx! {
        div { id: CHAT_CONTAINER_ID,
            for (id, entry) in snapshot.log().entries() {
                {render_entry(id, entry)}
            }
        }

        form { class: "composer",
            onsubmit: move |ev| ev.prevent_default(),
            textarea {
                id: "prompt-input", rows: "1", placeholder: "Ask something…",
                value: "{input}",
                oninput: move |ev| input.set(ev.value()),
                onkeydown: move |ev| {
                    // Shift+Enter falls through and inserts a newline.
                    if ev.key() == Key::Enter && !ev.modifiers().shift() {
                        ev.prevent_default();
                        send_message(input());
                    }
                },
                disabled: !input_enabled, autofocus: true,
            }
            button {
                id: "send-btn", class: "btn btn-primary", r#type: "button",
                disabled: !input_enabled || input().trim().is_empty(),
                onclick: move |_| send_message(input()),
                "Send"
            }
        }
    }
}
