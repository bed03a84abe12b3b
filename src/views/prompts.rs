use crate::prompts::{PendingDeletion, PromptLibrary, fetch_prompts, save_prompt};
use crate::ui::AppServices;
use dioxus::events::Key;
use dioxus::prelude::*;

#[component]
pub fn PromptToggle(library: Signal<PromptLibrary>) -> Element {
    let mut library = library;
    let open = library.read().is_open();
    let label = if open { "Close prompts" } else { "Prompts" };
    rsx! {
        button {
            id: "toggle-prompts",
            class: if open { "btn active" } else { "btn" },
            r#type: "button",
            onclick: move |_| {
                library.write().toggle();
            },
            "{label}"
        }
    }
}

#[component]
pub fn PromptPanel(
    library: Signal<PromptLibrary>,
    pending: Signal<Option<PendingDeletion>>,
    composer: Signal<String>,
) -> Element {
    let services = use_context::<AppServices>();
    let backend = use_hook(|| CopyValue::new(services.prompts.clone()));
    let mut library = library;
    let mut pending = pending;
    let mut composer = composer;
    let mut new_prompt = use_signal(String::new);

    use_future(move || async move {
        let backend = backend.read().clone();
        if let Ok(texts) = fetch_prompts(&*backend).await {
            library.write().apply_loaded(texts);
        }
    });

    let mut add_prompt = move || {
        let text = match library.peek().check_new(&new_prompt()) {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(%err, "prompt not added");
                return;
            }
        };
        let backend = backend.read().clone();
        spawn(async move {
            if save_prompt(&*backend, &text).await.is_ok() {
                library.write().apply_added(&text);
                new_prompt.set(String::new());
            }
        });
    };

    let snapshot = library.read();
    let open = snapshot.is_open();

    rsx! {
        div { id: "prompt-library", class: if open { "prompt-library expanded" } else { "prompt-library" },
            div { class: "prompt-add",
                input {
                    id: "new-prompt-input",
                    placeholder: "Save a new prompt",
                    value: "{new_prompt}",
                    oninput: move |ev| new_prompt.set(ev.value()),
                    onkeydown: move |ev| {
                        if ev.key() == Key::Enter {
                            ev.prevent_default();
                            add_prompt();
                        }
                    },
                }
                button {
                    id: "add-prompt-direct", class: "btn", r#type: "button",
                    onclick: move |_| add_prompt(),
                    "Add"
                }
            }
            div { id: "prompt-list",
                for entry in snapshot.entries().iter().cloned() {
                    div { class: "prompt-item",
                        div { class: "prompt-text", title: "{entry.text}", "{entry.text}" }
                        button {
                            class: "btn use-btn", r#type: "button",
                            onclick: {
                                let text = entry.text.clone();
                                move |_| {
                                    let composed = library.write().prompt_for_input(&text);
                                    composer.set(composed);
                                }
                            },
                            "Use"
                        }
                        button {
                            class: "btn delete-btn", r#type: "button",
                            onclick: {
                                let text = entry.text.clone();
                                move |_| {
                                    let request = library.peek().request_delete(&text);
                                    pending.set(Some(request));
                                }
                            },
                            "X"
                        }
                    }
                }
            }
        }
        if let Some(request) = pending() {
            ConfirmDelete { request, library, pending }
        }
    }
}

#[component]
fn ConfirmDelete(
    request: PendingDeletion,
    library: Signal<PromptLibrary>,
    pending: Signal<Option<PendingDeletion>>,
) -> Element {
    let services = use_context::<AppServices>();
    let backend = use_hook(|| CopyValue::new(services.prompts.clone()));
    let mut library = library;
    let mut pending = pending;
    let preview = request.preview();

    let mut cancel = move || {
        if let Some(request) = pending.take() {
            request.cancel();
        }
    };

    rsx! {
        div { class: "confirm-overlay",
            onclick: move |_| cancel(),
            div { class: "confirm-box",
                onclick: move |ev| ev.stop_propagation(),
                p { "Delete this prompt?" }
                p { class: "confirm-text", "\"{preview}\"" }
                div { class: "confirm-actions",
                    button {
                        class: "btn btn-primary btn-confirm", r#type: "button",
                        onclick: move |_| {
                            let Some(request) = pending.take() else {
                                return;
                            };
                            let backend = backend.read().clone();
                            spawn(async move {
                                if request.send(&*backend).await.is_ok() {
                                    library.write().apply_removed(request.text());
                                }
                            });
                        },
                        "Yes"
                    }
                    button {
                        class: "btn btn-cancel", r#type: "button",
                        onclick: move |_| cancel(),
                        "Cancel"
                    }
                }
            }
        }
    }
}
