use crate::config::Config;
use crate::prompts::{HttpPromptBackend, PendingDeletion, PromptLibrary};
use crate::session::ChatSession;
use crate::storage::PreferenceStore;
use crate::theme::{BASE_CSS, code_css, load_theme, save_theme, theme_definition};
use crate::transport::HttpTransport;
use crate::types::ThemeMode;
use crate::views::{ChatView, PromptPanel, PromptToggle};
use dioxus::prelude::*;
use std::rc::Rc;

/// Shared handles, provided once at the root.
#[derive(Clone)]
pub struct AppServices {
    pub config: Config,
    pub transport: Rc<HttpTransport>,
    pub prompts: Rc<HttpPromptBackend>,
    pub store: PreferenceStore,
}

impl AppServices {
    pub fn new(config: Config) -> Self {
        Self {
            transport: Rc::new(HttpTransport::new(config.clone())),
            prompts: Rc::new(HttpPromptBackend::new(config.clone())),
            store: PreferenceStore::default(),
            config,
        }
    }
}

#[component]
pub fn App() -> Element {
    let services = use_context_provider(|| AppServices::new(Config::from_env()));
    let theme = use_signal(|| load_theme(&services.store));
    let session = use_signal(ChatSession::default);
    let input = use_signal(String::new);
    let library = use_signal(PromptLibrary::new);
    let pending = use_signal(|| Option::<PendingDeletion>::None);

    rsx! {
        ThemeStyles { theme: theme() }
        div { class: "app", "data-theme": theme_definition(theme()).attribute,
            AppHeader { theme, library }
            ChatView { session, input }
            PromptPanel { library, pending, composer: input }
        }
    }
}

#[component]
fn ThemeStyles(theme: ThemeMode) -> Element {
    let services = use_context::<AppServices>();
    let definition = theme_definition(theme);
    let highlight_css = code_css(theme, &services.config);
    rsx! {
        style { dangerous_inner_html: "{BASE_CSS}" }
        style { dangerous_inner_html: "{definition.css}" }
        style { dangerous_inner_html: "{highlight_css}" }
    }
}

#[component]
fn AppHeader(theme: Signal<ThemeMode>, library: Signal<PromptLibrary>) -> Element {
    let services = use_context::<AppServices>();
    let mut theme = theme;
    let definition = theme_definition(theme());
    rsx! {
        div { class: "header",
            span { class: "header-title", "streamdesk" }
            div { class: "header-actions",
                PromptToggle { library }
                button {
                    id: "theme-toggle", class: "btn", r#type: "button",
                    onclick: move |_| {
                        let next = theme().toggled();
                        theme.set(next);
                        if let Err(err) = save_theme(&services.store, next) {
                            tracing::warn!(%err, "failed to save theme");
                        }
                    },
                    "{definition.toggle_label}"
                }
            }
        }
    }
}
