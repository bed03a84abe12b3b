use crate::config::Config;
use crate::render::highlight::HIGHLIGHT_CLASS_STYLE;
use crate::storage::{PreferenceStore, StorageError};
use crate::types::ThemeMode;
use once_cell::sync::Lazy;
use syntect::highlighting::ThemeSet;
use syntect::html::css_for_theme_with_class_style;

pub const THEME_KEY: &str = "theme";

static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

pub struct ThemeDefinition {
    pub css: &'static str,
    /// Value for the root element's `data-theme` attribute.
    pub attribute: &'static str,
    pub toggle_label: &'static str,
}

pub fn theme_definition(mode: ThemeMode) -> ThemeDefinition {
    match mode {
        ThemeMode::Dark => ThemeDefinition {
            css: DARK_THEME,
            attribute: "dark",
            toggle_label: "Light mode",
        },
        ThemeMode::Light => ThemeDefinition {
            css: LIGHT_THEME,
            attribute: "light",
            toggle_label: "Dark mode",
        },
    }
}

/// Stylesheet for highlighted code in `mode`, from the configured syntect theme.
///
/// An unknown theme name falls back to the built-in default for that mode.
pub fn code_css(mode: ThemeMode, config: &Config) -> String {
    let (configured, fallback) = match mode {
        ThemeMode::Dark => (&config.dark_code_theme, crate::config::DEFAULT_DARK_CODE_THEME),
        ThemeMode::Light => (&config.light_code_theme, crate::config::DEFAULT_LIGHT_CODE_THEME),
    };
    let theme = THEME_SET
        .themes
        .get(configured.as_str())
        .or_else(|| {
            tracing::warn!(theme = %configured, "unknown code theme, using default");
            THEME_SET.themes.get(fallback)
        });
    let Some(theme) = theme else {
        return String::new();
    };
    match css_for_theme_with_class_style(theme, HIGHLIGHT_CLASS_STYLE) {
        Ok(css) => css,
        Err(err) => {
            tracing::warn!(%err, "failed to build code stylesheet");
            String::new()
        }
    }
}

/// Saved preference, or dark when nothing valid is stored.
pub fn load_theme(store: &PreferenceStore) -> ThemeMode {
    store
        .get(THEME_KEY)
        .map(|value| ThemeMode::parse(&value))
        .unwrap_or_default()
}

pub fn save_theme(store: &PreferenceStore, mode: ThemeMode) -> Result<(), StorageError> {
    store.set(THEME_KEY, mode.as_str())
}

pub const BASE_CSS: &str = r#"
* { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, -apple-system, "Segoe UI", sans-serif; font-size: 15px; }
.app { display: flex; flex-direction: column; height: 100vh; }
.header { display: flex; align-items: center; justify-content: space-between; padding: 0.75rem 1.25rem; border-bottom: 1px solid var(--color-input-border); }
.header-title { font-weight: 600; letter-spacing: 0.02em; }
.btn { border: 1px solid var(--color-input-border); background: transparent; color: var(--color-text-primary); border-radius: 6px; padding: 0.4rem 0.8rem; cursor: pointer; }
.btn:disabled { opacity: 0.5; cursor: default; }
.btn-primary { border-color: var(--color-border); }
#chat-container { flex: 1; overflow-y: auto; padding: 1rem 1.25rem; display: flex; flex-direction: column; gap: 0.9rem; }
.message { max-width: 80%; padding: 0.6rem 0.9rem; border-radius: 10px; }
.message.user { align-self: flex-end; background: var(--color-chat-user-bg); color: var(--color-chat-user-text); white-space: pre-wrap; }
.message.bot { align-self: flex-start; background: var(--color-chat-assistant-bg); color: var(--color-chat-assistant-text); border: 1px solid var(--color-input-border); }
.message-label { font-size: 0.75rem; font-weight: 600; margin-bottom: 0.25rem; color: var(--color-text-muted); }
.message.user .message-label { color: inherit; opacity: 0.7; }
.message-timestamp { font-size: 0.7rem; color: var(--color-timestamp); margin-top: 0.3rem; }
.md pre { position: relative; background: var(--color-code-bg); padding: 0.8rem; border-radius: 6px; overflow-x: auto; }
.md code { font-family: ui-monospace, "SFMono-Regular", Menlo, monospace; font-size: 0.85rem; }
.md table { border-collapse: collapse; }
.md th, .md td { border: 1px solid var(--color-input-border); padding: 0.25rem 0.5rem; }
.copy-btn { position: absolute; top: 0.4rem; right: 0.4rem; font-size: 0.7rem; padding: 0.15rem 0.5rem; border-radius: 4px; border: 1px solid var(--color-input-border); background: var(--color-bg-secondary); color: var(--color-text-primary); cursor: pointer; }
.copy-btn.copied { border-color: var(--color-accent); color: var(--color-accent); }
.typing { display: inline-flex; gap: 4px; padding: 0.3rem 0; }
.typing span { width: 7px; height: 7px; border-radius: 50%; background: var(--color-text-muted); animation: typing-bounce 1.2s infinite ease-in-out; }
.typing span:nth-child(2) { animation-delay: 0.15s; }
.typing span:nth-child(3) { animation-delay: 0.3s; }
@keyframes typing-bounce { 0%, 80%, 100% { opacity: 0.3; transform: translateY(0); } 40% { opacity: 1; transform: translateY(-4px); } }
.composer { display: flex; gap: 0.5rem; align-items: flex-end; padding: 0.75rem 1.25rem; border-top: 1px solid var(--color-input-border); background: var(--color-bg-overlay); }
.composer textarea { flex: 1; resize: none; min-height: 2.4rem; max-height: 12rem; padding: 0.55rem 0.7rem; border-radius: 8px; border: 1px solid var(--color-input-border); background: var(--color-input-bg); color: var(--color-text-primary); font: inherit; }
.composer textarea:focus { outline: none; border-color: var(--color-border); }
.prompt-library { border-top: 1px solid var(--color-input-border); max-height: 0; overflow: hidden; transition: max-height 0.2s ease; }
.prompt-library.expanded { max-height: 18rem; overflow-y: auto; }
.prompt-add { display: flex; gap: 0.5rem; padding: 0.6rem 1.25rem; }
.prompt-add input { flex: 1; padding: 0.4rem 0.6rem; border-radius: 6px; border: 1px solid var(--color-input-border); background: var(--color-input-bg); color: var(--color-text-primary); }
.prompt-item { display: flex; align-items: center; gap: 0.5rem; padding: 0.35rem 1.25rem; }
.prompt-text { flex: 1; white-space: nowrap; overflow: hidden; text-overflow: ellipsis; }
.confirm-overlay { position: fixed; inset: 0; display: flex; align-items: center; justify-content: center; background: rgba(0, 0, 0, 0.5); }
.confirm-box { background: var(--color-bg-secondary); color: var(--color-text-primary); padding: 1.2rem 1.5rem; border-radius: 10px; max-width: 26rem; }
.confirm-text { font-style: italic; color: var(--color-text-muted); }
.confirm-actions { display: flex; gap: 0.5rem; justify-content: flex-end; }
"#;

const DARK_THEME: &str = r#"
:root {
    --color-bg-primary: #000000;
    --color-bg-secondary: #111111;
    --color-bg-overlay: rgba(0, 0, 0, 0.9);
    --color-text-primary: #ffffff;
    --color-text-muted: #cfcfcf;
    --color-border: #ffffff;
    --color-input-border: #2a2a2a;
    --color-input-bg: #000000;
    --color-chat-user-bg: #ffffff;
    --color-chat-user-text: #000000;
    --color-chat-assistant-bg: #050505;
    --color-chat-assistant-text: #ffffff;
    --color-code-bg: #2b303b;
    --color-timestamp: #9b9b9b;
    --color-accent: #ff3509;
}
body { background: var(--color-bg-primary); color: var(--color-text-primary); }
"#;

const LIGHT_THEME: &str = r#"
:root {
    --color-bg-primary: #ffffff;
    --color-bg-secondary: #f5f5f5;
    --color-bg-overlay: rgba(255, 255, 255, 0.92);
    --color-text-primary: #000000;
    --color-text-muted: #4a4a4a;
    --color-border: #000000;
    --color-input-border: #c2c2c2;
    --color-input-bg: #ffffff;
    --color-chat-user-bg: #111111;
    --color-chat-user-text: #ffffff;
    --color-chat-assistant-bg: #ffffff;
    --color-chat-assistant-text: #000000;
    --color-code-bg: #f7f7f7;
    --color-timestamp: #606060;
    --color-accent: #d12c06;
}
body { background: var(--color-bg-primary); color: var(--color-text-primary); }
"#;
