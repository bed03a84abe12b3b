use crate::render::RenderedHtml;
use crate::types::Role;
use std::time::Duration;
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};

/// Delay before scrolling, so layout of the new content settles first.
pub const SCROLL_SETTLE_DELAY: Duration = Duration::from_millis(50);

const MESSAGE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour repr:12 padding:zero]:[minute padding:zero] [period case:upper]");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    #[error("no entry with id {0}")]
    NotFound(EntryId),
    #[error("entry {0} is not a placeholder")]
    NotAPlaceholder(EntryId),
    #[error("entry {0} is not a message")]
    NotAMessage(EntryId),
    #[error("message {0} is finalized")]
    Frozen(EntryId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    role: Role,
    text: String,
    rendered: Option<RenderedHtml>,
    finalized: bool,
    created_at: OffsetDateTime,
}

impl Message {
    /// User messages are immutable from creation.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            rendered: None,
            finalized: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn assistant(text: impl Into<String>, rendered: RenderedHtml) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            rendered: Some(rendered),
            finalized: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Freeze before the message is appended, for replies that never stream.
    pub fn finalize_in_place(&mut self) {
        self.finalized = true;
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rendered(&self) -> Option<&RenderedHtml> {
        self.rendered.as_ref()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn timestamp_label(&self) -> Option<String> {
        let mut datetime = self.created_at;
        if let Ok(offset) = UtcOffset::current_local_offset() {
            datetime = datetime.to_offset(offset);
        }
        datetime.format(MESSAGE_TIME_FORMAT).ok()
    }

    /// Build the view from the fixed {label, body} layout.
    pub fn view(&self) -> MessageView<'_> {
        let body = match (&self.role, &self.rendered) {
            (Role::Assistant, Some(rendered)) => MessageBody::Html(&rendered.html),
            _ => MessageBody::Text(&self.text),
        };
        MessageView {
            label: self.role.label(),
            class: self.role.css_class(),
            body,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageBody<'a> {
    /// Shown verbatim, never interpreted as markup.
    Text(&'a str),
    Html(&'a str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageView<'a> {
    pub label: &'static str,
    pub class: &'static str,
    pub body: MessageBody<'a>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    /// Transient "typing" indicator, never part of the transcript.
    Placeholder,
    Message(Message),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Slot {
    id: EntryId,
    entry: Entry,
}

/// Ordered, append-only list of what the chat shows.
#[derive(Clone, Debug, Default)]
pub struct ConversationLog {
    slots: Vec<Slot>,
    next_id: u64,
    scroll_requested: bool,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }

    fn push(&mut self, entry: Entry) -> EntryId {
        let id = self.allocate();
        self.slots.push(Slot { id, entry });
        self.scroll_requested = true;
        id
    }

    fn slot_mut(&mut self, id: EntryId) -> Result<&mut Slot, LogError> {
        self.slots
            .iter_mut()
            .find(|slot| slot.id == id)
            .ok_or(LogError::NotFound(id))
    }

    fn open_message_mut(&mut self, id: EntryId) -> Result<&mut Message, LogError> {
        match &mut self.slot_mut(id)?.entry {
            Entry::Message(message) if message.finalized => Err(LogError::Frozen(id)),
            Entry::Message(message) => Ok(message),
            Entry::Placeholder => Err(LogError::NotAMessage(id)),
        }
    }

    pub fn append(&mut self, message: Message) -> EntryId {
        self.push(Entry::Message(message))
    }

    pub fn show_placeholder(&mut self) -> EntryId {
        self.push(Entry::Placeholder)
    }

    /// Swap the placeholder for `message` in place; the entry keeps its id and position.
    pub fn replace_pending(&mut self, placeholder: EntryId, message: Message) -> Result<EntryId, LogError> {
        let slot = self.slot_mut(placeholder)?;
        if slot.entry != Entry::Placeholder {
            return Err(LogError::NotAPlaceholder(placeholder));
        }
        slot.entry = Entry::Message(message);
        self.scroll_requested = true;
        Ok(placeholder)
    }

    pub fn remove_placeholder(&mut self, placeholder: EntryId) -> Result<(), LogError> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.id == placeholder)
            .ok_or(LogError::NotFound(placeholder))?;
        if self.slots[index].entry != Entry::Placeholder {
            return Err(LogError::NotAPlaceholder(placeholder));
        }
        self.slots.remove(index);
        self.scroll_requested = true;
        Ok(())
    }

    pub fn append_text(&mut self, id: EntryId, piece: &str) -> Result<(), LogError> {
        self.open_message_mut(id)?.text.push_str(piece);
        self.scroll_requested = true;
        Ok(())
    }

    pub fn set_rendered(&mut self, id: EntryId, rendered: RenderedHtml) -> Result<(), LogError> {
        self.open_message_mut(id)?.rendered = Some(rendered);
        Ok(())
    }

    /// Freeze the message; later mutations fail with [`LogError::Frozen`].
    pub fn finalize(&mut self, id: EntryId) -> Result<(), LogError> {
        self.open_message_mut(id)?.finalized = true;
        Ok(())
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.slots
            .iter()
            .find(|slot| slot.id == id)
            .map(|slot| &slot.entry)
    }

    /// Resolve an id that went through the page as a plain number.
    pub fn find_id(&self, value: u64) -> Option<EntryId> {
        self.slots
            .iter()
            .map(|slot| slot.id)
            .find(|id| id.value() == value)
    }

    pub fn message(&self, id: EntryId) -> Option<&Message> {
        match self.get(id)? {
            Entry::Message(message) => Some(message),
            Entry::Placeholder => None,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (EntryId, &Entry)> {
        self.slots.iter().map(|slot| (slot.id, &slot.entry))
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.slots.iter().filter_map(|slot| match &slot.entry {
            Entry::Message(message) => Some(message),
            Entry::Placeholder => None,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn has_placeholder(&self) -> bool {
        self.slots.iter().any(|slot| slot.entry == Entry::Placeholder)
    }

    pub fn open_message_count(&self) -> usize {
        self.messages().filter(|message| !message.finalized).count()
    }

    /// Pending scroll-to-bottom, with the delay to wait before performing it.
    pub fn take_scroll_request(&mut self) -> Option<Duration> {
        std::mem::take(&mut self.scroll_requested).then_some(SCROLL_SETTLE_DELAY)
    }
}
