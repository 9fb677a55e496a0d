use anyhow::Result;
use async_trait::async_trait;
use kaizen_types::CallbackAction;

/// One inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            text: text.into(),
            data: action.encode(),
        }
    }
}

/// Rows of buttons, top to bottom.
pub type Keyboard = Vec<Vec<Button>>;

/// Outbound side of the chat transport. The server wires this to the
/// Telegram Bot API; tests use a recording fake.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a plain-text message and return its message id.
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<i32>;

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()>;

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;

    /// Raw bytes of an uploaded file (voice notes).
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl Sender {
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("there")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group { title: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: i64,
    pub kind: ChatKind,
}

impl Chat {
    pub fn private(id: i64) -> Self {
        Self {
            id,
            kind: ChatKind::Private,
        }
    }

    pub fn group(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            kind: ChatKind::Group {
                title: title.into(),
            },
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self.kind, ChatKind::Private)
    }

    pub fn title(&self) -> Option<&str> {
        match &self.kind {
            ChatKind::Group { title } => Some(title),
            ChatKind::Private => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub file_id: String,
    pub duration_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat: Chat,
    pub from: Sender,
    pub text: Option<String>,
    pub voice: Option<Voice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCallback {
    pub id: String,
    pub from: Sender,
    /// Chat and message the button was attached to, when Telegram still
    /// has it.
    pub message: Option<(i64, i32)>,
    pub data: String,
}

/// The bot's own membership in a chat changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipChange {
    Added { chat: Chat, by: Sender },
    Removed { chat_id: i64 },
}
