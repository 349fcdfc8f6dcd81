use ragchat_core::{MessageId, Role, SessionSnapshot};

/// Turns successive snapshots into the text that still has to be printed.
///
/// Only the latest assistant message is followed. Its content only ever
/// grows while a turn is live, so the new text is the suffix past what was
/// printed before.
#[derive(Debug, Default)]
pub struct Printer {
    message: Option<MessageId>,
    printed: usize,
}

impl Printer {
    pub fn diff<'a>(&mut self, snapshot: &'a SessionSnapshot) -> &'a str {
        let Some(msg) = snapshot
            .messages
            .last()
            .filter(|m| m.role() == Role::Assistant)
        else {
            return "";
        };
        if self.message != Some(msg.id()) {
            self.message = Some(msg.id());
            self.printed = 0;
        }

        let content = msg.content();
        let new_text = content.get(self.printed..).unwrap_or_default();
        self.printed = content.len();
        new_text
    }
}
