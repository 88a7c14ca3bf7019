//! User-visible notifications ("toasts") emitted by every provider operation

use std::fmt::{Display, Error as FmtError, Formatter};

use crate::error::Error;

/// Something the user should be told about
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    Success(String),
    Failure{ context: String, error: Error },
}

impl Notification {
    pub fn is_success(&self) -> bool {
        matches!(self, Notification::Success(_))
    }

    /// The error this notification reports, if any
    pub fn error(&self) -> Option<&Error> {
        match self {
            Notification::Success(_) => None,
            Notification::Failure{ error, .. } => Some(error),
        }
    }
}

impl Display for Notification {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Notification::Success(text) => write!(f, "{}", text),
            Notification::Failure{ context, error } => write!(f, "{}: {}", context, error),
        }
    }
}



/// See [`notification_channel`]
pub type NotificationSender = tokio::sync::mpsc::UnboundedSender<Notification>;
/// See [`notification_channel`]
pub type NotificationReceiver = tokio::sync::mpsc::UnboundedReceiver<Notification>;

/// Create a notification channel, that a view layer can use to display toasts
pub fn notification_channel() -> (NotificationSender, NotificationReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}



/// Logs outcomes of operations and forwards them to the listener (if any)
#[derive(Debug, Default)]
pub struct Notifier {
    n_errors: u32,
    last: Option<Notification>,
    channel: Option<NotificationSender>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn new_with_channel(channel: NotificationSender) -> Self {
        Self { n_errors: 0, last: None, channel: Some(channel) }
    }

    /// How many failures were notified so far
    pub fn error_count(&self) -> u32 {
        self.n_errors
    }

    pub fn last(&self) -> Option<&Notification> {
        self.last.as_ref()
    }

    pub fn success(&mut self, text: &str) {
        log::info!("{}", text);
        self.send(Notification::Success(text.to_string()));
    }

    pub fn failure(&mut self, context: &str, error: Error) {
        match &error {
            Error::Store{ .. } => log::error!("{}: {}", context, error),
            _ => log::warn!("{}: {}", context, error),
        }
        self.n_errors += 1;
        self.send(Notification::Failure{ context: context.to_string(), error });
    }

    fn send(&mut self, notification: Notification) {
        if let Some(sender) = &self.channel {
            if sender.send(notification.clone()).is_err() {
                log::debug!("Notification listener has gone away");
            }
        }
        self.last = Some(notification);
    }
}
