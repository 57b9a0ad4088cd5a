//! Notifications sent to UI code

/// Broadcast to every subscriber of a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalizationEvent {
    /// A dialog of `app_id` is about to be shown
    DialogOpening { app_id: String },
    /// A dialog of `app_id` was closed
    DialogClosing { app_id: String },
    /// The UI language changed; strings of `app_id` must be fetched again
    Reapply { app_id: String, ui_language: String },
}

impl LocalizationEvent {
    #[must_use]
    pub fn app_id(&self) -> &str {
        match self {
            Self::DialogOpening { app_id }
            | Self::DialogClosing { app_id }
            | Self::Reapply { app_id, .. } => app_id,
        }
    }
}
