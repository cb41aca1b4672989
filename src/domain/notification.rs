use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    #[default]
    Default,
    Destructive,
}

/// Transient message shown after an action completes or fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub id: String,
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
    pub created_at: i64,
}

impl Toast {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        variant: ToastVariant,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            variant,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, ToastVariant::Default)
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::new("Error", description, ToastVariant::Destructive)
    }

    pub fn is_destructive(&self) -> bool {
        self.variant == ToastVariant::Destructive
    }
}

/// Sink for transient messages raised by action hooks.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}
