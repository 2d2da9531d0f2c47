//! API surface enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The remote API surfaces an endpoint can be resolved for.
///
/// Each variant owns exactly one relative path segment and one version
/// override slot in [`Settings`](crate::config::Settings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApiType {
    Completion,
    Chat,
    Edit,
    Embedding,
    File,
    FineTune,
    Model,
    Moderation,
    Image,
    AudioTranscription,
    AudioTranslation,
    Billing,
    Deployment,
}

impl ApiType {
    /// Every API type, in declaration order.
    pub const ALL: [ApiType; 13] = [
        ApiType::Completion,
        ApiType::Chat,
        ApiType::Edit,
        ApiType::Embedding,
        ApiType::File,
        ApiType::FineTune,
        ApiType::Model,
        ApiType::Moderation,
        ApiType::Image,
        ApiType::AudioTranscription,
        ApiType::AudioTranslation,
        ApiType::Billing,
        ApiType::Deployment,
    ];

    /// Relative path appended to the backend base URL.
    pub const fn path(self) -> &'static str {
        match self {
            ApiType::Completion => "completions",
            ApiType::Chat => "chat/completions",
            ApiType::Edit => "edits",
            ApiType::Embedding => "embeddings",
            ApiType::File => "files",
            ApiType::FineTune => "fine-tunes",
            ApiType::Model => "models",
            ApiType::Moderation => "moderations",
            ApiType::Image => "images",
            ApiType::AudioTranscription => "audio/transcriptions",
            ApiType::AudioTranslation => "audio/translations",
            ApiType::Billing => "dashboard/billing/usage",
            ApiType::Deployment => "deployments",
        }
    }

    /// Whether the managed backend addresses this type through a named
    /// deployment. Resource-wide types (files, fine-tunes, billing, models,
    /// deployments) are not.
    pub const fn is_deployment_scoped(self) -> bool {
        !matches!(
            self,
            ApiType::File
                | ApiType::FineTune
                | ApiType::Billing
                | ApiType::Model
                | ApiType::Deployment
        )
    }

    /// Deployment-scoped types only.
    pub fn deployment_scoped() -> impl Iterator<Item = ApiType> {
        Self::ALL.into_iter().filter(|t| t.is_deployment_scoped())
    }

    /// Stable name, used in registry keys and environment variable suffixes.
    pub const fn as_str(self) -> &'static str {
        match self {
            ApiType::Completion => "Completion",
            ApiType::Chat => "Chat",
            ApiType::Edit => "Edit",
            ApiType::Embedding => "Embedding",
            ApiType::File => "File",
            ApiType::FineTune => "FineTune",
            ApiType::Model => "Model",
            ApiType::Moderation => "Moderation",
            ApiType::Image => "Image",
            ApiType::AudioTranscription => "AudioTranscription",
            ApiType::AudioTranslation => "AudioTranslation",
            ApiType::Billing => "Billing",
            ApiType::Deployment => "Deployment",
        }
    }
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiType {
    type Err = String;

    /// Case-insensitive; underscores and dashes are ignored so that
    /// `AUDIO_TRANSCRIPTION`, `fine-tune` and `FineTune` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        ApiType::ALL
            .into_iter()
            .find(|t| t.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| format!("unknown API type '{s}'"))
    }
}
