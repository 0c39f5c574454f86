//! Channels a pipeline can be created from.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Channel a pipeline was created from, stored as upper-case text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString, IntoStaticStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ChannelCode {
    /// Regular build service pipelines.
    #[default]
    Bs,
    /// Pipelines created by the app market.
    Am,
    /// Code check pipelines.
    Codecc,
    /// Pipelines created by the cloud console.
    Gcloud,
    /// Pipelines created by the git service.
    Git,
    /// Scheduled repository scan pipelines.
    Gongfengscan,
    /// Enterprise code check pipelines.
    CodeccEe,
}

impl ChannelCode {
    /// Returns the stored text of this channel.
    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Parses stored channel text, returning `None` for unknown channels.
    pub fn from_stored(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}
