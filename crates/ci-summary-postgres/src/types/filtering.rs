//! Filters of the pipeline overview listing.

use serde::{Deserialize, Serialize};

use super::ChannelCode;

/// Restricts which pipelines an overview listing returns.
///
/// Empty sets place no restriction on their column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewFilter {
    /// Owning projects.
    #[serde(default)]
    pub project_ids: Vec<String>,
    /// Channels the pipelines were created from.
    #[serde(default)]
    pub channels: Vec<ChannelCode>,
    /// Specific pipelines.
    #[serde(default)]
    pub pipeline_ids: Vec<String>,
    /// Whether to list deleted pipelines instead of live ones.
    #[serde(default)]
    pub deleted: bool,
}

impl OverviewFilter {
    /// Creates a filter that matches every live pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches the live pipelines of one project created from `channel`.
    pub fn for_project(project_id: impl Into<String>, channel: ChannelCode) -> Self {
        Self::new().with_projects([project_id]).with_channels([channel])
    }

    /// Matches the given live pipelines regardless of project or channel.
    pub fn for_pipelines<I, S>(pipeline_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new().with_pipelines(pipeline_ids)
    }

    /// Restricts the listing to the given projects.
    pub fn with_projects<I, S>(mut self, project_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.project_ids.extend(project_ids.into_iter().map(Into::into));
        self
    }

    /// Restricts the listing to the given channels.
    pub fn with_channels(mut self, channels: impl IntoIterator<Item = ChannelCode>) -> Self {
        self.channels.extend(channels);
        self
    }

    /// Restricts the listing to the given pipelines.
    pub fn with_pipelines<I, S>(mut self, pipeline_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pipeline_ids.extend(pipeline_ids.into_iter().map(Into::into));
        self
    }

    /// Lists deleted pipelines instead of live ones.
    pub fn deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    /// Returns the channels as stored text.
    pub(crate) fn channel_codes(&self) -> Vec<&'static str> {
        self.channels.iter().copied().map(ChannelCode::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_everything_live() {
        let filter = OverviewFilter::new();
        assert!(filter.project_ids.is_empty());
        assert!(filter.channels.is_empty());
        assert!(filter.pipeline_ids.is_empty());
        assert!(!filter.deleted);
    }

    #[test]
    fn project_channel_shortcut() {
        let filter = OverviewFilter::for_project("proj", ChannelCode::Bs).with_pipelines(["p-1"]);
        assert_eq!(filter.project_ids, vec!["proj".to_owned()]);
        assert_eq!(filter.channel_codes(), vec!["BS"]);
        assert_eq!(filter.pipeline_ids, vec!["p-1".to_owned()]);
    }

    #[test]
    fn pipelines_shortcut() {
        let filter = OverviewFilter::for_pipelines(vec!["p-1".to_owned(), "p-2".to_owned()]);
        assert!(filter.project_ids.is_empty());
        assert_eq!(filter.pipeline_ids.len(), 2);
    }
}
