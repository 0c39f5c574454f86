use ci_summary_core::BuildStatus;
use ci_summary_postgres::types::{ChannelCode, OffsetPagination, OverviewFilter};
use clap::{Args, Subcommand};

/// Operations on the summary store.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Apply pending migrations, or report their status.
    Migrate {
        /// Only report applied and pending migrations.
        #[arg(long)]
        status: bool,
    },

    /// Create the summary row of a new pipeline.
    Create {
        pipeline_id: String,
        project_id: String,
        /// Initial display build number.
        #[arg(long)]
        build_no: Option<i32>,
    },

    /// Delete the summary row of a pipeline.
    Delete { pipeline_id: String },

    /// Show the summaries of one or more pipelines.
    Show {
        #[arg(required = true)]
        pipeline_ids: Vec<String>,
    },

    /// List pipeline overviews joined with their summaries.
    List(ListArgs),

    /// Record builds entering (or, if negative, leaving) the queue.
    Enqueue {
        pipeline_id: String,
        #[arg(default_value_t = 1, allow_negative_numbers = true)]
        count: i32,
    },

    /// Record a queued build starting.
    Start {
        pipeline_id: String,
        build_id: String,
        /// User who started the build.
        #[arg(long)]
        user: String,
        /// Number of tasks in the build.
        #[arg(long, default_value_t = 0)]
        task_count: i32,
    },

    /// Record the task currently executing in a build.
    Task {
        pipeline_id: String,
        build_id: String,
        task_id: String,
        task_name: String,
    },

    /// Record a build reaching a terminal status.
    Finish {
        pipeline_id: String,
        build_id: String,
        /// Terminal status, e.g. `succeed`, `failed` or `canceled`.
        #[arg(long)]
        status: BuildStatus,
    },

    /// Adjust the running count of the latest build for stage parallelism.
    Adjust {
        pipeline_id: String,
        build_id: String,
        #[arg(allow_negative_numbers = true)]
        delta: i32,
    },

    /// Allocate the next build number, or override the counter.
    Allocate {
        pipeline_id: String,
        /// Set the counter to this value instead of allocating.
        #[arg(long)]
        set: Option<i32>,
    },

    /// Show or set the display build number.
    BuildNo {
        pipeline_id: String,
        #[arg(long)]
        set: Option<i32>,
    },

    /// Overwrite the counters with externally computed values.
    Reconcile {
        pipeline_id: String,
        #[arg(long)]
        queue: i32,
        #[arg(long)]
        running: i32,
        #[arg(long)]
        finish: i32,
    },
}

impl Command {
    /// Returns the subcommand name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Migrate { .. } => "migrate",
            Self::Create { .. } => "create",
            Self::Delete { .. } => "delete",
            Self::Show { .. } => "show",
            Self::List(_) => "list",
            Self::Enqueue { .. } => "enqueue",
            Self::Start { .. } => "start",
            Self::Task { .. } => "task",
            Self::Finish { .. } => "finish",
            Self::Adjust { .. } => "adjust",
            Self::Allocate { .. } => "allocate",
            Self::BuildNo { .. } => "build-no",
            Self::Reconcile { .. } => "reconcile",
        }
    }
}

/// Filters and paging of the `list` command.
#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Restrict to these projects.
    #[arg(long = "project")]
    pub projects: Vec<String>,

    /// Restrict to these channels.
    #[arg(long = "channel")]
    pub channels: Vec<ChannelCode>,

    /// Restrict to these pipelines.
    #[arg(long = "pipeline")]
    pub pipelines: Vec<String>,

    /// List deleted pipelines instead of live ones.
    #[arg(long)]
    pub deleted: bool,

    /// Page size (1-1000).
    #[arg(long, default_value_t = 50)]
    pub limit: i64,

    /// Rows to skip.
    #[arg(long, default_value_t = 0)]
    pub offset: i64,

    /// Also report the total number of matches.
    #[arg(long)]
    pub count: bool,
}

impl ListArgs {
    /// Returns the overview filter described by the arguments.
    pub fn filter(&self) -> OverviewFilter {
        OverviewFilter::new()
            .with_projects(self.projects.iter().cloned())
            .with_channels(self.channels.iter().copied())
            .with_pipelines(self.pipelines.iter().cloned())
            .deleted(self.deleted)
    }

    /// Returns the clamped pagination described by the arguments.
    pub fn pagination(&self) -> OffsetPagination {
        let pagination = OffsetPagination::new(self.limit, self.offset);
        if self.count {
            pagination.with_count()
        } else {
            pagination
        }
    }
}
