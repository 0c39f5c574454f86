//! Value types shared by the models and queries.

mod channel_code;
mod constraints;
mod filtering;
mod pagination;

pub use channel_code::ChannelCode;
pub use constraints::{ConstraintCategory, ConstraintViolation};
pub use filtering::OverviewFilter;
pub use pagination::{MAX_LIMIT, OffsetPage, OffsetPagination};
