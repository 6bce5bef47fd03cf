//! Convenient imports: `use logoforge_api::prelude::*;`

pub use crate::error::ApiError;
pub use crate::router::build_router;
pub use crate::services::{attach_rate_limit_headers, Services};
