pub mod attachment;
pub mod board;
pub mod ids;
pub mod position;
pub mod project;
pub mod session;
pub mod task;
pub mod task_type;
pub mod team;
pub mod worker;

use serde::Serialize;
use ts_rs::TS;

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize, TS)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}
