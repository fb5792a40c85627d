//! Integration test harness: end-to-end blame over in-memory histories.

mod util;

mod blame_scenarios;
mod cancellation;
mod renames;
mod work_dir;
