mod best_effort_path_ext;
mod system_time_ext;

pub use best_effort_path_ext::BestEffortPathExt;
pub use system_time_ext::now_epoch_seconds;
