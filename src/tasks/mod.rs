// 任务模块 - 用户任务登记与候选组分配

mod registry;
mod types;

pub use registry::TaskRegistry;
pub use types::{TaskInstance, TaskStatus, TaskSummary};
