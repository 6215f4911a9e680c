// 历史模块 - 节点进入/离开的审计记录

mod recorder;
mod types;

pub use recorder::HistoryLog;
pub use types::{ActivitySummary, HistoryRecord};
