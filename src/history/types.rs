use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 历史记录
///
/// 一次节点访问对应一条记录，追加后不再修改。
/// 尚未离开的活动（待办的用户任务）在查询时以 `exit_time = None` 给出。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub seq: u64,
    pub instance_id: String,
    pub node_id: String,
    pub node_kind: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
}

impl HistoryRecord {
    pub fn is_finished(&self) -> bool {
        self.exit_time.is_some()
    }

    /// 持续时间（毫秒），未结束的活动返回 `None`
    pub fn duration_millis(&self) -> Option<i64> {
        self.exit_time
            .map(|exit| (exit - self.entry_time).num_milliseconds())
    }

    pub fn summary(&self) -> ActivitySummary {
        ActivitySummary {
            node_id: self.node_id.clone(),
            duration_millis: self.duration_millis().unwrap_or_default(),
        }
    }
}

/// 对外暴露的历史摘要
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub node_id: String,
    pub duration_millis: i64,
}
