use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 任务状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
}

/// 用户任务实例
///
/// 令牌进入 UserTask 节点时创建。Pending → Completed 是唯一的状态迁移，
/// 完成后的记录保留在登记表中供查询。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskInstance {
    pub id: String,
    pub instance_id: String,
    pub node_id: String,
    pub name: String,
    pub candidate_group: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskInstance {
    pub fn new(
        instance_id: impl Into<String>,
        node_id: impl Into<String>,
        name: impl Into<String>,
        candidate_group: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("task-{}", uuid::Uuid::new_v4()),
            instance_id: instance_id.into(),
            node_id: node_id.into(),
            name: name.into(),
            candidate_group: candidate_group.into(),
            created_at,
            completed_at: None,
        }
    }

    pub fn status(&self) -> TaskStatus {
        if self.completed_at.is_some() {
            TaskStatus::Completed
        } else {
            TaskStatus::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == TaskStatus::Pending
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            task_id: self.id.clone(),
            node_name: self.name.clone(),
        }
    }
}

/// 对外暴露的待办任务摘要
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub node_name: String,
}
