use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::{FlowError, Result};

use super::types::TaskInstance;

/// 任务登记表
///
/// 只记录待办/已完成状态，不求值任何条件；完成动作由引擎发起。
/// 所有修改在同一把写锁内完成，列表读取看到的总是一致快照。
#[derive(Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, TaskInstance>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task: TaskInstance) {
        self.tasks.write().insert(task.id.clone(), task);
    }

    pub fn get(&self, task_id: &str) -> Option<TaskInstance> {
        self.tasks.read().get(task_id).cloned()
    }

    /// 候选组等值过滤，按创建时间再按 ID 排序
    pub fn list_pending(&self, candidate_group: &str) -> Vec<TaskInstance> {
        let mut pending: Vec<TaskInstance> = self
            .tasks
            .read()
            .values()
            .filter(|task| task.is_pending() && task.candidate_group == candidate_group)
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        pending
    }

    pub fn list_for_instance(&self, instance_id: &str) -> Vec<TaskInstance> {
        let mut tasks: Vec<TaskInstance> = self
            .tasks
            .read()
            .values()
            .filter(|task| task.instance_id == instance_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        tasks
    }

    /// 待办检查：不存在返回 `TaskNotFound`，已完成返回 `TaskAlreadyCompleted`
    pub fn ensure_pending(&self, task_id: &str) -> Result<TaskInstance> {
        let task = self
            .get(task_id)
            .ok_or_else(|| FlowError::TaskNotFound(task_id.to_string()))?;
        if !task.is_pending() {
            return Err(FlowError::TaskAlreadyCompleted(task_id.to_string()));
        }
        Ok(task)
    }

    /// 在一次写锁内完成旧任务并登记后续任务
    pub fn complete(
        &self,
        task_id: &str,
        completed_at: DateTime<Utc>,
        next: Option<TaskInstance>,
    ) -> Result<TaskInstance> {
        let mut tasks = self.tasks.write();
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| FlowError::TaskNotFound(task_id.to_string()))?;
        if !task.is_pending() {
            return Err(FlowError::TaskAlreadyCompleted(task_id.to_string()));
        }
        task.completed_at = Some(completed_at);
        let completed = task.clone();
        if let Some(next) = next {
            tasks.insert(next.id.clone(), next);
        }
        Ok(completed)
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.read().values().filter(|t| t.is_pending()).count()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task(instance: &str, group: &str, created_at: DateTime<Utc>) -> TaskInstance {
        TaskInstance::new(instance, "approveTask", "Approve", group, created_at)
    }

    #[test]
    fn list_pending_filters_by_group_and_sorts_by_creation() {
        let registry = TaskRegistry::new();
        let now = Utc::now();
        let later = task("i-2", "managers", now + Duration::milliseconds(5));
        let earlier = task("i-1", "managers", now);
        let other = task("i-3", "employees", now);
        registry.insert(later.clone());
        registry.insert(earlier.clone());
        registry.insert(other);

        let pending = registry.list_pending("managers");
        assert_eq!(
            pending.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            vec![earlier.id.as_str(), later.id.as_str()]
        );
        assert!(registry.list_pending("nobody").is_empty());
    }

    #[test]
    fn complete_is_terminal() {
        let registry = TaskRegistry::new();
        let pending = task("i-1", "managers", Utc::now());
        registry.insert(pending.clone());

        let completed = registry.complete(&pending.id, Utc::now(), None).unwrap();
        assert!(completed.completed_at.is_some());
        assert!(registry.list_pending("managers").is_empty());
        assert!(matches!(
            registry.complete(&pending.id, Utc::now(), None),
            Err(FlowError::TaskAlreadyCompleted(_))
        ));
        assert!(matches!(
            registry.ensure_pending("missing"),
            Err(FlowError::TaskNotFound(_))
        ));
        assert_eq!(registry.len(), 1, "completed tasks stay queryable");
    }

    #[test]
    fn complete_registers_follow_up_task_atomically() {
        let registry = TaskRegistry::new();
        let first = task("i-1", "managers", Utc::now());
        let follow_up = task("i-1", "employees", Utc::now());
        registry.insert(first.clone());

        registry
            .complete(&first.id, Utc::now(), Some(follow_up.clone()))
            .unwrap();
        assert_eq!(registry.pending_count(), 1);
        assert_eq!(registry.list_pending("employees")[0].id, follow_up.id);
        assert_eq!(registry.list_for_instance("i-1").len(), 2);
    }
}
