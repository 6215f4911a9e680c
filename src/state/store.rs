use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::flow::ProcessDefinition;
use crate::history::HistoryRecord;
use crate::runtime::ProcessInstance;
use crate::tasks::TaskInstance;

/// 持久化协作者
///
/// 引擎在每次提交后写入；`ProcessEngine::recover` 从中重建引擎。
/// 后端选择不在本 crate 范围内，默认实现为内存存储。
#[async_trait]
pub trait ProcessStore: Send + Sync {
    async fn save_definition(&self, definition: &ProcessDefinition) -> Result<()>;
    async fn load_definitions(&self) -> Result<Vec<ProcessDefinition>>;

    async fn save_instance(&self, instance: &ProcessInstance) -> Result<()>;
    async fn load_instance(&self, id: &str) -> Result<Option<ProcessInstance>>;
    async fn load_instances(&self) -> Result<Vec<ProcessInstance>>;

    async fn save_task(&self, task: &TaskInstance) -> Result<()>;
    async fn load_tasks(&self) -> Result<Vec<TaskInstance>>;

    /// 追加历史记录，不提供更新与删除
    async fn append_history(&self, record: &HistoryRecord) -> Result<()>;
    async fn load_history(&self) -> Result<Vec<HistoryRecord>>;

    /// 写入一次推进的全部结果
    ///
    /// 实例最后写入，作为提交点：实例记录中的令牌只会指向已写入的任务。
    /// 能做事务的后端应覆盖此方法整体写入。
    async fn save_commit(
        &self,
        instance: &ProcessInstance,
        tasks: &[TaskInstance],
        records: &[HistoryRecord],
    ) -> Result<()> {
        for task in tasks {
            self.save_task(task).await?;
        }
        for record in records {
            self.append_history(record).await?;
        }
        self.save_instance(instance).await
    }
}

/// 内存存储实现
#[derive(Default)]
pub struct MemoryStore {
    definitions: RwLock<HashMap<String, ProcessDefinition>>,
    instances: RwLock<HashMap<String, ProcessInstance>>,
    tasks: RwLock<HashMap<String, TaskInstance>>,
    history: RwLock<Vec<HistoryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessStore for MemoryStore {
    async fn save_definition(&self, definition: &ProcessDefinition) -> Result<()> {
        self.definitions
            .write()
            .insert(definition.key.clone(), definition.clone());
        Ok(())
    }

    async fn load_definitions(&self) -> Result<Vec<ProcessDefinition>> {
        Ok(self.definitions.read().values().cloned().collect())
    }

    async fn save_instance(&self, instance: &ProcessInstance) -> Result<()> {
        self.instances
            .write()
            .insert(instance.id.clone(), instance.clone());
        Ok(())
    }

    async fn load_instance(&self, id: &str) -> Result<Option<ProcessInstance>> {
        Ok(self.instances.read().get(id).cloned())
    }

    async fn load_instances(&self) -> Result<Vec<ProcessInstance>> {
        Ok(self.instances.read().values().cloned().collect())
    }

    async fn save_task(&self, task: &TaskInstance) -> Result<()> {
        self.tasks.write().insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn load_tasks(&self) -> Result<Vec<TaskInstance>> {
        Ok(self.tasks.read().values().cloned().collect())
    }

    async fn append_history(&self, record: &HistoryRecord) -> Result<()> {
        self.history.write().push(record.clone());
        Ok(())
    }

    async fn load_history(&self) -> Result<Vec<HistoryRecord>> {
        Ok(self.history.read().clone())
    }

    async fn save_commit(
        &self,
        instance: &ProcessInstance,
        tasks: &[TaskInstance],
        records: &[HistoryRecord],
    ) -> Result<()> {
        let mut stored_instances = self.instances.write();
        let mut stored_tasks = self.tasks.write();
        let mut history = self.history.write();
        for task in tasks {
            stored_tasks.insert(task.id.clone(), task.clone());
        }
        history.extend(records.iter().cloned());
        stored_instances.insert(instance.id.clone(), instance.clone());
        Ok(())
    }
}
