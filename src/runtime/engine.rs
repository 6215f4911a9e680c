use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{FlowError, Result};
use crate::flow::{validate, DefinitionRegistry, ProcessDefinition};
use crate::history::{ActivitySummary, HistoryLog, HistoryRecord};
use crate::state::{MemoryStore, ProcessStore, Variables};
use crate::tasks::{TaskInstance, TaskRegistry, TaskSummary};

use super::executor::{advance, Advance};
use super::types::{InstanceStatus, ProcessInstance, TokenState};

/// 实例及其启动时绑定的流程定义
struct InstanceEntry {
    instance: ProcessInstance,
    definition: Arc<ProcessDefinition>,
}

type InstanceSlot = Arc<Mutex<InstanceEntry>>;

/// 流程引擎
///
/// 显式的引擎上下文：定义注册表、实例表、任务登记表、历史日志和持久化
/// 协作者都挂在这里，调用方构造一次后在各操作间共享（通常放在 `Arc` 中）。
///
/// 同一实例的推进由实例级互斥锁串行化，不同实例可以完全并行。
pub struct ProcessEngine {
    config: EngineConfig,
    definitions: RwLock<DefinitionRegistry>,
    instances: RwLock<HashMap<String, InstanceSlot>>,
    tasks: TaskRegistry,
    history: HistoryLog,
    store: Arc<dyn ProcessStore>,
}

impl Default for ProcessEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ProcessEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: EngineConfig, store: Arc<dyn ProcessStore>) -> Self {
        Self {
            config,
            definitions: RwLock::new(DefinitionRegistry::new()),
            instances: RwLock::new(HashMap::new()),
            tasks: TaskRegistry::new(),
            history: HistoryLog::new(),
            store,
        }
    }

    /// 从持久化存储重建引擎
    pub async fn recover(config: EngineConfig, store: Arc<dyn ProcessStore>) -> Result<Self> {
        let engine = Self::with_store(config, Arc::clone(&store));

        for definition in store.load_definitions().await? {
            engine.definitions.write().register(definition)?;
        }

        let mut restored = HashMap::new();
        let mut blocked_on = HashMap::new();
        for instance in store.load_instances().await? {
            if let TokenState::Blocked {
                task_id: Some(task_id),
                ..
            } = &instance.token.state
            {
                blocked_on.insert(instance.id.clone(), task_id.clone());
            }
            let definition = engine
                .definition(&instance.definition_key)
                .ok_or_else(|| FlowError::UnknownDefinition(instance.definition_key.clone()))?;
            restored.insert(
                instance.id.clone(),
                Arc::new(Mutex::new(InstanceEntry {
                    instance,
                    definition,
                })),
            );
        }
        let instance_count = restored.len();

        // 实例记录是提交点：实例未写入的推进留下的记录一律丢弃
        for record in store.load_history().await? {
            if restored.contains_key(&record.instance_id) {
                engine.history.restore(record);
            }
        }
        for mut task in store.load_tasks().await? {
            let current = blocked_on.get(&task.instance_id) == Some(&task.id);
            if current && !task.is_pending() {
                warn!(task_id = %task.id, "task completion was not committed, reopening");
                task.completed_at = None;
            } else if !current && task.is_pending() {
                warn!(task_id = %task.id, "discarding uncommitted task");
                continue;
            }
            if task.is_pending() && engine.config.record_history {
                engine.history.mark_entered(
                    &task.instance_id,
                    &task.node_id,
                    "user_task",
                    task.created_at,
                );
            }
            engine.tasks.insert(task);
        }
        *engine.instances.write() = restored;

        info!(
            definitions = engine.definitions.read().len(),
            instances = instance_count,
            pending_tasks = engine.tasks.pending_count(),
            "engine recovered from store"
        );
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 部署流程定义，返回定义 key
    pub async fn deploy(&self, definition: ProcessDefinition) -> Result<String> {
        // 先落盘再注册，写入失败时内存中不留下该定义
        validate(&definition)?;
        self.store.save_definition(&definition).await?;
        let definition = self.definitions.write().register(definition)?;
        info!(
            key = %definition.key,
            name = %definition.display_name(),
            nodes = definition.nodes.len(),
            "process definition deployed"
        );
        Ok(definition.key.clone())
    }

    pub fn definition(&self, key: &str) -> Option<Arc<ProcessDefinition>> {
        self.definitions.read().get(key)
    }

    pub fn definitions(&self) -> Vec<Arc<ProcessDefinition>> {
        self.definitions.read().list().cloned().collect()
    }

    /// 启动流程实例，推进到第一个阻塞点或结束节点
    ///
    /// 若首次推进失败（如网关无匹配），实例仍被保留，令牌停在起始节点，
    /// 失败原因写入 `incident`。
    pub async fn start_instance(&self, key: &str, variables: Variables) -> Result<String> {
        let definition = self
            .definition(key)
            .ok_or_else(|| FlowError::UnknownDefinition(key.to_string()))?;
        let start = definition
            .start_node()
            .ok_or_else(|| FlowError::Other(anyhow::anyhow!("definition `{key}` has no start")))?;

        let started_at = Utc::now();
        let instance = ProcessInstance::new(&definition.key, &start.id, variables, started_at);
        let instance_id = instance.id.clone();
        info!(
            instance_id = %instance_id,
            definition = %definition.key,
            "process instance started"
        );

        let slot = Arc::new(Mutex::new(InstanceEntry {
            instance,
            definition: Arc::clone(&definition),
        }));
        let mut entry = slot.lock().await;
        self.instances
            .write()
            .insert(instance_id.clone(), Arc::clone(&slot));

        let outcome = advance(
            &definition,
            &instance_id,
            &start.id,
            started_at,
            &entry.instance.variables,
            self.config.max_steps,
        );
        match outcome {
            Ok(outcome) => {
                self.commit(&mut entry.instance, outcome, None).await?;
                Ok(instance_id)
            }
            Err(err) => {
                entry.instance.token.state = TokenState::Blocked {
                    node: start.id.clone(),
                    task_id: None,
                };
                self.raise_incident(&mut entry.instance, &err).await?;
                Err(err)
            }
        }
    }

    /// 完成用户任务并恢复令牌推进
    ///
    /// 整个“合并变量 → 完成任务 → 推进”序列在实例锁内执行；
    /// 推进失败时所有改动被丢弃，任务保持待办。
    pub async fn complete_task(&self, task_id: &str, variables: Variables) -> Result<()> {
        let task = self.tasks.ensure_pending(task_id)?;
        let slot = self.instance_slot(&task.instance_id)?;
        let mut entry = slot.lock().await;
        // 等锁期间可能已被其他调用方完成
        let task = self.tasks.ensure_pending(task_id)?;

        let mut scope = entry.instance.variables.clone();
        scope.merge(variables);
        let definition = Arc::clone(&entry.definition);

        let outcome = advance(
            &definition,
            &entry.instance.id,
            &task.node_id,
            task.created_at,
            &scope,
            self.config.max_steps,
        );
        match outcome {
            Ok(outcome) => {
                entry.instance.variables = scope;
                self.commit(&mut entry.instance, outcome, Some(&task)).await?;
                info!(
                    task_id = %task.id,
                    instance_id = %task.instance_id,
                    node = %task.node_id,
                    "task completed"
                );
                Ok(())
            }
            Err(err) => {
                self.raise_incident(&mut entry.instance, &err).await?;
                Err(err)
            }
        }
    }

    /// 列出候选组的待办任务
    pub fn list_pending_tasks(&self, candidate_group: &str) -> Vec<TaskSummary> {
        self.tasks
            .list_pending(candidate_group)
            .iter()
            .map(TaskInstance::summary)
            .collect()
    }

    pub fn pending_tasks(&self, candidate_group: &str) -> Vec<TaskInstance> {
        self.tasks.list_pending(candidate_group)
    }

    pub fn task(&self, task_id: &str) -> Option<TaskInstance> {
        self.tasks.get(task_id)
    }

    /// 任务所属实例的完整变量快照
    pub async fn get_task_context(&self, task_id: &str) -> Result<Variables> {
        let task = self
            .tasks
            .get(task_id)
            .ok_or_else(|| FlowError::TaskNotFound(task_id.to_string()))?;
        let slot = self.instance_slot(&task.instance_id)?;
        let entry = slot.lock().await;
        Ok(entry.instance.variables.snapshot())
    }

    /// 已完成活动的摘要，按离开时间升序
    pub fn get_history(&self, instance_id: &str) -> Result<Vec<ActivitySummary>> {
        Ok(self
            .history_records(instance_id, true)?
            .iter()
            .map(HistoryRecord::summary)
            .collect())
    }

    pub fn history_records(
        &self,
        instance_id: &str,
        only_finished: bool,
    ) -> Result<Vec<HistoryRecord>> {
        if !self.instances.read().contains_key(instance_id) {
            return Err(FlowError::UnknownInstance(instance_id.to_string()));
        }
        Ok(self.history.query(instance_id, only_finished))
    }

    /// 实例快照
    pub async fn instance(&self, instance_id: &str) -> Result<ProcessInstance> {
        let slot = self.instance_slot(instance_id)?;
        let entry = slot.lock().await;
        Ok(entry.instance.clone())
    }

    pub async fn active_instance_count(&self) -> usize {
        let slots: Vec<InstanceSlot> = self.instances.read().values().cloned().collect();
        let mut active = 0;
        for slot in slots {
            if slot.lock().await.instance.status == InstanceStatus::Active {
                active += 1;
            }
        }
        active
    }

    fn instance_slot(&self, instance_id: &str) -> Result<InstanceSlot> {
        self.instances
            .read()
            .get(instance_id)
            .cloned()
            .ok_or_else(|| FlowError::UnknownInstance(instance_id.to_string()))
    }

    /// 提交一次推进：任务、历史、令牌位置一起更新
    async fn commit(
        &self,
        instance: &mut ProcessInstance,
        outcome: Advance,
        completed: Option<&TaskInstance>,
    ) -> Result<()> {
        let mut touched_tasks = Vec::new();
        match completed {
            Some(task) => {
                let completed_at = outcome.departed_at().unwrap_or_else(Utc::now);
                touched_tasks.push(self.tasks.complete(&task.id, completed_at, outcome.task.clone())?);
            }
            None => {
                if let Some(task) = &outcome.task {
                    self.tasks.insert(task.clone());
                }
            }
        }
        if let Some(task) = &outcome.task {
            touched_tasks.push(task.clone());
        }

        let mut records = Vec::new();
        if self.config.record_history {
            for visit in &outcome.visits {
                records.push(self.history.record(
                    &instance.id,
                    &visit.node_id,
                    visit.node_kind,
                    visit.entry_time,
                    visit.exit_time,
                ));
            }
            if let Some(task) = &outcome.task {
                self.history
                    .mark_entered(&instance.id, &task.node_id, "user_task", task.created_at);
            }
        }

        instance.token.state = outcome.token;
        instance.incident = None;
        if let Some(finished_at) = outcome.finished_at {
            instance.status = InstanceStatus::Completed;
            instance.ended_at = Some(finished_at);
            info!(
                instance_id = %instance.id,
                end_node = %instance.token.state.node(),
                "process instance completed"
            );
        } else {
            debug!(
                instance_id = %instance.id,
                node = %instance.token.state.node(),
                "process instance waiting"
            );
        }

        self.store
            .save_commit(instance, &touched_tasks, &records)
            .await
    }

    async fn raise_incident(&self, instance: &mut ProcessInstance, err: &FlowError) -> Result<()> {
        warn!(
            instance_id = %instance.id,
            node = %instance.token.state.node(),
            error = %err,
            "process instance advancement failed"
        );
        instance.incident = Some(err.to_string());
        self.store.save_instance(instance).await
    }
}
