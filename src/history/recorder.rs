use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::types::HistoryRecord;

/// 单个实例的历史
#[derive(Default)]
struct InstanceHistory {
    finished: Vec<HistoryRecord>,
    open: Vec<HistoryRecord>,
}

/// 追加式历史日志
///
/// 每个实例独立加锁，写入一个实例不会阻塞其他实例的读取；
/// 查询返回的是复制出来的快照。
#[derive(Default)]
pub struct HistoryLog {
    instances: RwLock<HashMap<String, Arc<RwLock<InstanceHistory>>>>,
    next_seq: AtomicU64,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn instance(&self, instance_id: &str) -> Arc<RwLock<InstanceHistory>> {
        if let Some(history) = self.instances.read().get(instance_id) {
            return Arc::clone(history);
        }
        let mut instances = self.instances.write();
        Arc::clone(instances.entry(instance_id.to_string()).or_default())
    }

    /// 记录一次已完成的节点访问；同时关闭该节点上未结束的活动
    pub fn record(
        &self,
        instance_id: &str,
        node_id: &str,
        node_kind: &str,
        entry_time: DateTime<Utc>,
        exit_time: DateTime<Utc>,
    ) -> HistoryRecord {
        let record = HistoryRecord {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            instance_id: instance_id.to_string(),
            node_id: node_id.to_string(),
            node_kind: node_kind.to_string(),
            entry_time,
            exit_time: Some(exit_time.max(entry_time)),
        };
        let history = self.instance(instance_id);
        let mut history = history.write();
        history.open.retain(|open| open.node_id != node_id);
        history.finished.push(record.clone());
        record
    }

    /// 登记已进入但尚未离开的活动
    pub fn mark_entered(
        &self,
        instance_id: &str,
        node_id: &str,
        node_kind: &str,
        entry_time: DateTime<Utc>,
    ) {
        let record = HistoryRecord {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            instance_id: instance_id.to_string(),
            node_id: node_id.to_string(),
            node_kind: node_kind.to_string(),
            entry_time,
            exit_time: None,
        };
        self.instance(instance_id).write().open.push(record);
    }

    /// 恢复时直接装载已有记录，保持原序号
    pub fn restore(&self, record: HistoryRecord) {
        self.next_seq.fetch_max(record.seq + 1, Ordering::Relaxed);
        let history = self.instance(&record.instance_id);
        let mut history = history.write();
        if record.is_finished() {
            history.finished.push(record);
        } else {
            history.open.push(record);
        }
    }

    /// 按离开时间升序返回；时间相同时按追加顺序
    ///
    /// `only_finished = false` 时，未结束的活动按进入时间排在最后。
    pub fn query(&self, instance_id: &str, only_finished: bool) -> Vec<HistoryRecord> {
        let Some(history) = self.instances.read().get(instance_id).cloned() else {
            return Vec::new();
        };
        let history = history.read();
        let mut records = history.finished.clone();
        records.sort_by(|a, b| a.exit_time.cmp(&b.exit_time).then(a.seq.cmp(&b.seq)));
        if !only_finished {
            let mut open = history.open.clone();
            open.sort_by(|a, b| a.entry_time.cmp(&b.entry_time).then(a.seq.cmp(&b.seq)));
            records.extend(open);
        }
        records
    }

    pub fn len(&self) -> usize {
        self.instances
            .read()
            .values()
            .map(|history| history.read().finished.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
