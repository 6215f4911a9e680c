use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{FlowError, Result};
use crate::flow::{NodeKind, ProcessDefinition};
use crate::state::VariableScope;
use crate::tasks::TaskInstance;

use super::types::TokenState;

/// 一次节点访问，提交时写入历史
#[derive(Clone, Debug)]
pub(crate) struct Visit {
    pub node_id: String,
    pub node_kind: &'static str,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
}

/// 推进结果
///
/// 推进只计算、不修改任何共享状态；引擎持有实例锁时整体提交，
/// 失败时直接丢弃，令牌保持原位。
#[derive(Debug)]
pub(crate) struct Advance {
    pub visits: Vec<Visit>,
    pub token: TokenState,
    pub task: Option<TaskInstance>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Advance {
    /// 离开起点节点的时间
    pub fn departed_at(&self) -> Option<DateTime<Utc>> {
        self.visits.first().map(|visit| visit.exit_time)
    }
}

/// 单调时间：不早于上一个时间点
fn tick(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous)
}

/// 从 `from` 节点出发推进令牌
///
/// 令牌离开 `from`（其进入时间为 `entered_at`），沿顺序流前进，
/// 直到落在用户任务上（创建待办任务）或到达结束节点。
pub(crate) fn advance(
    definition: &ProcessDefinition,
    instance_id: &str,
    from: &str,
    entered_at: DateTime<Utc>,
    scope: &VariableScope,
    max_steps: u32,
) -> Result<Advance> {
    let mut current = definition
        .node(from)
        .ok_or_else(|| FlowError::Other(anyhow::anyhow!("unknown node `{from}`")))?;
    let mut entry_time = entered_at;
    let mut visits = Vec::new();

    for _ in 0..max_steps {
        let next = definition.resolve_next(instance_id, &current.id, scope)?;
        let exit_time = tick(entry_time);
        visits.push(Visit {
            node_id: current.id.clone(),
            node_kind: current.kind.as_str(),
            entry_time,
            exit_time,
        });
        debug!(
            instance_id = %instance_id,
            from = %current.id,
            to = %next.id,
            "token moved"
        );

        match &next.kind {
            NodeKind::UserTask { candidate_group } => {
                let task = TaskInstance::new(
                    instance_id,
                    &next.id,
                    next.display_name(),
                    candidate_group,
                    exit_time,
                );
                return Ok(Advance {
                    visits,
                    token: TokenState::Blocked {
                        node: next.id.clone(),
                        task_id: Some(task.id.clone()),
                    },
                    task: Some(task),
                    finished_at: None,
                });
            }
            NodeKind::End => {
                visits.push(Visit {
                    node_id: next.id.clone(),
                    node_kind: next.kind.as_str(),
                    entry_time: exit_time,
                    exit_time,
                });
                return Ok(Advance {
                    visits,
                    token: TokenState::Terminated {
                        end_node: next.id.clone(),
                    },
                    task: None,
                    finished_at: Some(exit_time),
                });
            }
            NodeKind::Start | NodeKind::ExclusiveGateway => {
                current = next;
                entry_time = exit_time;
            }
        }
    }

    Err(FlowError::MaxStepsExceeded(max_steps))
}
