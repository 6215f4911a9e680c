use std::sync::Arc;

use flowcore::{variables, Condition, FlowError, ProcessBuilder, ProcessDefinition, ProcessEngine};

fn approval() -> ProcessDefinition {
    let mut builder = ProcessBuilder::new("approval");
    builder
        .add_start("start")
        .add_user_task("approveTask", "managers")
        .add_gateway("decision")
        .add_end("approved")
        .add_end("rejected")
        .connect("start", "approveTask")
        .connect("approveTask", "decision")
        .connect_if("decision", "approved", Condition::is_true("approved"))
        .connect("decision", "rejected");
    builder.build().expect("definition should be valid")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_completions_only_one_wins() -> anyhow::Result<()> {
    let engine = Arc::new(ProcessEngine::default());
    let key = engine.deploy(approval()).await?;
    let instance_id = engine.start_instance(&key, variables! {}).await?;
    let task = engine.list_pending_tasks("managers").remove(0);

    let mut handles = Vec::new();
    for approved in [true, false] {
        let engine = Arc::clone(&engine);
        let task_id = task.task_id.clone();
        handles.push(tokio::spawn(async move {
            engine
                .complete_task(&task_id, variables! { "approved" => approved })
                .await
        }));
    }

    let mut wins = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await? {
            Ok(()) => wins += 1,
            Err(FlowError::TaskAlreadyCompleted(id)) => {
                assert_eq!(id, task.task_id);
                rejected += 1;
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!((wins, rejected), (1, 1));

    let instance = engine.instance(&instance_id).await?;
    assert!(instance.is_completed());
    assert_eq!(engine.get_history(&instance_id)?.len(), 4);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_instances_progress_in_parallel() -> anyhow::Result<()> {
    let engine = Arc::new(ProcessEngine::default());
    let key = engine.deploy(approval()).await?;

    let mut handles = Vec::new();
    for i in 0..16i64 {
        let engine = Arc::clone(&engine);
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            let instance_id = engine
                .start_instance(&key, variables! { "request" => i })
                .await?;
            let task = engine
                .pending_tasks("managers")
                .into_iter()
                .find(|t| t.instance_id == instance_id)
                .ok_or_else(|| anyhow::anyhow!("no task for {instance_id}"))?;
            engine
                .complete_task(&task.id, variables! { "approved" => i % 2 == 0 })
                .await?;
            anyhow::Ok((instance_id, i))
        }));
    }

    for handle in handles {
        let (instance_id, i) = handle.await??;
        let instance = engine.instance(&instance_id).await?;
        let expected = if i % 2 == 0 { "approved" } else { "rejected" };
        assert_eq!(instance.token.state.node(), expected);
        assert_eq!(
            instance.variables.get("request").and_then(|v| v.as_i64()),
            Some(i)
        );
    }
    assert_eq!(engine.active_instance_count().await, 0);
    assert!(engine.list_pending_tasks("managers").is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn readers_see_consistent_task_lists_during_completion() -> anyhow::Result<()> {
    let engine = Arc::new(ProcessEngine::default());
    let key = engine.deploy(approval()).await?;
    for _ in 0..8 {
        engine.start_instance(&key, variables! {}).await?;
    }

    let reader = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            for _ in 0..64 {
                let pending = engine.list_pending_tasks("managers");
                assert!(pending.len() <= 8);
                tokio::task::yield_now().await;
            }
        })
    };

    for task in engine.list_pending_tasks("managers") {
        engine
            .complete_task(&task.task_id, variables! { "approved" => true })
            .await?;
    }
    reader.await?;
    assert!(engine.list_pending_tasks("managers").is_empty());
    Ok(())
}
