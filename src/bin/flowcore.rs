use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use flowcore::utils::LoggingConfig;
use flowcore::{variables, EngineConfig, ProcessDefinition, ProcessEngine, VariableValue};

const HOLIDAY_REQUEST: &str = include_str!("../../definitions/holiday-request.json");

#[derive(Parser)]
#[command(name = "flowcore", version, about = "Process orchestration core CLI", author)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a JSON process definition and check its structure
    Validate { path: PathBuf },
    /// Walk through the holiday request process once
    Holiday {
        #[arg(long)]
        employee: String,
        #[arg(long, default_value_t = 1)]
        days: i64,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        approve: bool,
        /// 1-based index into the managers' task list
        #[arg(long, default_value_t = 1)]
        task: usize,
        #[arg(long)]
        definition: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoggingConfig::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Validate { path } => handle_validate(path),
        Command::Holiday {
            employee,
            days,
            description,
            approve,
            task,
            definition,
        } => handle_holiday(employee, days, description, approve, task, definition).await,
    };
    if let Err(err) = &result {
        flowcore::log_error!(err);
    }
    result
}

fn handle_validate(path: PathBuf) -> anyhow::Result<()> {
    let definition = ProcessDefinition::from_path(&path)?;
    println!(
        "Process definition `{}` ({}) is valid",
        definition.key,
        definition.display_name()
    );
    println!(
        "{:<24} {:<18} {}",
        "Node", "Kind", "Candidate group"
    );
    for node in &definition.nodes {
        println!(
            "{:<24} {:<18} {}",
            node.id,
            node.kind.as_str(),
            node.candidate_group().unwrap_or("-")
        );
    }
    println!("{} sequence flows", definition.flows.len());
    Ok(())
}

async fn handle_holiday(
    employee: String,
    days: i64,
    description: String,
    approve: bool,
    task_index: usize,
    definition: Option<PathBuf>,
) -> anyhow::Result<()> {
    let definition = match definition {
        Some(path) => ProcessDefinition::from_path(&path)?,
        None => ProcessDefinition::from_json(HOLIDAY_REQUEST)?,
    };

    let engine = ProcessEngine::new(EngineConfig::from_env()?);
    let key = engine.deploy(definition).await?;
    if let Some(deployed) = engine.definition(&key) {
        println!("Found process definition : {}", deployed.display_name());
    }

    let instance_id = engine
        .start_instance(
            &key,
            variables! {
                "employee" => employee,
                "nrOfHolidays" => days,
                "description" => description,
            },
        )
        .await?;

    let tasks = engine.list_pending_tasks("managers");
    println!("You have {} tasks:", tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        println!("{}) {}", i + 1, task.node_name);
    }

    let Some(task) = task_index.checked_sub(1).and_then(|i| tasks.get(i)) else {
        bail!("task {} does not exist", task_index);
    };
    let context = engine.get_task_context(&task.task_id).await?;
    let show = |key: &str| {
        context
            .get(key)
            .map(VariableValue::to_string)
            .unwrap_or_default()
    };
    println!(
        "{} wants {} of holidays. Do you approve this? {}",
        show("employee"),
        show("nrOfHolidays"),
        if approve { "y" } else { "n" }
    );

    engine
        .complete_task(&task.task_id, variables! { "approved" => approve })
        .await
        .with_context(|| format!("failed to complete task `{}`", task.task_id))?;

    for follow_up in engine.list_pending_tasks("employees") {
        println!("Next task for employees: {}", follow_up.node_name);
    }

    for activity in engine.get_history(&instance_id)? {
        println!(
            "{} took {} milliseconds",
            activity.node_id, activity.duration_millis
        );
    }
    Ok(())
}
