//! Task management commands for CLI.

use clap::Subcommand;
use serde_json::json;

use crate::context::Context;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task and select it
    Create {
        /// Task name
        name: String,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Session length in minutes (default: 60)
        #[arg(long, allow_hyphen_values = true)]
        session: Option<String>,
        /// Booking delay in minutes, 0 starts directly (default: 15)
        #[arg(long, allow_hyphen_values = true)]
        booking: Option<String>,
    },
    /// List tasks
    List,
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New session length in minutes
        #[arg(long, allow_hyphen_values = true)]
        session: Option<String>,
        /// New booking delay in minutes
        #[arg(long, allow_hyphen_values = true)]
        booking: Option<String>,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// Select the task that commands act on by default
    Select {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut ctx = Context::open()?;
    ctx.catch_up()?;

    match action {
        TaskAction::Create {
            name,
            description,
            session,
            booking,
        } => {
            let task = ctx
                .store
                .create_task(
                    &name,
                    description.as_deref().unwrap_or(""),
                    session.as_deref().unwrap_or(""),
                    booking.as_deref().unwrap_or(""),
                )?
                .clone();
            ctx.store.save()?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List => {
            let selected = ctx.store.active_task_id();
            let tasks: Vec<_> = ctx
                .store
                .tasks()
                .iter()
                .map(|task| {
                    json!({
                        "id": task.id,
                        "name": task.name,
                        "state": task.state,
                        "mainChainCount": task.main_chain_count,
                        "auxChainCount": task.aux_chain_count,
                        "selected": selected == Some(task.id.as_str()),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TaskAction::Get { id } => match ctx.store.get(&id) {
            Some(task) => println!("{}", serde_json::to_string_pretty(task)?),
            None => println!("Task not found: {id}"),
        },
        TaskAction::Update {
            id,
            name,
            description,
            session,
            booking,
        } => {
            let Some(task) = ctx.store.get_mut(&id) else {
                println!("Task not found: {id}");
                return Ok(());
            };
            task.update(
                name.as_deref(),
                description.as_deref(),
                session.as_deref(),
                booking.as_deref(),
            )?;
            let task = task.clone();
            ctx.store.save()?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Delete { id } => {
            if ctx.store.delete_task(&id).is_some() {
                ctx.store.save()?;
                println!("Task deleted: {id}");
            } else {
                println!("Task not found: {id}");
            }
        }
        TaskAction::Select { id } => {
            if ctx.store.select(&id) {
                ctx.store.save()?;
                println!("Task selected: {id}");
            } else {
                println!("Task not found: {id}");
            }
        }
    }
    Ok(())
}
