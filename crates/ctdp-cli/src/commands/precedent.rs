//! Precedent commands: the allowed pause reasons of a task.

use clap::Subcommand;

use super::timer::finish;
use super::TaskArg;
use crate::context::Context;

#[derive(Subcommand)]
pub enum PrecedentAction {
    /// Register a precedent
    Create {
        /// Precedent name
        name: String,
        /// What the precedent covers
        #[arg(long)]
        description: Option<String>,
        /// Pause limit in minutes (default: 5)
        #[arg(long)]
        limit: Option<String>,
        /// Pause the active session under the new precedent right away
        #[arg(long = "use")]
        use_now: bool,
        #[command(flatten)]
        target: TaskArg,
    },
    /// List precedents
    List(TaskArg),
    /// Delete a precedent
    Delete {
        /// Precedent ID
        id: String,
        #[command(flatten)]
        target: TaskArg,
    },
}

pub fn run(action: PrecedentAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut ctx = Context::open()?;
    ctx.catch_up()?;

    match action {
        PrecedentAction::Create {
            name,
            description,
            limit,
            use_now,
            target,
        } => {
            let id = ctx.task_id(target.task)?;
            let description = description.as_deref().unwrap_or("");
            let limit = limit.as_deref().unwrap_or("");
            if use_now {
                let event = ctx
                    .engine
                    .create_and_pause(&mut ctx.store, &id, &name, description, limit)?;
                return finish(&ctx, &id, event);
            }
            let Some(task) = ctx.store.get_mut(&id) else {
                println!("Task not found: {id}");
                return Ok(());
            };
            let precedent = task.precedents.create(&name, description, limit)?.clone();
            ctx.store.save()?;
            println!("{}", serde_json::to_string_pretty(&precedent)?);
        }
        PrecedentAction::List(target) => {
            let id = ctx.task_id(target.task)?;
            match ctx.store.get(&id) {
                Some(task) => println!("{}", serde_json::to_string_pretty(&task.precedents)?),
                None => println!("Task not found: {id}"),
            }
        }
        PrecedentAction::Delete { id, target } => {
            let task_id = ctx.task_id(target.task)?;
            let Some(task) = ctx.store.get_mut(&task_id) else {
                println!("Task not found: {task_id}");
                return Ok(());
            };
            match task.delete_precedent(&id)? {
                Some(_) => {
                    ctx.store.save()?;
                    println!("Precedent deleted: {id}");
                }
                None => println!("Precedent not found: {id}"),
            }
        }
    }
    Ok(())
}
