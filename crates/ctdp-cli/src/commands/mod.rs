pub mod config;
pub mod precedent;
pub mod task;
pub mod timer;

use clap::Args;

/// Target task selector shared by task-scoped commands.
#[derive(Args, Debug, Clone)]
pub struct TaskArg {
    /// Task ID (defaults to the selected task)
    #[arg(long)]
    pub task: Option<String>,
}
