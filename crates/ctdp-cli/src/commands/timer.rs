use std::error::Error;
use std::time::Duration;

use clap::Subcommand;
use ctdp_core::timer::status_text;
use ctdp_core::Event;

use super::TaskArg;
use crate::context::Context;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Book a session that starts automatically after the booking delay
    Book(TaskArg),
    /// Start the session now (honours a pending booking)
    Start(TaskArg),
    /// Pause the active session under a precedent
    Pause {
        /// Precedent ID
        precedent_id: String,
        #[command(flatten)]
        target: TaskArg,
    },
    /// Resume a paused session
    Resume(TaskArg),
    /// Complete the active session
    Complete(TaskArg),
    /// Give up and reset the chain
    GiveUp(TaskArg),
    /// Print current task state as JSON
    Status(TaskArg),
    /// Poll until interrupted, firing automatic transitions
    Watch(TaskArg),
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn Error>> {
    let mut ctx = Context::open()?;
    ctx.catch_up()?;

    let (target, event) = match action {
        TimerAction::Watch(target) => return watch(ctx, target.task),
        TimerAction::Status(target) => {
            let id = ctx.task_id(target.task)?;
            return print_snapshot(&ctx, &id);
        }
        TimerAction::Book(target) => {
            let id = ctx.task_id(target.task)?;
            let event = ctx.engine.book(&mut ctx.store, &id);
            (id, event)
        }
        TimerAction::Start(target) => {
            let id = ctx.task_id(target.task)?;
            let event = ctx.engine.start(&mut ctx.store, &id);
            (id, event)
        }
        TimerAction::Pause {
            precedent_id,
            target,
        } => {
            let id = ctx.task_id(target.task)?;
            let event = ctx.engine.pause(&mut ctx.store, &id, &precedent_id);
            (id, event)
        }
        TimerAction::Resume(target) => {
            let id = ctx.task_id(target.task)?;
            let event = ctx.engine.resume(&mut ctx.store, &id);
            (id, event)
        }
        TimerAction::Complete(target) => {
            let id = ctx.task_id(target.task)?;
            let event = ctx.engine.complete(&mut ctx.store, &id);
            (id, event)
        }
        TimerAction::GiveUp(target) => {
            let id = ctx.task_id(target.task)?;
            let event = ctx.engine.fail(&mut ctx.store, &id);
            (id, event)
        }
    };

    finish(&ctx, &target, event)
}

/// Save and print the transition, or the unchanged state when it was refused.
pub(crate) fn finish(ctx: &Context, id: &str, event: Option<Event>) -> Result<(), Box<dyn Error>> {
    match event {
        Some(event) => {
            ctx.store.save()?;
            println!("{}", serde_json::to_string_pretty(&event)?);
            Ok(())
        }
        None => print_snapshot(ctx, id),
    }
}

fn print_snapshot(ctx: &Context, id: &str) -> Result<(), Box<dyn Error>> {
    match ctx.store.get(id) {
        Some(task) => println!("{}", serde_json::to_string_pretty(&ctx.engine.snapshot(task))?),
        None => println!("Task not found: {id}"),
    }
    Ok(())
}

fn watch(mut ctx: Context, task: Option<String>) -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let period = Duration::from_secs(ctx.config.poller.interval_secs.max(1));
        let mut tick = tokio::time::interval(period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        tracing::info!(interval_secs = period.as_secs(), "watching");

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(e) = ctx.reload() {
                        tracing::warn!(error = %e, "task store unreadable, skipping tick");
                        continue;
                    }
                    let report = ctx.engine.tick(&mut ctx.store);
                    for fired in &report.fired {
                        println!("{}", serde_json::to_string(&fired.event)?);
                    }
                    if report.dirty {
                        ctx.store.save()?;
                    }
                    if ctx.config.status_bar.enabled {
                        let line = match task.as_deref() {
                            Some(id) => ctx
                                .store
                                .get(id)
                                .and_then(|t| status_text(t, ctx.engine.now())),
                            None => report.status_text,
                        };
                        eprint!("\r{:<16}", line.unwrap_or_default());
                    }
                }
                _ = &mut ctrl_c => break,
            }
        }

        eprintln!();
        Ok::<(), Box<dyn Error>>(())
    })
}
