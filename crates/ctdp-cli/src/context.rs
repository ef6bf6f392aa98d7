//! Shared state for one CLI invocation: config, task store and engine.

use std::error::Error;

use ctdp_core::storage::data_dir;
use ctdp_core::{
    ChainEngine, Config, DailyLogRecord, LogSink, LogSinkError, MarkdownDailyLog, Notice,
    Notifier, StoreError, SystemClock, TaskStore, TickReport,
};

/// Prints notices to stderr. System notices honour `notifications.enabled`;
/// soft notices are always shown.
pub struct StderrNotifier {
    enabled: bool,
}

impl Notifier for StderrNotifier {
    fn notify(&self, notice: &Notice) {
        if notice.kind.is_soft() || self.enabled {
            eprintln!("[{}] {}", notice.title, notice.body);
        }
    }
}

/// The configured markdown log, or nothing when `daily_log.enabled` is off.
pub struct CliLogSink(Option<MarkdownDailyLog>);

impl LogSink for CliLogSink {
    fn append(&self, record: &DailyLogRecord) -> Result<(), LogSinkError> {
        match &self.0 {
            Some(sink) => sink.append(record),
            None => Ok(()),
        }
    }
}

pub type CliEngine = ChainEngine<SystemClock, CliLogSink, StderrNotifier>;

pub struct Context {
    pub config: Config,
    pub store: TaskStore,
    pub engine: CliEngine,
}

impl Context {
    pub fn open() -> ctdp_core::error::Result<Self> {
        let config = Config::load()?;
        let store = TaskStore::open()?;
        let base = data_dir()?;
        let sink = CliLogSink(
            config
                .daily_log
                .enabled
                .then(|| config.daily_log_sink(&base)),
        );
        let notifier = StderrNotifier {
            enabled: config.notifications.enabled,
        };
        let engine = ChainEngine::new(SystemClock, sink, notifier).with_language(config.language);
        Ok(Self {
            config,
            store,
            engine,
        })
    }

    /// Apply whatever became overdue since the last invocation.
    pub fn catch_up(&mut self) -> Result<TickReport, Box<dyn Error>> {
        let report = self.engine.tick(&mut self.store);
        for fired in &report.fired {
            tracing::info!(task = %fired.task_id, event = ?fired.event, "caught up");
        }
        if report.dirty {
            self.store.save()?;
        }
        Ok(report)
    }

    /// Replace the in-memory store with what is on disk now, so changes made
    /// by other invocations are seen.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        self.store = TaskStore::open()?;
        Ok(())
    }

    /// `--task` if given, else the selected task.
    pub fn task_id(&self, explicit: Option<String>) -> Result<String, Box<dyn Error>> {
        self.store
            .resolve_id(explicit.as_deref())
            .ok_or_else(|| "no task selected (create one with `ctdp task create`)".into())
    }
}
