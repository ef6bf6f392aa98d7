//! User-facing notifications.
//!
//! Automatic transitions and log outcomes are announced through a
//! [`Notifier`]. Message text comes from a small built-in catalogue; `{0}` in
//! a template is replaced with the task name (or the error, for log failures).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoticeKind {
    SessionAutoStarted,
    SessionComplete,
    PauseLimitExceeded,
    LoggedToDailyNote,
    LogFailed,
}

impl NoticeKind {
    pub fn key(self) -> &'static str {
        match self {
            NoticeKind::SessionAutoStarted => "session-auto-started",
            NoticeKind::SessionComplete => "session-complete",
            NoticeKind::PauseLimitExceeded => "pause-limit-exceeded",
            NoticeKind::LoggedToDailyNote => "logged-to-daily-note",
            NoticeKind::LogFailed => "log-failed",
        }
    }

    /// Soft notices are in-app only and never raise a system notification.
    pub fn is_soft(self) -> bool {
        matches!(self, NoticeKind::LoggedToDailyNote | NoticeKind::LogFailed)
    }

    fn template(self, lang: Language) -> (&'static str, &'static str) {
        match (lang.resolve(), self) {
            (Language::Zh, NoticeKind::SessionAutoStarted) => {
                ("神圣座位已开启！", "时间到！「{0}」专注时段自动开始。")
            }
            (Language::Zh, NoticeKind::SessionComplete) => ("专注完成！", "「{0}」主链节点 +1。"),
            (Language::Zh, NoticeKind::PauseLimitExceeded) => {
                ("休息超时！", "「{0}」休息时间过长，任务链已断裂。")
            }
            (Language::Zh, NoticeKind::LoggedToDailyNote) => ("已记录到每日日记", "{0}"),
            (Language::Zh, NoticeKind::LogFailed) => ("日志记录失败", "{0}"),
            (_, NoticeKind::SessionAutoStarted) => {
                ("Sacred Seat Started!", "Time's up! Session for \"{0}\" started.")
            }
            (_, NoticeKind::SessionComplete) => ("Session Complete!", "+1 Node for \"{0}\"."),
            (_, NoticeKind::PauseLimitExceeded) => (
                "Pause Limit Exceeded!",
                "Too long on break for \"{0}\". Chain Reset.",
            ),
            (_, NoticeKind::LoggedToDailyNote) => ("Logged to Daily Note", "{0}"),
            (_, NoticeKind::LogFailed) => ("CTDP: Log failed", "{0}"),
        }
    }
}

/// Catalogue language. `System` follows the process locale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    System,
    En,
    Zh,
}

impl Language {
    /// Resolve `System` from `LC_ALL` / `LANG`; anything but Chinese is English.
    pub fn resolve(self) -> Language {
        match self {
            Language::System => {
                let locale = std::env::var("LC_ALL")
                    .ok()
                    .filter(|v| !v.is_empty())
                    .or_else(|| std::env::var("LANG").ok())
                    .unwrap_or_default();
                if locale.starts_with("zh") {
                    Language::Zh
                } else {
                    Language::En
                }
            }
            other => other,
        }
    }
}

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, lang: Language, arg: &str) -> Self {
        let (title, body) = kind.template(lang);
        Self {
            kind,
            title: title.to_string(),
            body: body.replace("{0}", arg),
        }
    }
}

/// Delivers notices to the user.
pub trait Notifier {
    fn notify(&self, notice: &Notice);
}

/// Drops every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notice: &Notice) {}
}
