//! Execution modes read from project and task names.

use crate::model::{Project, Task};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Name of the project every account starts with.
pub const INBOX_NAME: &str = "Inbox";

/// How the children of a project or task become actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Every child is actionable at once.
    Parallel,
    /// Only the first child is actionable.
    Serial,
}

impl ExecutionMode {
    /// String representation used in logs and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Serial => "serial",
        }
    }
}

/// Handling chosen for a whole project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectMode {
    /// Managed; all top-level tasks are actionable.
    Parallel,
    /// Managed; only the first top-level task is actionable.
    Serial,
    /// Inbox opted out: handled like an unmanaged project.
    Suppressed,
    /// Not managed.
    Unmanaged,
}

impl ProjectMode {
    /// Execution mode for managed projects.
    #[must_use]
    pub const fn execution(self) -> Option<ExecutionMode> {
        match self {
            Self::Parallel => Some(ExecutionMode::Parallel),
            Self::Serial => Some(ExecutionMode::Serial),
            Self::Suppressed | Self::Unmanaged => None,
        }
    }

    /// String representation used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Serial => "serial",
            Self::Suppressed => "suppressed",
            Self::Unmanaged => "unmanaged",
        }
    }
}

impl fmt::Display for ProjectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Treatment of the Inbox project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxMode {
    /// Handle the Inbox as a parallel project.
    #[default]
    Parallel,
    /// Handle the Inbox as a serial project.
    Serial,
    /// Leave the Inbox unmanaged.
    None,
}

impl InboxMode {
    /// String representation used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Serial => "serial",
            Self::None => "none",
        }
    }

    const fn project_mode(self) -> ProjectMode {
        match self {
            Self::Parallel => ProjectMode::Parallel,
            Self::Serial => ProjectMode::Serial,
            Self::None => ProjectMode::Suppressed,
        }
    }
}

impl fmt::Display for InboxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an inbox mode string is not one of `parallel`, `serial`, `none`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown inbox mode '{0}' (expected parallel, serial or none)")]
pub struct UnknownInboxMode(pub String);

impl FromStr for InboxMode {
    type Err = UnknownInboxMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parallel" => Ok(Self::Parallel),
            "serial" => Ok(Self::Serial),
            "none" => Ok(Self::None),
            _ => Err(UnknownInboxMode(s.to_owned())),
        }
    }
}

/// Maps project names and task text to execution modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    inbox: InboxMode,
    parallel_suffix: char,
    serial_suffix: char,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(InboxMode::default(), '.', '_')
    }
}

impl Classifier {
    /// Build a classifier. The two suffixes are expected to differ.
    #[must_use]
    pub const fn new(inbox: InboxMode, parallel_suffix: char, serial_suffix: char) -> Self {
        Self {
            inbox,
            parallel_suffix,
            serial_suffix,
        }
    }

    /// Configured Inbox treatment.
    #[must_use]
    pub const fn inbox(&self) -> InboxMode {
        self.inbox
    }

    /// Decide how `project` is handled. The Inbox rule wins over suffixes.
    #[must_use]
    pub fn project_mode(&self, project: &Project) -> ProjectMode {
        let name = project.name.trim();
        if project.inbox || name == INBOX_NAME {
            return self.inbox.project_mode();
        }
        match self.suffix_mode(name) {
            Some(ExecutionMode::Parallel) => ProjectMode::Parallel,
            Some(ExecutionMode::Serial) => ProjectMode::Serial,
            None => ProjectMode::Unmanaged,
        }
    }

    /// Explicit mode of a task, if its text ends with a suffix.
    #[must_use]
    pub fn item_mode(&self, task: &Task) -> Option<ExecutionMode> {
        self.suffix_mode(task.content.trim())
    }

    fn suffix_mode(&self, name: &str) -> Option<ExecutionMode> {
        let last = name.chars().next_back()?;
        if last == self.parallel_suffix {
            Some(ExecutionMode::Parallel)
        } else if last == self.serial_suffix {
            Some(ExecutionMode::Serial)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(name: &str) -> Project {
        Project {
            name: name.to_owned(),
            ..Project::default()
        }
    }

    fn item(content: &str) -> Task {
        Task {
            content: content.to_owned(),
            ..Task::default()
        }
    }

    #[test]
    fn project_suffixes_select_mode() {
        let classifier = Classifier::default();
        assert_eq!(classifier.project_mode(&project("Home.")), ProjectMode::Parallel);
        assert_eq!(classifier.project_mode(&project("Launch_")), ProjectMode::Serial);
        assert_eq!(classifier.project_mode(&project("Someday")), ProjectMode::Unmanaged);
        assert_eq!(classifier.project_mode(&project("  Trailing.  ")), ProjectMode::Parallel);
    }

    #[test]
    fn inbox_rule_takes_precedence() {
        let serial = Classifier::new(InboxMode::Serial, '.', '_');
        assert_eq!(serial.project_mode(&project("Inbox")), ProjectMode::Serial);

        let suppressed = Classifier::new(InboxMode::None, '.', '_');
        assert_eq!(suppressed.project_mode(&project(" Inbox ")), ProjectMode::Suppressed);

        let flagged = Project {
            name: "Eingang".into(),
            inbox: true,
            ..Project::default()
        };
        assert_eq!(Classifier::default().project_mode(&flagged), ProjectMode::Parallel);
    }

    #[test]
    fn custom_suffixes_are_honoured() {
        let classifier = Classifier::new(InboxMode::Parallel, '=', '-');
        assert_eq!(classifier.project_mode(&project("Errands=")), ProjectMode::Parallel);
        assert_eq!(classifier.project_mode(&project("Errands.")), ProjectMode::Unmanaged);
        assert_eq!(classifier.item_mode(&item("Plan trip-")), Some(ExecutionMode::Serial));
    }

    #[test]
    fn empty_names_have_no_mode() {
        let classifier = Classifier::default();
        assert_eq!(classifier.project_mode(&project("")), ProjectMode::Unmanaged);
        assert_eq!(classifier.item_mode(&item("   ")), None);
    }

    #[test]
    fn item_mode_reads_last_character() {
        let classifier = Classifier::default();
        assert_eq!(classifier.item_mode(&item("Buy groceries.")), Some(ExecutionMode::Parallel));
        assert_eq!(classifier.item_mode(&item("Write report_")), Some(ExecutionMode::Serial));
        assert_eq!(classifier.item_mode(&item("Call mum")), None);
    }

    #[test]
    fn inbox_mode_parses_from_strings() {
        assert_eq!("serial".parse::<InboxMode>(), Ok(InboxMode::Serial));
        assert_eq!("NONE".parse::<InboxMode>(), Ok(InboxMode::None));
        assert!("sometimes".parse::<InboxMode>().is_err());
    }
}
