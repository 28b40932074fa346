use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow, bail};
use next_action_core::{
    Classifier, DEFAULT_LOCATION_PREFIX, InboxMode, Priority, ReconcileOptions, VisibilityPolicy,
};
use next_action_store_todoist::DEFAULT_ENDPOINT;
use serde::Deserialize;

const CONFIG_DIR: &str = "next-action";
const CONFIG_FILE: &str = "config.toml";

/// Runtime settings, loaded from `config.toml` and overridden from the command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Todoist API token.
    pub api_key: Option<String>,
    /// Name of the marker label.
    pub label: String,
    /// Label that marks tasks doable at any location.
    pub everywhere_label: Option<String>,
    /// First character of location label names.
    pub location_prefix: char,
    /// Seconds to sleep between cycles.
    pub delay: u64,
    /// Raise the log level to DEBUG.
    pub debug: bool,
    /// Treatment of the Inbox project.
    pub inbox: InboxMode,
    /// Name suffix selecting parallel mode.
    pub parallel_suffix: char,
    /// Name suffix selecting serial mode.
    pub serial_suffix: char,
    /// Hide tasks due this many days out or later; `0` disables.
    pub hide_future: i64,
    /// Hide dated tasks without an explicit mode.
    pub hide_scheduled: bool,
    /// Strip markers from unmanaged projects.
    pub remove_label: bool,
    /// Run one cycle and exit.
    pub onetime: bool,
    /// Priority given to tasks when they gain the marker.
    pub priority: Option<u8>,
    /// Sync endpoint URL.
    pub endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            label: "next_action".into(),
            everywhere_label: None,
            location_prefix: DEFAULT_LOCATION_PREFIX,
            delay: 5,
            debug: false,
            inbox: InboxMode::default(),
            parallel_suffix: '.',
            serial_suffix: '_',
            hide_future: 7,
            hide_scheduled: false,
            remove_label: false,
            onetime: false,
            priority: None,
            endpoint: DEFAULT_ENDPOINT.into(),
        }
    }
}

/// Command-line values that replace file settings when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub label: Option<String>,
    pub everywhere_label: Option<String>,
    pub location_prefix: Option<char>,
    pub delay: Option<u64>,
    pub debug: bool,
    pub inbox: Option<InboxMode>,
    pub parallel_suffix: Option<char>,
    pub serial_suffix: Option<char>,
    pub hide_future: Option<i64>,
    pub hide_scheduled: bool,
    pub remove_label: bool,
    pub onetime: bool,
    pub priority: Option<u8>,
    pub endpoint: Option<String>,
}

/// Label names resolved against the account at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelNames {
    /// Marker label name.
    pub marker: String,
    /// Optional everywhere label name.
    pub everywhere: Option<String>,
}

impl Config {
    /// Default location: `<config dir>/next-action/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from `path`. A missing file yields the defaults.
    ///
    /// Values are checked by [`Config::with_overrides`], once command-line
    /// flags have been merged.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Apply command-line overrides and validate the merged settings.
    ///
    /// # Errors
    /// Returns an error if the merged settings are invalid.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self> {
        if let Some(api_key) = overrides.api_key {
            self.api_key = Some(api_key);
        }
        if let Some(label) = overrides.label {
            self.label = label;
        }
        if let Some(everywhere) = overrides.everywhere_label {
            self.everywhere_label = Some(everywhere);
        }
        if let Some(prefix) = overrides.location_prefix {
            self.location_prefix = prefix;
        }
        if let Some(delay) = overrides.delay {
            self.delay = delay;
        }
        if let Some(inbox) = overrides.inbox {
            self.inbox = inbox;
        }
        if let Some(suffix) = overrides.parallel_suffix {
            self.parallel_suffix = suffix;
        }
        if let Some(suffix) = overrides.serial_suffix {
            self.serial_suffix = suffix;
        }
        if let Some(days) = overrides.hide_future {
            self.hide_future = days;
        }
        if let Some(priority) = overrides.priority {
            self.priority = Some(priority);
        }
        if let Some(endpoint) = overrides.endpoint {
            self.endpoint = endpoint;
        }
        self.debug |= overrides.debug;
        self.hide_scheduled |= overrides.hide_scheduled;
        self.remove_label |= overrides.remove_label;
        self.onetime |= overrides.onetime;
        self.validate()?;
        Ok(self)
    }

    /// The API token, which must be set and non-blank.
    ///
    /// # Errors
    /// Returns an error when no token was configured.
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("no API key set; pass --api-key or set TODOIST_API_KEY"))
    }

    /// Pause between cycles.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_secs(self.delay)
    }

    /// Marker and everywhere label names to resolve at startup.
    #[must_use]
    pub fn label_names(&self) -> LabelNames {
        LabelNames {
            marker: self.label.trim().to_owned(),
            everywhere: self
                .everywhere_label
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned),
        }
    }

    /// Options for the reconciliation pass.
    ///
    /// # Errors
    /// Returns an error if the marker priority is out of range.
    pub fn reconcile_options(&self) -> Result<ReconcileOptions> {
        let marker_priority = self.priority.map(parse_priority).transpose()?;
        Ok(ReconcileOptions {
            classifier: Classifier::new(self.inbox, self.parallel_suffix, self.serial_suffix),
            visibility: VisibilityPolicy {
                hide_future_days: self.hide_future,
                hide_scheduled: self.hide_scheduled,
            },
            strip_unmanaged: self.remove_label,
            marker_priority,
            location_prefix: self.location_prefix,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            bail!("label must not be empty");
        }
        if self.parallel_suffix == self.serial_suffix {
            bail!(
                "parallel and serial suffixes must differ (both are '{}')",
                self.parallel_suffix
            );
        }
        if self.parallel_suffix.is_whitespace() || self.serial_suffix.is_whitespace() {
            bail!("suffixes must not be whitespace");
        }
        if self.location_prefix.is_whitespace() {
            bail!("location prefix must not be whitespace");
        }
        if let Some(everywhere) = self.everywhere_label.as_deref()
            && everywhere.trim() == self.label.trim()
        {
            bail!("everywhere label must differ from the marker label '{}'", self.label.trim());
        }
        if self.delay == 0 && !self.onetime {
            bail!("delay must be at least one second");
        }
        if let Some(priority) = self.priority {
            parse_priority(priority)?;
        }
        if self.endpoint.trim().is_empty() {
            bail!("endpoint must not be empty");
        }
        Ok(())
    }
}

fn parse_priority(value: u8) -> Result<Priority> {
    Priority::new(value).ok_or_else(|| anyhow!("priority must be between 1 and 4, got {value}"))
}
