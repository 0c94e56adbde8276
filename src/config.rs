use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the command action renders a child's captured output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Print output as-is.
    Plain,
    /// Prefix every line with the value, and colour each block.
    #[default]
    Color,
    /// Prefix every line with the value.
    Prefix,
    /// Discard output.
    None,
}

impl OutputMode {
    pub const ALL: [OutputMode; 4] = [OutputMode::Plain, OutputMode::Color, OutputMode::Prefix, OutputMode::None];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputMode::Plain => "plain",
            OutputMode::Color => "color",
            OutputMode::Prefix => "prefix",
            OutputMode::None => "none",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        OutputMode::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| ConfigError::InvalidOutputMode(s.to_string()))
    }
}

/// Dispatcher options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct RunnerOptions {
    pub workers: usize,
    pub progress: bool,                 // show a count progress bar
    pub progress_label: Option<String>, // optional label for the bar
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            workers: 10,
            progress: false,
            progress_label: None,
        }
    }
}

impl RunnerOptions {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }

    /// Reject settings that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }
}

/// Options for the external-command action.
#[derive(Clone, Debug)]
pub struct CommandOptions {
    pub output: OutputMode,
    pub timeout: Duration, // per value; the child is killed when it expires
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            output: OutputMode::default(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl CommandOptions {
    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
