mod config;
mod error;
mod interrupt;
mod stop;

mod collector;
mod worker;
mod runner;

mod command;
mod output;
mod values;
mod progress;
mod util;

pub use crate::config::{CommandOptions, OutputMode, RunnerOptions};
pub use crate::error::{AggregateError, ConfigError, RunFailure, ValueError};
pub use crate::interrupt::InterruptFlag;
pub use crate::runner::Runner;
pub use crate::worker::Action;

// Stop plumbing: an abstract single-shot signal plus the OS wiring for binaries.
pub use crate::stop::{install_os_handler, stop_signal, StopSignal, StopTrigger};

// The process-spawning action and its output rendering.
pub use crate::command::{run_combined_with_timeout, CapturedOutput, CommandAction, CommandError, VALUE_ENV};
pub use crate::output::{color_enabled, prefix_lines, render_block, OutputSink, Paint, PREFIX_WIDTH};

pub use crate::values::{read_values_file, split_values};
pub use crate::progress::{make_count_progress, ProgressScope};
pub use crate::util::init_tracing_once;
