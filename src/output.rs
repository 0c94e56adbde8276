//! Rendering a child's captured output: plain, value-prefixed, or prefixed and
//! painted with a rotating colour per block.

use crate::config::OutputMode;
use parking_lot::Mutex;
use regex::{NoExpand, Regex};
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;

/// Width the value is right-aligned to in line prefixes.
pub const PREFIX_WIDTH: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Paint {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
}

impl Paint {
    pub const WHEEL: [Paint; 6] = [Paint::Red, Paint::Green, Paint::Yellow, Paint::Blue, Paint::Magenta, Paint::Cyan];

    fn code(self) -> u8 {
        match self {
            Paint::Red => 31,
            Paint::Green => 32,
            Paint::Yellow => 33,
            Paint::Blue => 34,
            Paint::Magenta => 35,
            Paint::Cyan => 36,
        }
    }

    pub fn paint(self, text: &str) -> String {
        format!("\u{1b}[{}m{text}\u{1b}[39m", self.code())
    }
}

fn line_start() -> &'static Regex {
    static LINE_START: OnceLock<Regex> = OnceLock::new();
    LINE_START.get_or_init(|| Regex::new(r"(?m)^").expect("line-start pattern is valid"))
}

/// Prefix every line of `text` with `value` right-aligned to [`PREFIX_WIDTH`] and a `|`.
pub fn prefix_lines(value: &str, text: &str) -> String {
    let prefix = format!("{value:>width$}|", width = PREFIX_WIDTH);
    line_start().replace_all(text, NoExpand(&prefix)).into_owned()
}

/// Render one block of output, without the final newline.
///
/// Returns `None` when nothing should be printed: mode `none`, or output that
/// is empty once a single trailing newline is removed.
pub fn render_block(mode: OutputMode, value: &str, output: &str, paint: Option<Paint>) -> Option<String> {
    if mode == OutputMode::None {
        return None;
    }
    let text = output.strip_suffix('\n').unwrap_or(output);
    if text.is_empty() {
        return None;
    }
    let block = match mode {
        OutputMode::Plain => text.to_string(),
        OutputMode::Prefix => prefix_lines(value, text),
        OutputMode::Color => {
            let prefixed = prefix_lines(value, text);
            match paint {
                Some(p) => p.paint(&prefixed),
                None => prefixed,
            }
        }
        OutputMode::None => return None,
    };
    Some(block)
}

/// Decide whether to emit ANSI colour from `NO_COLOR`, `FORCE_COLOR` and
/// whether the output is a terminal. Empty variables count as unset.
pub fn color_enabled(no_color: Option<&str>, force_color: Option<&str>, is_terminal: bool) -> bool {
    let set = |v: Option<&str>| v.is_some_and(|s| !s.trim().is_empty());
    if set(no_color) {
        return false;
    }
    is_terminal || set(force_color)
}

struct SinkState {
    next_paint: usize,
    out: Box<dyn Write + Send>,
}

/// Serialises output blocks from concurrent workers onto one writer.
///
/// The colour wheel position lives behind the same lock as the writer, so
/// consecutive blocks get consecutive colours and never interleave.
pub struct OutputSink {
    mode: OutputMode,
    paint: bool,
    state: Mutex<SinkState>,
}

impl OutputSink {
    /// Colour is only painted when stdout is a terminal (or `FORCE_COLOR` is
    /// set) and `NO_COLOR` is unset; otherwise `color` mode keeps the prefix.
    pub fn stdout(mode: OutputMode) -> Self {
        let paint = color_enabled(
            std::env::var("NO_COLOR").ok().as_deref(),
            std::env::var("FORCE_COLOR").ok().as_deref(),
            io::stdout().is_terminal(),
        );
        Self::to_writer(mode, io::stdout()).with_paint(paint)
    }

    pub fn to_writer(mode: OutputMode, out: impl Write + Send + 'static) -> Self {
        Self {
            mode,
            paint: true,
            state: Mutex::new(SinkState { next_paint: 0, out: Box::new(out) }),
        }
    }

    /// Turn ANSI colouring of `color` blocks on or off.
    pub fn with_paint(mut self, yes: bool) -> Self {
        self.paint = yes;
        self
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn paints(&self) -> bool {
        self.paint
    }

    /// Write `output` captured for `value`, if the mode prints anything.
    pub fn emit(&self, value: &str, output: &str) -> io::Result<()> {
        if self.mode == OutputMode::None {
            return Ok(());
        }
        let mut state = self.state.lock();
        let paint = if self.mode == OutputMode::Color && self.paint {
            Some(Paint::WHEEL[state.next_paint])
        } else {
            None
        };
        let Some(block) = render_block(self.mode, value, output, paint) else {
            return Ok(());
        };
        if paint.is_some() {
            state.next_paint = (state.next_paint + 1) % Paint::WHEEL.len();
        }
        writeln!(state.out, "{block}")?;
        state.out.flush()
    }
}
