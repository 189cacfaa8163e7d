//! Stdout formatting for emitted lines and diagnostics.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Style};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// When to decorate output with ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    /// Color only when stdout is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn enabled(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => std::io::stdout().is_terminal(),
        }
    }
}

/// One style per output field; all no-ops when color is off.
struct FieldStyles {
    source: Style,
    timestamp: Style,
    content: Style,
}

impl FieldStyles {
    fn new(enabled: bool) -> Self {
        if enabled {
            FieldStyles {
                source: Style::new().green(),
                timestamp: Style::new().dimmed(),
                content: Style::new(),
            }
        } else {
            FieldStyles {
                source: Style::new(),
                timestamp: Style::new(),
                content: Style::new(),
            }
        }
    }
}

/// Formats emitted lines as `[<path>] [<timestamp>] <content>` and prints
/// the startup banner, per-file announcements and the shutdown line.
///
/// Paths are shown relative to the watch root with forward-slash
/// separators on every platform; a path outside the root falls back to its
/// absolute form.
pub struct Printer {
    root: PathBuf,
    styles: FieldStyles,
}

impl Printer {
    pub fn new(root: impl Into<PathBuf>, mode: ColorMode) -> Self {
        Printer {
            root: root.into(),
            styles: FieldStyles::new(mode.enabled()),
        }
    }

    /// Root-relative display form of a path.
    pub fn display_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(relative) => {
                let parts: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                parts.join("/")
            }
            Err(_) => path.display().to_string(),
        }
    }

    fn format_line(&self, source: &Path, timestamp: &str, content: &str) -> String {
        format!(
            "{} {} {}",
            format!("[{}]", self.display_path(source)).style(self.styles.source),
            format!("[{}]", timestamp).style(self.styles.timestamp),
            content.style(self.styles.content),
        )
    }

    /// Prints one log line stamped with the current wall-clock time.
    pub fn emit(&self, source: &Path, content: &str) {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        println!("{}", self.format_line(source, &timestamp, content));
    }

    pub fn banner(&self, file_count: usize, globs: &[String], scan_secs: f64, poll_secs: f64) {
        println!(
            "tailing {} file(s) under {} (globs: {}; scan {}s, poll {}s)",
            file_count,
            self.root.display(),
            globs.join(", "),
            scan_secs,
            poll_secs,
        );
    }

    /// Announces a file discovered after startup.
    pub fn announce(&self, path: &Path) {
        println!(
            "{}",
            format!("[watch] {}", self.display_path(path)).style(self.styles.source)
        );
    }

    pub fn shutdown(&self) {
        println!("shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_path_is_root_relative_with_forward_slashes() {
        let printer = Printer::new("/var/log", ColorMode::Never);
        let path = Path::new("/var/log/nginx/access.log");
        assert_eq!(printer.display_path(path), "nginx/access.log");
    }

    #[test]
    fn display_path_outside_root_falls_back_to_absolute() {
        let printer = Printer::new("/var/log", ColorMode::Never);
        let path = Path::new("/tmp/other.log");
        assert_eq!(printer.display_path(path), "/tmp/other.log");
    }

    #[test]
    fn plain_mode_emits_no_escape_codes() {
        let printer = Printer::new("/var/log", ColorMode::Never);
        let line = printer.format_line(
            Path::new("/var/log/a.log"),
            "2026-01-02 03:04:05.678",
            "hello",
        );
        assert_eq!(line, "[a.log] [2026-01-02 03:04:05.678] hello");
    }

    #[test]
    fn always_mode_wraps_fields_in_escape_codes() {
        let printer = Printer::new("/var/log", ColorMode::Always);
        let line = printer.format_line(Path::new("/var/log/a.log"), "ts", "hello");
        assert!(line.contains("\x1b["));
        assert!(line.contains("a.log"));
        assert!(line.contains("hello"));
    }
}
