use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tailmux::{interval_from_secs, tail_last_lines, ColorMode, GlobSet, Printer, TailEvent, TailMux};

const DEFAULT_GLOBS: &[&str] = &["*.log", "*.log.*"];

/// Follow log files under a directory tree, printing appended lines as
/// they arrive.
#[derive(Parser, Debug)]
#[command(name = "tailmux", version)]
struct Args {
    /// Directory tree to watch
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Filename glob to follow; repeatable [default: *.log, *.log.*]
    #[arg(short, long = "glob", value_name = "PATTERN")]
    globs: Vec<String>,

    /// Seconds between drain passes over tracked files
    #[arg(long, value_name = "SECS", default_value_t = 0.2)]
    poll_interval: f64,

    /// Seconds between discovery scans of the tree
    #[arg(long, value_name = "SECS", default_value_t = 1.0)]
    scan_interval: f64,

    /// Print up to N trailing lines of each file found at startup
    #[arg(short = 'n', long, value_name = "N", default_value_t = 0)]
    initial_lines: usize,

    /// When to color output
    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    color: ColorMode,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let poll_every = interval_from_secs(args.poll_interval)?;
    let scan_every = interval_from_secs(args.scan_interval)?;

    let patterns: Vec<String> = if args.globs.is_empty() {
        DEFAULT_GLOBS.iter().map(|s| s.to_string()).collect()
    } else {
        args.globs.clone()
    };

    let mut mux = TailMux::new(&args.root, GlobSet::new(patterns.clone())).await?;

    let printer = Printer::new(mux.root(), args.color);
    printer.banner(
        mux.tracked_count(),
        &patterns,
        args.scan_interval,
        args.poll_interval,
    );

    if args.initial_lines > 0 {
        let startup_files: Vec<PathBuf> = mux.tracked_paths().map(|p| p.to_path_buf()).collect();
        for path in startup_files {
            match tail_last_lines(&path, args.initial_lines).await {
                Ok(lines) => {
                    for line in lines {
                        printer.emit(&path, &line);
                    }
                }
                Err(err) => {
                    tracing::debug!(path = %path.display(), error = %err, "initial lines unavailable");
                }
            }
        }
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.cancel();
        }
    });

    mux.run(scan_every, poll_every, shutdown, |event| match event {
        TailEvent::NewFile(path) => printer.announce(&path),
        TailEvent::Line { source, line } => printer.emit(&source, &line),
    })
    .await;

    printer.shutdown();
    Ok(())
}
