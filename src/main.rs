mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;

use cli::{Cli, Commands};
use comment_watch::config::CommentWatchConfig;
use comment_watch::{CommentRef, CommentTriggerWatcher, MarkerSpec, TriggerHooks, WatchOptions};
use comment_watch::{scan, walker};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            path,
            marker,
            debounce_ms,
            include_existing,
            json,
        } => run_watch(&path, marker.as_deref(), debounce_ms, include_existing, json).await,
        Commands::Scan {
            path,
            marker,
            verbose,
            json,
        } => run_scan(&path, marker.as_deref(), verbose, json),
    }
}

/// Build the marker rules from config plus CLI override.
fn marker_spec_from(config: &CommentWatchConfig, marker_flag: Option<&str>) -> Result<MarkerSpec> {
    let token = marker_flag
        .or(config.marker.as_deref())
        .unwrap_or(scan::DEFAULT_MARKER_TOKEN);
    let prefix = match config.trigger_prefix.as_deref() {
        None => scan::DEFAULT_TRIGGER_PREFIX,
        Some(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => bail!("trigger_prefix must be exactly one character, got {s:?}"),
            }
        }
    };
    MarkerSpec::new(token, prefix)
}

/// Build the watch options from config plus CLI overrides.
fn watch_options_from(
    config: &CommentWatchConfig,
    debounce_flag: Option<u64>,
    include_existing_flag: bool,
) -> WatchOptions {
    let mut options = WatchOptions::default();
    if let Some(ms) = debounce_flag.or(config.watch.debounce_ms) {
        options.debounce = Duration::from_millis(ms);
    }
    if let Some(ms) = config.watch.poll_interval_ms {
        options.poll_interval = Duration::from_millis(ms);
    }
    options.include_existing =
        include_existing_flag || config.watch.include_existing.unwrap_or(false);
    if let Some(extra) = &config.exclude {
        options.ignore_patterns.extend(extra.iter().cloned());
    }
    options
}

async fn run_watch(
    path: &Path,
    marker_flag: Option<&str>,
    debounce_flag: Option<u64>,
    include_existing: bool,
    json: bool,
) -> Result<()> {
    let config = CommentWatchConfig::load(path);
    let marker = marker_spec_from(&config, marker_flag)?;
    let options = watch_options_from(&config, debounce_flag, include_existing);

    let token = marker.token().to_string();
    let prefix = marker.trigger_prefix();
    let root = path.display().to_string();
    let hooks = TriggerHooks {
        on_reference: Box::new(move |group, pending| print_reference(group, pending, json)),
        on_trigger: Box::new(move |pending| print_trigger(pending, json)),
        on_ready: Box::new(move || {
            if json {
                println!("{}", serde_json::json!({ "event": "ready" }));
            } else {
                println!(
                    "Watching {root} for '{token}' comments ('{prefix}{token}' fires the batch, ctrl-c to stop)"
                );
            }
        }),
        on_error: Box::new(|message| eprintln!("watch error: {message}")),
    };

    let mut watcher = CommentTriggerWatcher::with_default_backend(hooks, marker, options)?;
    watcher.watch(path)?;

    tokio::signal::ctrl_c().await?;
    let undispatched = watcher.pending_comments();
    if !undispatched.is_empty() && !json {
        eprintln!(
            "{} pending comment(s) were never dispatched",
            undispatched.len()
        );
    }
    watcher.close();
    Ok(())
}

fn print_reference(group: &CommentRef, pending: &[CommentRef], json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "event": "reference",
                "comment": group,
                "pending": pending.len(),
            })
        );
        return;
    }
    println!(
        "{}:{}: {}",
        group.path.display(),
        group.line,
        group.lines.first().map(String::as_str).unwrap_or("").trim()
    );
    if pending.len() > 1 {
        println!("  {} comment(s) pending", pending.len());
    }
}

fn print_trigger(pending: &[CommentRef], json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "event": "trigger",
                "comments": pending,
            })
        );
        return;
    }
    println!("Trigger: dispatching {} pending comment(s)", pending.len());
    for comment in pending {
        for line in &comment.lines {
            println!("  {}:{}: {}", comment.path.display(), comment.line, line.trim());
        }
    }
}

fn run_scan(path: &Path, marker_flag: Option<&str>, verbose: bool, json: bool) -> Result<()> {
    let config = CommentWatchConfig::load(path);
    let marker = marker_spec_from(&config, marker_flag)?;
    let options = watch_options_from(&config, None, false);
    let ignores = options.ignore_set()?;

    let mut comments: Vec<CommentRef> = Vec::new();
    for file in walker::collect_files(path, &ignores) {
        if verbose {
            eprintln!("{}", file.display());
        }
        // Unreadable or non-text files simply carry no markers.
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        if let Some(found) = scan::scan_markers(&content, &marker) {
            comments.push(CommentRef::from_scan(file, found));
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "count": comments.len(),
                "comments": comments,
            }))?
        );
        return Ok(());
    }

    if comments.is_empty() {
        println!("No marker comments found.");
        return Ok(());
    }
    for comment in &comments {
        for line in &comment.lines {
            println!("{}:{}: {}", comment.path.display(), comment.line, line.trim());
        }
    }
    println!("Found {} file(s) with marker comments.", comments.len());
    Ok(())
}
