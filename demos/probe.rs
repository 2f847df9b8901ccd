//! Run a single HTTP measurement against a URL
//!
//! Usage: cargo run --example probe -- <url> [method]

use netprobe::{ProbeConfig, TaskDescriptor, TaskRunner, TaskSchedule, build_task};
use std::collections::HashMap;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let raw_url = args.next().expect("usage: probe <url> [method]");
    let method = args.next().unwrap_or_else(|| "get".to_string());

    let descriptor = TaskDescriptor {
        task_type: "http".to_string(),
        schedule: TaskSchedule {
            key: Some("probe-cli".to_string()),
            ..Default::default()
        },
        parameters: Some(HashMap::from([
            ("url".to_string(), raw_url.clone()),
            ("method".to_string(), method),
        ])),
    };
    let task = build_task(&descriptor)?;

    println!("═══════════════════════════════════════════════════════════");
    println!("  netprobe");
    println!("═══════════════════════════════════════════════════════════");
    let description = task.describe();
    // Echo the host the normalized target resolves to, when it parses
    if let Some(target) = description.lines().nth(1)
        && let Some(normalized) = target.trim().strip_prefix("Target: ")
        && let Ok(parsed) = url::Url::parse(normalized)
    {
        println!("  Host: {}", parsed.host_str().unwrap_or("-"));
    }
    println!("{description}");
    println!("═══════════════════════════════════════════════════════════");

    let (runner, mut outcomes) = TaskRunner::new(ProbeConfig::default());

    let mut progress = runner.subscribe_progress();
    tokio::spawn(async move {
        while let Ok(update) = progress.recv().await {
            println!(
                "  [{}] {:>3}%",
                update.task_key.as_deref().unwrap_or("-"),
                update.percent
            );
        }
    });

    runner.submit(task);
    match outcomes.recv().await {
        Some(outcome) => match outcome.outcome {
            Ok(result) => {
                println!("{result}");
                println!("  metrics: {}", result.to_metrics());
            }
            Err(e) => eprintln!("measurement failed: {e}"),
        },
        None => eprintln!("runner dropped without delivering an outcome"),
    }
    Ok(())
}
