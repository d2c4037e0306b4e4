use jobdash::config::Config;
use jobdash::controllers::notify::drain;
use jobdash::controllers::{DeletePrompt, HistoryContent, NotificationKind};
use jobdash::jobs::{JobId, JobStatus, SortKey, StatusFilter};
use jobdash::{logging, Dashboard};

use std::env;
use std::io::{self, BufRead, Write};

const USAGE: &str = "jobctl <command>\n\
Commands:\n\
- list [--page N] [--page-size N] [--status STATUS|ALL] [--sort KEY]\n\
- create <name...>\n\
- set-status <job_id> <PENDING|RUNNING|COMPLETED|FAILED>\n\
- delete <job_id> [--yes]\n\
- history <job_id>\n\
\n\
Sort keys: date-newest, date-oldest, name-asc, name-desc, status.\n\
Uses JOBDASH_API_BASE_URL (or API_BASE_URL).\n";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }

    let cfg = Config::from_env()?;
    logging::init(&cfg.log_filter);
    tracing::debug!(api = %cfg.api_base_url, page_size = cfg.page_size, "jobctl starting");

    let mut dash = Dashboard::from_config(&cfg)?;

    let result = match args[1].as_str() {
        "list" => list(&dash, &args[2..]).await,
        "create" => {
            let name = args[2..].join(" ");
            create(&dash, &name).await
        }
        "set-status" => {
            let (id, status) = match (args.get(2), args.get(3)) {
                (Some(id), Some(status)) => (id.parse::<JobId>()?, status.parse::<JobStatus>()?),
                _ => anyhow::bail!("usage: jobctl set-status <job_id> <STATUS>"),
            };
            set_status(&dash, id, status).await
        }
        "delete" => {
            let id: JobId = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("usage: jobctl delete <job_id> [--yes]"))?
                .parse()?;
            let assume_yes = args[3..].iter().any(|a| a == "--yes" || a == "-y");
            delete(&dash, id, assume_yes).await
        }
        "history" => {
            let id: JobId = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("usage: jobctl history <job_id>"))?
                .parse()?;
            history(&dash, id).await
        }
        other => {
            eprintln!("Unknown command: {other}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    print_notifications(&mut dash);
    result
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

async fn list(dash: &Dashboard, args: &[String]) -> anyhow::Result<()> {
    // query changes go through the controller so page resets apply
    let mut fetched = false;
    if let Some(size) = flag_value(args, "--page-size") {
        dash.list.set_page_size(size.parse()?).await?;
        fetched = true;
    }
    if let Some(status) = flag_value(args, "--status") {
        dash.list.set_filter(status.parse::<StatusFilter>()?).await?;
        fetched = true;
    }
    if let Some(key) = flag_value(args, "--sort") {
        dash.list.set_sort(key.parse::<SortKey>()?).await?;
        fetched = true;
    }
    // set_page refetches, and a page past the end is pulled back
    if let Some(page) = flag_value(args, "--page") {
        dash.list.set_page(page.parse()?).await?;
    } else if !fetched {
        dash.list.refresh().await?;
    }

    print_list(dash);
    Ok(())
}

fn print_list(dash: &Dashboard) {
    let jobs = dash.list.visible_jobs();
    let info = dash.list.page_info();
    let query = dash.list.query();

    println!(
        "Jobs ({} of {}) filter={} sort={}",
        jobs.len(),
        info.total_count,
        query.status_filter.as_str(),
        query.sort_key.label()
    );

    if jobs.is_empty() {
        if info.total_count == 0 && query.status_filter == StatusFilter::All {
            println!("No jobs yet. Create one to get started.");
        } else {
            println!("No jobs match the current filter. Try selecting a different status.");
        }
    }

    for job in &jobs {
        println!(
            "{:>6}  {:<10} {:<6} {}  {}",
            job.id,
            job.status_label(),
            job.badge_color().as_str(),
            job.created_at.format("%Y-%m-%d %H:%M:%S"),
            job.name
        );
    }

    println!("{}", info.summary());
}

async fn create(dash: &Dashboard, name: &str) -> anyhow::Result<()> {
    let job = dash.lifecycle.create(name).await?;
    println!(
        "created job id={} name={} status={}",
        job.id,
        job.name,
        job.status_label()
    );
    print_list(dash);
    Ok(())
}

async fn set_status(dash: &Dashboard, id: JobId, status: JobStatus) -> anyhow::Result<()> {
    // the editor is seeded from the listed job, so the job must be on page 1
    dash.list.refresh().await?;
    let current = dash.lifecycle.begin_edit_status(id)?;
    dash.lifecycle.select_pending_status(id, status);
    println!("job {id}: {current} -> {status}");

    let job = dash.lifecycle.confirm_edit_status(id, status).await?;
    println!("job {} is now {}", job.id, job.status_label());
    Ok(())
}

async fn delete(dash: &Dashboard, id: JobId, assume_yes: bool) -> anyhow::Result<()> {
    dash.list.refresh().await?;
    let prompt = dash.lifecycle.request_delete(id)?;

    let confirmed = assume_yes || ask(&prompt)?;
    if !confirmed {
        dash.lifecycle.cancel_delete(id);
        println!("cancelled");
        return Ok(());
    }

    // failure is reported through the notification queue
    let _ = dash.lifecycle.confirm_delete(id).await;
    Ok(())
}

fn ask(prompt: &DeletePrompt) -> anyhow::Result<bool> {
    let Some(message) = prompt.message() else {
        return Ok(false);
    };
    print!("{message} [y/N] ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn history(dash: &Dashboard, id: JobId) -> anyhow::Result<()> {
    let panel = dash.history_panel(id);
    panel.expand().await;

    println!("Status History (job {id})");
    for line in panel.render() {
        println!("  {line}");
    }

    if let HistoryContent::Failed(_) = panel.content() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_notifications(dash: &mut Dashboard) {
    for n in drain(&mut dash.notifications) {
        match n.kind {
            NotificationKind::Success => println!("[{}] {}", n.title, n.message),
            NotificationKind::Error => eprintln!("[{}] {}", n.title, n.message),
        }
    }
}
