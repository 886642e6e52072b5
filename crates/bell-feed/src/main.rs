use anyhow::{anyhow, Context, Result};
use bell_backend::{HttpBackend, NotificationBackend, SessionToken};
use bell_feed::{badge_text, BellConfig, FeedController, FeedEvent};
use bell_model::{relative_time, NotificationId, NotificationRecord};
use chrono::Utc;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn cli() -> Command {
    let id = || {
        Arg::new("id")
            .required(true)
            .value_parser(value_parser!(u64))
            .help("Notification id")
    };

    Command::new("bell")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Admin notification bell: live feed, read and delete")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML config file (BELL_API_URL, BELL_PUSH_URL, BELL_TOKEN override it)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(Command::new("watch").about("Run a live session and report badge changes until Ctrl-C"))
        .subcommand(Command::new("list").about("Fetch and print recent notifications"))
        .subcommand(Command::new("read").about("Mark one notification read").arg(id()))
        .subcommand(Command::new("read-all").about("Mark every notification read"))
        .subcommand(Command::new("delete").about("Delete one notification").arg(id()))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<BellConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => BellConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => {
            let config = BellConfig::default().with_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }
}

fn http_backend(config: &BellConfig) -> Result<HttpBackend> {
    let tokens = Arc::new(SessionToken::new(config.token.clone()));
    Ok(HttpBackend::new(
        &config.notifications_url()?,
        config.request_timeout(),
        tokens,
    )?)
}

fn id_arg(args: &ArgMatches) -> Result<NotificationId> {
    args.get_one::<u64>("id")
        .copied()
        .map(NotificationId)
        .ok_or_else(|| anyhow!("missing notification id"))
}

fn print_record(record: &NotificationRecord) {
    let marker = if record.read { " " } else { "*" };
    let id = record
        .id
        .map_or_else(|| "-".to_string(), |id| id.to_string());
    println!(
        "{marker} #{id:<6} {:<22} {}  ({})",
        record.kind.label(),
        record.title,
        relative_time(record.created_at, Utc::now())
    );
    if !record.body.is_empty() {
        println!("           {}", record.body);
    }
}

async fn watch(config: &BellConfig) -> Result<()> {
    let controller = FeedController::connect_http(config)?;
    let mut reader = controller.reader();
    let mut events = controller.subscribe_events();

    controller.activate().await?;
    println!("badge: {}", badge_text(reader.unread_count()).unwrap_or_default());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            snapshot = reader.changed() => {
                let Ok(snapshot) = snapshot else { break };
                println!(
                    "badge: {} ({} notifications)",
                    badge_text(snapshot.unread_count()).unwrap_or_default(),
                    snapshot.len()
                );
            }
            event = events.recv() => match event {
                Ok(event) if event.is_error() => tracing::warn!(?event, "feed error"),
                Ok(FeedEvent::FeedReplaced { count }) => tracing::info!("feed replaced with {} notifications", count),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "event subscriber lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("watch", _)) => watch(&config).await?,
        Some(("list", _)) => {
            let records = http_backend(&config)?.fetch_recent().await?;
            if records.is_empty() {
                println!("No notifications");
            }
            for record in &records {
                print_record(record);
            }
        }
        Some(("read", args)) => {
            let id = id_arg(args)?;
            http_backend(&config)?.mark_read(id).await?;
            println!("marked {id} read");
        }
        Some(("read-all", _)) => {
            http_backend(&config)?.mark_all_read().await?;
            println!("marked all read");
        }
        Some(("delete", args)) => {
            let id = id_arg(args)?;
            http_backend(&config)?.delete(id).await?;
            println!("deleted {id}");
        }
        _ => return Err(anyhow!("no subcommand given")),
    }

    Ok(())
}
