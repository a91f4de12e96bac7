use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{config::load_settings, ClientSession, Dispatch, DispatchPolicy};
use shared::{
    domain::{DocumentId, Interface},
    protocol::Intent,
};
use tokio_stream::StreamExt;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    /// Overrides `server_url` from client.toml and the environment.
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lists documents, following pages until `--pages` or the last page.
    Find {
        interface: Interface,
        #[arg(long)]
        term: Option<String>,
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    Get {
        interface: Interface,
        id: String,
    },
    Remove {
        interface: Interface,
        id: String,
    },
    /// Prints change notifications until interrupted.
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    let session = ClientSession::start(settings)?;

    let result = match cli.command {
        Command::Find {
            interface,
            term,
            pages,
        } => find(&session, interface, term, pages).await,
        Command::Get { interface, id } => {
            let intent = Intent::Get {
                interface,
                id: DocumentId::from(id),
            };
            run(&session, intent).await.and_then(|()| {
                let detail = session
                    .dispatcher()
                    .read(|store| store.detail(interface).cloned());
                if let Some(document) = detail {
                    println!("{}", serde_json::to_string_pretty(&document)?);
                }
                Ok(())
            })
        }
        Command::Remove { interface, id } => {
            let intent = Intent::Remove {
                interface,
                id: DocumentId::from(id.clone()),
            };
            run(&session, intent).await.map(|()| println!("removed {interface}/{id}"))
        }
        Command::Watch => watch(&session).await,
    };

    session.end().await;
    result
}

async fn find(
    session: &ClientSession,
    interface: Interface,
    term: Option<String>,
    pages: u32,
) -> Result<()> {
    for page in 1..=pages.max(1) {
        run(
            session,
            Intent::Find {
                interface,
                term: term.clone(),
                page,
            },
        )
        .await?;
        let has_more = session
            .dispatcher()
            .read(|store| store.collection(interface).has_more_pages());
        if !has_more {
            break;
        }
    }

    let collection = session
        .dispatcher()
        .read(|store| store.collection(interface).clone());
    for document in collection.documents.iter().flatten() {
        println!("{}", serde_json::to_string(document)?);
    }
    println!(
        "page {}/{} ({} shown, {} found, {} total)",
        collection.page,
        collection.page_count,
        collection.len(),
        collection
            .found_count
            .map_or_else(|| "?".to_string(), |n| n.to_string()),
        collection
            .total_count
            .map_or_else(|| "?".to_string(), |n| n.to_string()),
    );
    Ok(())
}

/// Runs `intent` to completion. Each command awaits its own outcome, so the
/// configured throttle does not apply here.
async fn run(session: &ClientSession, intent: Intent) -> Result<()> {
    let kind = intent.kind();
    match session.dispatch_with(intent, DispatchPolicy::Every) {
        Dispatch::Spawned(task) => task.await.context("request task aborted")??,
        Dispatch::Buffered => bail!("{kind} was buffered instead of run"),
    }

    let store = session.dispatcher().snapshot();
    if store.is_logged_out() {
        bail!("session expired; sign in again");
    }
    if let Some(failure) = store.error(kind) {
        bail!("{kind} failed ({}): {}", failure.status, failure.message);
    }
    Ok(())
}

async fn watch(session: &ClientSession) -> Result<()> {
    session.connect_change_feed().await?;
    let mut events = session.dispatcher().event_stream();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = events.next() => match next {
                Some(Ok(event)) => println!("{}", serde_json::to_string(&event)?),
                Some(Err(err)) => warn!(error = %err, "event stream lagged"),
                None => break,
            },
        }
    }
    Ok(())
}
