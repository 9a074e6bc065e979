use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use connect_console::auth::{FileMarker, TenantId, TenantResolver};
use connect_console::cli::{self, Commands, DeploymentCommands, LogsArgs, ObjectsArgs, TenantCommands};
use connect_console::config::{self, Config, LogFormat};
use connect_console::logs::{build_view, collect_pages, LogFilter, ViewOptions};
use connect_console::platform::{
    Console, CustomObjectQuery, DeploymentQuery, LogQuery, OrFallback, Queries,
};
use connect_console::{api, output, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load()?;
    init_tracing(cfg.log_format);

    if cfg.tenants.is_empty() {
        tracing::warn!("CTP_PROJECT_KEYS is empty, every tenant-scoped request will fail");
    }

    let args = cli::Cli::parse();
    let result = match args.command {
        Some(Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(Commands::Tenant { command }) => {
            let console = Console::new(cfg)?;
            handle_tenant_command(&console, command)
        }
        Some(Commands::Deployments { command }) => {
            let console = Console::new(cfg)?;
            handle_deployment_command(&console, command).await
        }
        Some(Commands::Logs(args)) => {
            let console = Console::new(cfg)?;
            handle_logs_command(&console, args).await
        }
        Some(Commands::Stats) => {
            let console = Console::new(cfg)?;
            let stats = cli_queries(&console)?
                .fetch_deployment_log_stats()
                .await
                .or_fallback();
            print!("{}", output::format_stats(&stats));
            Ok(())
        }
        Some(Commands::Objects(args)) => {
            let console = Console::new(cfg)?;
            handle_objects_command(&console, args).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "connect_console=info,tower_http=info".into()),
    );
    let (pretty, json) = match format {
        LogFormat::Pretty => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        ),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}

async fn run_server(cfg: Config, port: u16) -> anyhow::Result<()> {
    let production = cfg.production;
    let console = Console::new(cfg)?;
    let state = Arc::new(AppState { console });
    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, production, "connect-console listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn cli_resolver(console: &Console) -> TenantResolver {
    let marker = Arc::new(FileMarker::new(&console.config.tenant_file));
    console.resolver(marker)
}

/// The CLI falls back to the first configured project key until one is chosen.
fn cli_queries(console: &Console) -> anyhow::Result<Queries> {
    let tenant = cli_resolver(console).active_or_default()?;
    Ok(Queries::new(console.client.clone(), tenant))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_tenant_command(console: &Console, cmd: TenantCommands) -> anyhow::Result<()> {
    let resolver = cli_resolver(console);
    match cmd {
        TenantCommands::List => {
            let active = resolver.active_tenant().ok();
            print!(
                "{}",
                output::format_tenants(&resolver.tenants(), active.as_ref())
            );
        }
        TenantCommands::Show => match resolver.active_tenant() {
            Ok(tenant) => println!("{}", tenant),
            Err(_) => println!("No active project key. Use `connect-console tenant use <key>`."),
        },
        TenantCommands::Use { key } => {
            let switch = resolver.set_active_tenant(TenantId::from(key))?;
            match switch.previous {
                Some(prev) if prev != switch.active => {
                    println!("Switched project key: {} -> {}", prev, switch.active)
                }
                _ => println!("Active project key: {}", switch.active),
            }
        }
    }
    Ok(())
}

async fn handle_deployment_command(
    console: &Console,
    cmd: DeploymentCommands,
) -> anyhow::Result<()> {
    let queries = cli_queries(console)?;
    match cmd {
        DeploymentCommands::List { limit, json } => {
            let page = queries
                .fetch_deployments(&DeploymentQuery { key: None, limit })
                .await
                .context("failed to list deployments")?;
            if json {
                print_json(&page)?;
            } else {
                print!("{}", output::format_deployments(&page));
            }
        }
        DeploymentCommands::Show { key, json } => {
            let deployment = queries
                .fetch_deployment(&key)
                .await
                .with_context(|| format!("failed to load deployment '{}'", key))?;
            if json {
                print_json(&deployment)?;
            } else {
                print!("{}", output::format_deployment(&deployment));
            }
        }
    }
    Ok(())
}

async fn handle_logs_command(console: &Console, args: LogsArgs) -> anyhow::Result<()> {
    let options = ViewOptions {
        filter: LogFilter {
            log_type: args.log_type.parse().map_err(anyhow::Error::msg)?,
            severity: args.severity.parse().map_err(anyhow::Error::msg)?,
            search: args.search,
        },
        sort: args.sort.parse().map_err(anyhow::Error::msg)?,
        direction: args.direction.parse().map_err(anyhow::Error::msg)?,
        group: args.group,
    };

    let queries = cli_queries(console)?;
    let query = LogQuery {
        key: args.key.clone(),
        application_name: args.app,
        start_date: args.from,
        end_date: args.to,
        page_token: None,
    };
    let (feed, error) = collect_pages(&queries, query, args.pages).await;

    let Some(page) = feed.page() else {
        let e = error.map(anyhow::Error::from).unwrap_or_else(|| anyhow::anyhow!("no logs loaded"));
        return Err(e.context(format!("failed to load logs for '{}'", args.key)));
    };
    if let Some(e) = &error {
        eprintln!(
            "Warning: stopped after {} page(s): {}",
            feed.pages_loaded(),
            e
        );
    }

    let view = build_view(&page.data, &options);
    if args.json {
        print_json(&view)?;
    } else {
        print!("{}", output::format_log_groups(&view.groups));
        println!(
            "{} of {} loaded logs match{}",
            view.matched,
            page.data.len(),
            if page.next.is_some() {
                " (more available, raise --pages)"
            } else {
                ""
            }
        );
    }
    Ok(())
}

async fn handle_objects_command(console: &Console, args: ObjectsArgs) -> anyhow::Result<()> {
    let queries = cli_queries(console)?;
    let page = queries
        .fetch_custom_objects(&CustomObjectQuery {
            container: args.container,
            key: args.key,
            limit: args.limit,
            offset: args.offset,
        })
        .await
        .context("failed to list custom objects")?;
    if args.json {
        print_json(&page)?;
    } else {
        print!("{}", output::format_custom_objects(&page));
    }
    Ok(())
}
