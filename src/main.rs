use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yearofhorse::{
    cli::{Cli, Command},
    commands,
    error::{ServiceError, ServiceResult},
    server::{self, ServerState, Transports},
    storage::Storage,
    store::GoalStore,
};

#[tokio::main]
async fn main() -> ServiceResult<()> {
    // stdout belongs to the stdio transport
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    cli.engine.validate().map_err(ServiceError::Config)?;

    let storage = Storage::new(cli.storage.store_path()?);
    let mut store = GoalStore::new(cli.engine.clone());
    storage.hydrate(&mut store)?;

    match cli.command {
        Command::Start(args) => {
            tracing::info!("Starting {} goal engine", yearofhorse::metadata::PKG_NAME);
            let transports = Transports {
                stdio: args.enable_stdio,
                http: args.enable_http.then(|| args.http_addr.clone()),
            };
            let state = Arc::new(ServerState::new(store, storage, transports));
            server::start_server(args, state).await
        }
        command => commands::run(command, &mut store, &storage),
    }
}
