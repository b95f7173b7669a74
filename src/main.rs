use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, Level};

use reserve_stats::{
    configuration::{
        get_configuration, set_configuration, AppState, Config, State,
    },
    error::Error,
    handler::{block_tracker, Scheduler},
    provider::{DatabasePool, IntervalRunner, Intervals, HTTP},
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level(Level::INFO)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let (config, database) = match init().await {
        Ok((config, database)) => (config, database),
        Err(e) => return Err(Error::ConfigurationError(e.to_string())),
    };

    let database = Arc::new(database);
    let http = Arc::new(HTTP::new(config.clone())?);
    let intervals = Intervals::from_config(&config);

    let state = State::new(
        config,
        http,
        database.clone(),
        database.clone(),
        database.clone(),
        database,
    );
    let app_state = AppState::new(state);

    block_tracker::fetch_current_block(app_state.clone(), Utc::now()).await?;

    let runner = Arc::new(IntervalRunner::new(intervals));
    let mut scheduler = Scheduler::new(app_state, runner);
    scheduler.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    scheduler.stop().await
}

async fn init() -> Result<(Config, DatabasePool), Error> {
    set_configuration()?;
    let config = get_configuration()?;
    let database = DatabasePool::new(&config).await?;
    database.init_migrations().await?;
    Ok((config, database))
}
