#![deny(clippy::all)]
#![deny(rust_2018_idioms)]

use std::net::SocketAddr;

use clap::{crate_version, Arg, Command};
use slog::info;

use adserver::{
    application::{Config, Environment},
    db::postgres::{migrations, postgres_connection, PostgresStore, POSTGRES_CONFIG},
    Application,
};
use primitives::util::logging::new_logger;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Command::new("Ad Server")
        .version(crate_version!())
        .arg(
            Arg::new("migrate")
                .long("migrate")
                .takes_value(false)
                .help("Apply the database migrations before starting"),
        )
        .get_matches();

    let config = Config::from_env()?;
    let logger = new_logger("adserver");

    // Development always runs with an up to date schema
    if cli.is_present("migrate") || config.env == Environment::Development {
        info!(&logger, "Applying database migrations");
        migrations().await;
    }

    let pool = postgres_connection(POSTGRES_CONFIG.clone()).await?;
    let store = PostgresStore::new(pool);

    let socket_addr = SocketAddr::new(config.ip_addr, config.port);
    Application::new(store, config, logger).run(socket_addr).await;

    Ok(())
}
