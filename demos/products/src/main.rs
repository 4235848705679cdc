//! `products-demo serve` runs the products server; `products-demo walkthrough`
//! drives it through a configured collection.

use std::path::PathBuf;
use std::sync::Arc;

use admin_api_core::logging::setup_logging;
use anyhow::Context;
use products_demo::settings::{self, ACTION_COLLECTION, REST_COLLECTION};
use products_demo::store::ProductStore;
use products_demo::{server, walkthrough};

fn build_cli() -> clap::Command {
    clap::Command::new("products-demo")
        .about("Products collection over the action and REST protocols")
        .subcommand_required(true)
        .subcommand(
            clap::Command::new("serve")
                .about("Serve the products collection")
                .arg(
                    clap::Arg::new("host")
                        .long("host")
                        .default_value("127.0.0.1")
                        .help("Address to bind"),
                )
                .arg(
                    clap::Arg::new("port")
                        .long("port")
                        .default_value("8000")
                        .value_parser(clap::value_parser!(u16))
                        .help("Port to bind"),
                ),
        )
        .subcommand(
            clap::Command::new("walkthrough")
                .about("Run a client session against a running server")
                .arg(
                    clap::Arg::new("collection")
                        .long("collection")
                        .default_value(REST_COLLECTION)
                        .value_parser([REST_COLLECTION, ACTION_COLLECTION])
                        .help("Which configured collection to use"),
                )
                .arg(
                    clap::Arg::new("config")
                        .long("config")
                        .default_value("products.toml")
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Settings file; built-in settings are used if it is missing"),
                )
                .arg(
                    clap::Arg::new("server")
                        .long("server")
                        .default_value("http://127.0.0.1:8000")
                        .help("Base URL used by the built-in settings"),
                ),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("serve", sub)) => {
            let host = sub.get_one::<String>("host").map_or("127.0.0.1", String::as_str);
            let port = sub.get_one::<u16>("port").copied().unwrap_or(8000);
            setup_logging(&settings::demo_settings(&format!("http://{host}:{port}")));

            let app = server::router(Arc::new(ProductStore::with_sample_data()));
            let listener = tokio::net::TcpListener::bind((host, port))
                .await
                .with_context(|| format!("failed to bind {host}:{port}"))?;
            tracing::info!(addr = %listener.local_addr()?, "serving products");
            axum::serve(listener, app).await?;
        }
        Some(("walkthrough", sub)) => {
            let collection = sub
                .get_one::<String>("collection")
                .map_or(REST_COLLECTION, String::as_str);
            let config = sub.get_one::<PathBuf>("config");
            let base_url = sub
                .get_one::<String>("server")
                .map_or("http://127.0.0.1:8000", String::as_str);

            let settings = settings::load(config.map(PathBuf::as_path), base_url)?;
            setup_logging(&settings);

            let objects = walkthrough::products(collection, &settings)?;
            let report = walkthrough::run(&objects).await?;
            println!("{report:#?}");
        }
        _ => unreachable!("subcommand_required"),
    }
    Ok(())
}
