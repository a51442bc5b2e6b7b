//! Beacon - headless emergency client.
//!
//! Runs the offline SOS delivery pipeline and the alert watcher against a
//! Beacon backend. UI front-ends talk to the same engines through
//! `beacon-sync`; this binary is the reference wiring plus a one-shot
//! `send` command.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use beacon_api::{ApiClient, KeyringTokenStore, StaticToken, TokenProvider};
use beacon_core::{
    AlertCacheRepository, Coordinates, SosPayload, SosQueue, SosQueueRepository,
};
use beacon_sync::{
    AlertRefreshEngine, DeliveryEngine, DesktopNotifier, NetworkMonitor, SweepOutcome, SyncDriver,
};

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon=info,beacon_sync=info,beacon_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        None | Some("run") => run(&config).await,
        Some("send") => send(&config, &args[1..]).await,
        Some(other) => bail!("unknown command `{other}`; expected `run` or `send`"),
    }
}

struct Engines {
    delivery: Arc<DeliveryEngine>,
    alerts: Arc<AlertRefreshEngine>,
}

async fn build(config: &Config) -> anyhow::Result<Engines> {
    let tokens: Arc<dyn TokenProvider> = match &config.token {
        Some(token) => Arc::new(StaticToken::new(token.as_str())),
        None => Arc::new(KeyringTokenStore),
    };
    let client = ApiClient::new(config.api_url.as_str(), tokens)?;

    let database_path = config.database_path_str()?;
    let queue = SosQueue::open(SosQueueRepository::new(database_path).await?).await;
    let delivery = Arc::new(DeliveryEngine::new(queue, client.clone()));

    let cache = AlertCacheRepository::new(database_path).await?;
    let alerts = AlertRefreshEngine::new(client, cache, Arc::new(DesktopNotifier));

    Ok(Engines { delivery, alerts })
}

async fn run(config: &Config) -> anyhow::Result<()> {
    info!("starting beacon against {}", config.api_url);

    let engines = build(config).await?;
    let monitor = Arc::new(NetworkMonitor::assume_online());

    let driver = SyncDriver::new(
        Arc::clone(&engines.delivery),
        Arc::clone(&engines.alerts),
        monitor.subscribe(),
    )
    .spawn();
    let probe = spawn_reachability_probe(Arc::clone(&monitor), config.api_url.clone());

    engines.alerts.init().await;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");
    probe.abort();
    driver.shutdown();
    Ok(())
}

async fn send(config: &Config, args: &[String]) -> anyhow::Result<()> {
    let payload = parse_send_args(args)?;

    let engines = build(config).await?;
    let item = engines.delivery.submit(payload).await?;
    println!("queued SOS {}", item.local_id);

    match engines.delivery.sweep().await {
        SweepOutcome::Completed { sent, .. } if sent > 0 => {
            let history = engines.delivery.history().await;
            match history.iter().find(|h| h.local_id == item.local_id) {
                Some(sent) => println!("delivered as {}", sent.server_id),
                None => println!("delivered"),
            }
        }
        SweepOutcome::AbortedUnauthorized { .. } => {
            println!("not authorized; queued, will send after sign-in");
        }
        _ => println!("queued, will send when online"),
    }

    Ok(())
}

fn parse_send_args(args: &[String]) -> anyhow::Result<SosPayload> {
    let mut message = None;
    let mut latitude = None;
    let mut longitude = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--lat" => {
                latitude = Some(
                    iter.next()
                        .context("--lat needs a value")?
                        .parse::<f64>()
                        .context("--lat is not a number")?,
                );
            }
            "--lon" => {
                longitude = Some(
                    iter.next()
                        .context("--lon needs a value")?
                        .parse::<f64>()
                        .context("--lon is not a number")?,
                );
            }
            text if message.is_none() && !text.starts_with("--") => {
                message = Some(text.to_string());
            }
            other => bail!("unexpected argument `{other}`"),
        }
    }

    let coordinates = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinates {
            latitude,
            longitude,
        }),
        (None, None) => None,
        _ => bail!("--lat and --lon must be given together"),
    };

    Ok(SosPayload {
        message,
        coordinates,
        attachments: Vec::new(),
    })
}

/// Feeds the network monitor by probing the backend.
///
/// Any HTTP answer counts as reachable; only transport-level failures flip
/// the state to offline.
fn spawn_reachability_probe(monitor: Arc<NetworkMonitor>, base_url: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                warn!("reachability probe disabled: {e}");
                return;
            }
        };

        let mut ticker = tokio::time::interval(Duration::from_secs(15));
        loop {
            ticker.tick().await;
            let online = client.head(&base_url).send().await.is_ok();
            monitor.set_online(online);
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_message_and_coordinates() {
        let payload =
            parse_send_args(&args(&["trapped", "--lat", "12.9", "--lon", "77.6"])).unwrap();
        assert_eq!(payload.message.as_deref(), Some("trapped"));
        let coords = payload.coordinates.unwrap();
        assert!((coords.latitude - 12.9).abs() < f64::EPSILON);
        assert!((coords.longitude - 77.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_bare_send() {
        let payload = parse_send_args(&[]).unwrap();
        assert!(payload.message.is_none());
        assert!(payload.coordinates.is_none());
    }

    #[test]
    fn test_lat_without_lon_is_rejected() {
        assert!(parse_send_args(&args(&["--lat", "12.9"])).is_err());
    }
}
