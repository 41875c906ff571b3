//! floorplan-feed entry point.
//!
//! Subscribes to the backend's room feed and logs every room update and
//! connection state change until Ctrl-C or until the connection ends.

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use floorplan_feed::config::FeedConfig;
use floorplan_feed::domain::RoomFeedMessage;
use floorplan_feed::ws::FeedClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first: it decides the log format
    let config = FeedConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        api = %config.api_base_url,
        feed = %config.ws_base_url,
        "starting floorplan-feed"
    );

    let client: FeedClient<RoomFeedMessage> =
        FeedClient::with_options(config.ws_base_url.clone(), config.client_options());
    let mut states = client.subscribe_state();

    client.on_message(|msg: &RoomFeedMessage| {
        for room in msg.rooms() {
            tracing::info!(
                room = %room.name,
                status = %room.status,
                occupancy = room.occupancy,
                "room update"
            );
        }
    });

    client.connect()?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                break;
            }
            event = states.recv() => match event {
                Ok(event) if event.is_terminal() => {
                    tracing::warn!(state = %event.current, "feed connection ended");
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "state listener lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    client.close();
    Ok(())
}
