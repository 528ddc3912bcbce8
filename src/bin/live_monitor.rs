//! Live Monitor
//!
//! Connects to the live-update endpoint and logs the dashboard for one
//! event: ticket sales, check-ins, analytics and the user's notifications.
//!
//! Usage: live_monitor [config.yaml]

use anyhow::{Context, Result};
use std::time::Duration;
use ticket_live::bin_common::{config_path_from_args, parse_args, ConfigType};
use ticket_live::livesockets::hooks::{AnalyticsSnapshot, Correlation, EventStats, NotificationFeed};
use ticket_live::livesockets::{
    AnalyticsHook, ClientEvent, EventStatsHook, LiveHook, NotificationFeedHook,
};
use ticket_live::logging::init_tracing;
use ticket_live::settings::LiveConfig;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const SUMMARY_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load config first (before logging is initialized)
    let config_path = config_path_from_args(&parse_args(), ConfigType::Live);
    let config = LiveConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    init_tracing(&config.log_level);
    print_banner(&config);

    let client = config.client_builder().build().await?;

    let event_hooks: Option<(EventStatsHook, AnalyticsHook)> =
        config.event_id.as_deref().map(|event_id| {
            let stats = LiveHook::attach_with_callback(
                client.registry(),
                Correlation::event(event_id),
                EventStats::with_window(config.recent_window),
                |stats: &EventStats, message| {
                    debug!(
                        "[{}] sold today={} revenue today={:.2} check-ins={} live={}",
                        message.kind(),
                        stats.tickets_sold_today,
                        stats.revenue_today,
                        stats.check_ins,
                        stats.live_attendees
                    );
                },
            );
            let analytics = LiveHook::attach(
                client.registry(),
                Correlation::event(event_id),
                AnalyticsSnapshot::with_window(config.recent_window),
            );
            (stats, analytics)
        });

    let feed: Option<NotificationFeedHook> = config.user_id.as_deref().map(|user_id| {
        LiveHook::attach(
            client.registry(),
            Correlation::user(user_id),
            NotificationFeed::with_window(config.recent_window),
        )
    });

    let mut toasts = client.inbox().presentations();
    let mut poll = tokio::time::interval(EVENT_POLL_INTERVAL);
    let mut summary = tokio::time::interval(SUMMARY_INTERVAL);
    summary.tick().await;

    let give_up_retry = config.give_up_retry();
    let retry = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(retry);
    let mut retry_pending = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down");
                break;
            }
            toast = toasts.recv() => match toast {
                Ok(record) => info!(
                    "🔔 [{:?}] {}: {} ({} unread)",
                    record.level,
                    record.title,
                    record.message,
                    client.unread_count()
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Skipped {} notification presentations", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            _ = poll.tick() => {
                while let Some(event) = client.try_recv_event() {
                    log_client_event(&event);
                    if let (ClientEvent::GaveUp { .. }, Some(delay)) = (&event, give_up_retry) {
                        info!("Retrying from scratch in {:?}", delay);
                        retry.as_mut().reset(tokio::time::Instant::now() + delay);
                        retry_pending = true;
                    }
                }
            }
            _ = &mut retry, if retry_pending => {
                retry_pending = false;
                if let Err(e) = client.reconnect() {
                    error!("Manual reconnect failed: {}", e);
                }
            }
            _ = summary.tick() => {
                if let Some((stats, analytics)) = &event_hooks {
                    log_summary(&stats.stats(), &analytics.snapshot());
                }
                if let Some(feed) = &feed {
                    let feed = feed.snapshot();
                    info!("Notifications: {} received, {} errors", feed.total, feed.errors);
                }
                let metrics = client.metrics();
                info!(
                    "Connection: {} | sent={} received={} decode errors={} reconnects={}",
                    metrics.connection_state,
                    metrics.messages_sent,
                    metrics.messages_received,
                    metrics.decode_errors,
                    metrics.reconnect_count
                );
            }
        }
    }

    client.shutdown().await?;
    print_shutdown();
    Ok(())
}

fn log_client_event(event: &ClientEvent) {
    match event {
        ClientEvent::Connecting { attempt } => info!("Connecting (attempt {})", attempt + 1),
        ClientEvent::Connected => info!("✅ Connected"),
        ClientEvent::Disconnected => info!("Disconnected"),
        ClientEvent::Reconnecting { attempt, delay } => {
            warn!("Reconnecting in {:?} (retry {})", delay, attempt)
        }
        ClientEvent::GaveUp { attempts } => {
            error!("❌ Gave up after {} attempts", attempts)
        }
        ClientEvent::Error(message) => error!("Connection error: {}", message),
    }
}

fn log_summary(stats: &EventStats, analytics: &AnalyticsSnapshot) {
    info!("========================================");
    info!(
        "Tickets today: {} ({:.2}) | total: {}",
        stats.tickets_sold_today, stats.revenue_today, stats.tickets_sold_total
    );
    info!(
        "Check-ins: {} | live attendees: {}",
        stats.check_ins, stats.live_attendees
    );
    for check_in in &stats.recent_check_ins {
        info!(
            "  {} {} at {}",
            check_in.attendee_name.as_deref().unwrap_or(&check_in.attendee_id),
            check_in.ticket_type.as_deref().unwrap_or("-"),
            check_in.at.format("%H:%M:%S")
        );
    }
    for (metric, value) in &analytics.metrics {
        info!("  {} = {} ({} updates)", metric, value.value, value.updates);
    }
    info!("========================================");
}

fn print_banner(config: &LiveConfig) {
    info!("");
    info!("========================================");
    info!("Starting Live Monitor");
    info!("Endpoint: {}", config.ws_url);
    info!("Event: {}", config.event_id.as_deref().unwrap_or("(none)"));
    info!("User: {}", config.user_id.as_deref().unwrap_or("(none)"));
    info!("Press Ctrl+C to stop");
    info!("========================================");
    info!("");
}

fn print_shutdown() {
    info!("");
    info!("========================================");
    info!("Live monitor stopped gracefully");
    info!("========================================");
}
