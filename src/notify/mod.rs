//! Alarm delivery and report rendering.
//!
//! - [`Notifier`]: sends a rendered report to one receiver (SMTP in
//!   production, recording fakes in tests)
//! - [`send_alarm`]: delivers a report on every channel of a danger level
//! - [`render_report`]: renders a [`RunReport`](crate::collector::RunReport) as HTML

mod command;
mod email;
mod report;

use async_trait::async_trait;

use crate::config::AlarmChannels;
use crate::error_handling::NotifyError;

pub use command::run_alarm_command;
pub use email::EmailNotifier;
pub use report::render_report;

/// Delivers an HTML report to a receiver.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, receiver: &str, html: &str) -> Result<(), NotifyError>;

    fn name(&self) -> &str;
}

/// Delivers `html` on every channel. Returns the number of successful deliveries.
///
/// A failing receiver or command is logged and doesn't stop the others.
pub async fn send_alarm(channels: &AlarmChannels, notifier: &dyn Notifier, html: &str) -> usize {
    let mut delivered = 0;

    for receiver in &channels.mail {
        match notifier.send(receiver, html).await {
            Ok(()) => {
                log::info!("Alarm sent to {} via {}", receiver, notifier.name());
                delivered += 1;
            }
            Err(e) => log::error!("Cannot send alarm to {}: {}", receiver, e),
        }
    }

    for command in &channels.execute {
        match run_alarm_command(command, html).await {
            Ok(()) => {
                log::info!("Alarm command {:?} succeeded", command);
                delivered += 1;
            }
            Err(e) => log::error!("{}", e),
        }
    }

    for target in &channels.slack {
        log::warn!("Slack alarms are not supported, skipping {}", target);
    }

    delivered
}
