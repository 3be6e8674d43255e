use std::sync::Arc;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use tokio::{sync::watch, time::sleep};

use crate::{
    coordinator::Status,
    prelude::*,
    sensor::{Sensor, StateStore},
    task::Task,
};

/// Tariff windows are hour-aligned, hence the readings get re-evaluated at each hour start.
#[must_use]
pub fn next_top_of_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now) + TimeDelta::hours(1)
}

/// Publish the sensor's reading on every status update and at the top of every hour.
///
/// The hourly timer is re-armed after each publication.
/// Dropping the task cancels both.
pub fn spawn<S: StateStore + ?Sized + 'static>(
    sensor: Sensor,
    mut status: watch::Receiver<Status>,
    store: Arc<S>,
    clock: impl Fn() -> DateTime<Utc> + Send + 'static,
) -> Task {
    Task::spawn(async move {
        loop {
            let reading = sensor.read(&status.borrow_and_update(), clock());
            if let Err(error) = store.publish(&sensor, &reading).await {
                warn!(entity_id = %sensor.entity_id, "failed to publish: {error:#}");
            }
            let now = clock();
            let until_top_of_hour = (next_top_of_hour(now) - now).to_std().unwrap_or_default();
            tokio::select! {
                changed = status.changed() => {
                    if changed.is_err() {
                        debug!(entity_id = %sensor.entity_id, "the coordinator is gone");
                        break;
                    }
                }
                () = sleep(until_top_of_hour) => {
                    debug!(entity_id = %sensor.entity_id, "top of the hour");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::{
        sync::mpsc,
        time::{self, Instant},
    };

    use super::*;
    use crate::{
        core::{Entry, Snapshot, contract::tests::contract, tariff::tests::tariff},
        sensor::{Reading, SensorKind},
    };

    #[test]
    fn test_next_top_of_hour() -> Result {
        assert_eq!(
            next_top_of_hour("2024-01-01T11:30:15.123Z".parse()?),
            "2024-01-01T12:00:00Z".parse::<DateTime<Utc>>()?,
        );
        assert_eq!(
            next_top_of_hour("2024-01-01T11:00:00Z".parse()?),
            "2024-01-01T12:00:00Z".parse::<DateTime<Utc>>()?,
        );
        assert_eq!(
            next_top_of_hour("2024-12-31T23:59:59Z".parse()?),
            "2025-01-01T00:00:00Z".parse::<DateTime<Utc>>()?,
        );
        Ok(())
    }

    struct ChannelStore(mpsc::UnboundedSender<Reading>);

    #[async_trait]
    impl StateStore for ChannelStore {
        async fn publish(&self, _sensor: &Sensor, reading: &Reading) -> Result {
            self.0.send(*reading)?;
            Ok(())
        }
    }

    fn status() -> Result<Status> {
        Ok(Status {
            snapshot: Arc::new(Snapshot(vec![Entry::new(
                contract(1, "Dynamic"),
                vec![
                    tariff("2024-01-01T10:00:00Z", "2024-01-01T10:59:59Z", 0.25),
                    tariff("2024-01-01T11:00:00Z", "2024-01-01T11:59:59Z", 0.30),
                ],
                "2024-01-01T10:59:30Z".parse()?,
            )])),
            last_update_success: true,
        })
    }

    /// Wall clock driven by the Tokio clock, starting at the specified instant.
    fn tokio_clock(start: &str) -> Result<impl Fn() -> DateTime<Utc> + Send + 'static> {
        let start: DateTime<Utc> = start.parse()?;
        let started_at = Instant::now();
        Ok(move || start + TimeDelta::from_std(Instant::now() - started_at).unwrap_or_default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_on_update() -> Result {
        let (status_sender, status_receiver) = watch::channel(Status::default());
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let sensor = Sensor::new("entry", &contract(1, "Dynamic"), SensorKind::ElectricityTotal);
        let task = spawn(
            sensor,
            status_receiver,
            Arc::new(ChannelStore(sender)),
            tokio_clock("2024-01-01T10:30:00Z")?,
        );

        assert_eq!(receiver.recv().await, Some(Reading::UNAVAILABLE));

        let status = status()?;
        status_sender.send_modify(|current| *current = status);
        let reading = receiver.recv().await.context("the task has stopped")?;
        assert_eq!(reading.value, Some(0.25));

        drop(task);
        assert_eq!(receiver.recv().await, None);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_at_the_top_of_the_hour() -> Result {
        let (_status_sender, status_receiver) = watch::channel(status()?);
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let sensor = Sensor::new("entry", &contract(1, "Dynamic"), SensorKind::ElectricityTotal);
        let _task = spawn(
            sensor,
            status_receiver,
            Arc::new(ChannelStore(sender)),
            tokio_clock("2024-01-01T10:59:30Z")?,
        );

        let reading = receiver.recv().await.context("the task has stopped")?;
        assert_eq!(reading.value, Some(0.25));

        // No update from the coordinator, only the hourly timer fires.
        time::advance(Duration::from_secs(30)).await;
        let reading = receiver.recv().await.context("the task has stopped")?;
        assert_eq!(reading.value, Some(0.30));
        Ok(())
    }

    #[tokio::test]
    async fn test_stops_with_the_coordinator() -> Result {
        let (status_sender, status) = watch::channel(Status::default());
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let sensor = Sensor::new("entry", &contract(1, "Dynamic"), SensorKind::ElectricityTax);
        let _task = spawn(sensor, status, Arc::new(ChannelStore(sender)), Utc::now);
        assert_eq!(receiver.recv().await, Some(Reading::UNAVAILABLE));
        drop(status_sender);
        assert_eq!(receiver.recv().await, None);
        Ok(())
    }
}
