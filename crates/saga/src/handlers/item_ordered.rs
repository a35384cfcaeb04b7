use std::time::Duration;

use chrono::Utc;
use common::{DomainEvent, ItemOrdered};
use domain::{DomainError, PreparationError, PreparationOrder, PreparationRepository, Station};
use messaging::Publisher;
use tracing::{debug, info};

use crate::{Result, SagaError};

/// Prepares an ordered item at the barista or kitchen.
///
/// The worker is held for the whole preparation time, so the size of the
/// consumer's worker pool is the number of items a station works on at once.
/// The record is stored before the "ready" event is published; a failed
/// store publishes nothing.
pub struct ItemOrderedHandler<R, P> {
    station: Station,
    repository: R,
    publisher: P,
    made_by: String,
    time_scale: f64,
}

impl<R, P> ItemOrderedHandler<R, P>
where
    R: PreparationRepository,
    P: Publisher,
{
    /// Creates a handler that signs its work with the station name and
    /// takes the full preparation time.
    pub fn new(station: Station, repository: R, publisher: P) -> Self {
        Self {
            station,
            repository,
            publisher,
            made_by: station.name().to_string(),
            time_scale: 1.0,
        }
    }

    pub fn with_made_by(mut self, made_by: impl Into<String>) -> Self {
        self.made_by = made_by.into();
        self
    }

    /// Multiplies every preparation time. Negative or non-finite values are ignored.
    pub fn with_time_scale(mut self, scale: f64) -> Self {
        if scale.is_finite() && scale >= 0.0 {
            self.time_scale = scale;
        }
        self
    }

    pub fn station(&self) -> Station {
        self.station
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// How long this handler spends on one item.
    pub fn preparation_time(&self, ordered: &ItemOrdered) -> Duration {
        let base = self.station.preparation_time(ordered.item_type);
        Duration::try_from_secs_f64(base.as_secs_f64() * self.time_scale).unwrap_or(base)
    }

    #[tracing::instrument(skip(self, event), fields(station = %self.station, message_type = event.message_type(), line_item_id = %event.line_item_id()))]
    pub async fn handle(&self, event: &DomainEvent) -> Result<PreparationOrder> {
        let ordered = match (self.station, event) {
            (Station::Barista, DomainEvent::ItemOrderedForDrink(ordered))
            | (Station::Kitchen, DomainEvent::ItemOrderedForFood(ordered)) => ordered,
            (station, other) => {
                return Err(SagaError::UnexpectedEvent {
                    expected: match station {
                        Station::Barista => "a drink order",
                        Station::Kitchen => "a food order",
                    },
                    actual: other.message_type(),
                });
            }
        };

        // Refuse before taking up a worker for the preparation time.
        if !self.station.accepts(ordered.item_type) {
            return Err(DomainError::from(PreparationError::WrongStation {
                station: self.station,
                item_type: ordered.item_type,
            })
            .into());
        }

        let time_in = Utc::now();
        let delay = self.preparation_time(ordered);
        debug!(item_type = %ordered.item_type, delay = ?delay, "Preparing item");
        tokio::time::sleep(delay).await;
        let time_up = Utc::now();

        let (record, ready) =
            PreparationOrder::prepare(ordered, self.station, &self.made_by, time_in, time_up)
                .map_err(DomainError::from)?;

        self.repository
            .create(&record)
            .await
            .map_err(DomainError::from)?;

        self.publisher.publish_event(&ready).await?;

        let station = self.station.name();
        metrics::counter!("preparations_completed_total", "station" => station).increment(1);
        metrics::histogram!("preparation_duration_seconds", "station" => station)
            .record(delay.as_secs_f64());
        metrics::counter!("order_events_published_total", "message_type" => ready.message_type())
            .increment(1);
        info!(order_id = %record.order_id, item = %record.item_name, "Item ready");

        Ok(record)
    }
}
