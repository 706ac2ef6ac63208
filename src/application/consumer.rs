//! The decorator-style `safe_message_consumer` wrapper (§4.C, §9): decodes a
//! delivery's JSON payload, and on any schema or processing failure decides
//! ack vs. nack-requeue vs. nack-no-requeue in one place so every consumer
//! loop applies the same poison-pill policy instead of repeating it.

use crate::domain::errors::ProcessingError;
use crate::infrastructure::observability::Metrics;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicNackOptions};
use tracing::warn;

/// What should happen to the delivery once a handler has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    NackRequeue,
    NackNoRequeue,
}

impl From<&ProcessingError> for Disposition {
    fn from(err: &ProcessingError) -> Self {
        if err.should_requeue() {
            Disposition::NackRequeue
        } else {
            Disposition::NackNoRequeue
        }
    }
}

/// Runs `handler` against `delivery`'s payload and acks/nacks according to
/// the outcome. `handler` receives the raw JSON bytes and returns the
/// disposition policy embedded in whatever `ProcessingError` it produces.
/// `queue` labels the processed/error/quarantine counters on `metrics`.
pub async fn safe_message_consumer<F, Fut>(
    delivery: &Delivery,
    queue: &str,
    metrics: &Metrics,
    handler: F,
) -> anyhow::Result<Disposition>
where
    F: FnOnce(Vec<u8>) -> Fut,
    Fut: std::future::Future<Output = Result<(), ProcessingError>>,
{
    let payload = delivery.data.clone();
    let disposition = match handler(payload).await {
        Ok(()) => Disposition::Ack,
        Err(err) => {
            warn!(error = %err, "message processing failed");
            Disposition::from(&err)
        }
    };

    metrics.messages_processed_total.with_label_values(&[queue]).inc();
    if disposition != Disposition::Ack {
        metrics.messages_errors_total.with_label_values(&[queue]).inc();
    }
    if disposition == Disposition::NackNoRequeue {
        metrics.quarantined_messages_total.with_label_values(&[queue]).inc();
    }

    apply(delivery, disposition).await?;
    Ok(disposition)
}

async fn apply(delivery: &Delivery, disposition: Disposition) -> anyhow::Result<()> {
    match disposition {
        Disposition::Ack => {
            delivery.ack(BasicAckOptions::default()).await?;
        }
        Disposition::NackRequeue => {
            delivery
                .nack(BasicNackOptions {
                    requeue: true,
                    ..Default::default()
                })
                .await?;
        }
        Disposition::NackNoRequeue => {
            delivery
                .nack(BasicNackOptions {
                    requeue: false,
                    ..Default::default()
                })
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{SchemaError, TransientCacheError, UnexpectedProcessingError};

    #[test]
    fn schema_error_does_not_requeue() {
        let err = ProcessingError::Schema(SchemaError::InvalidField {
            field: "x".to_string(),
            reason: "bad".to_string(),
        });
        assert_eq!(Disposition::from(&err), Disposition::NackNoRequeue);
    }

    #[test]
    fn unexpected_error_does_not_requeue() {
        let err = ProcessingError::Unexpected(UnexpectedProcessingError("boom".to_string()));
        assert_eq!(Disposition::from(&err), Disposition::NackNoRequeue);
    }

    #[test]
    fn cache_error_requeues() {
        let redis_err = redis::RedisError::from((redis::ErrorKind::IoError, "down"));
        let err = ProcessingError::Cache(TransientCacheError::Operation(redis_err));
        assert_eq!(Disposition::from(&err), Disposition::NackRequeue);
    }
}
