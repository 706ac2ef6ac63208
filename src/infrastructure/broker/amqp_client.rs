//! AMQP 0-9-1 broker client backed by `lapin`. Reconnects on demand with a
//! bounded linear backoff (not exponential — the prior implementation's
//! `rabbitmq_client.py` retries 5 times at a flat 5s delay).

use crate::config::BrokerConfig;
use crate::domain::errors::TransientBrokerError;
use crate::domain::ports::{MessageBroker, QueueArgs};
use crate::infrastructure::observability::Metrics;
use async_trait::async_trait;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub struct AmqpBroker {
    uri: String,
    max_retries: u32,
    retry_delay_secs: u64,
    conn: RwLock<Option<Connection>>,
    metrics: Arc<Metrics>,
}

impl AmqpBroker {
    pub fn new(config: &BrokerConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            uri: config.amqp_uri(),
            max_retries: config.max_retries,
            retry_delay_secs: config.retry_delay_secs,
            conn: RwLock::new(None),
            metrics,
        }
    }

    async fn connect_with_retry(&self) -> Result<Connection, TransientBrokerError> {
        let mut last_err = None;
        for attempt in 1..=self.max_retries {
            match Connection::connect(&self.uri, ConnectionProperties::default()).await {
                Ok(conn) => {
                    info!(attempt, "connected to broker");
                    self.metrics.broker_reconnects_total.inc();
                    return Ok(conn);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "broker connection attempt failed");
                    last_err = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(std::time::Duration::from_secs(self.retry_delay_secs)).await;
                    }
                }
            }
        }
        Err(TransientBrokerError::ConnectFailed {
            attempts: self.max_retries,
            source: last_err.expect("at least one attempt recorded"),
        })
    }

    async fn channel(&self) -> Result<Channel, TransientBrokerError> {
        {
            let guard = self.conn.read().await;
            if let Some(conn) = guard.as_ref() {
                if conn.status().connected() {
                    return Ok(conn.create_channel().await?);
                }
            }
        }
        self.ensure_connection().await?;
        let guard = self.conn.read().await;
        let conn = guard.as_ref().expect("ensure_connection populated the slot");
        Ok(conn.create_channel().await?)
    }
}

#[async_trait]
impl MessageBroker for AmqpBroker {
    async fn ensure_connection(&self) -> Result<(), TransientBrokerError> {
        let needs_reconnect = {
            let guard = self.conn.read().await;
            !matches!(guard.as_ref(), Some(c) if c.status().connected())
        };
        if needs_reconnect {
            let conn = self.connect_with_retry().await?;
            *self.conn.write().await = Some(conn);
        }
        Ok(())
    }

    async fn declare_queue(
        &self,
        queue: &str,
        durable: bool,
        args: QueueArgs,
    ) -> Result<(), TransientBrokerError> {
        let channel = self.channel().await?;
        let mut field_table = FieldTable::default();
        if let Some(max_length) = args.max_length {
            field_table.insert("x-max-length".into(), lapin::types::AMQPValue::LongLongInt(max_length));
            field_table.insert("x-overflow".into(), lapin::types::AMQPValue::LongString("drop-head".into()));
        }
        if let Some(ttl_ms) = args.message_ttl_ms {
            field_table.insert("x-message-ttl".into(), lapin::types::AMQPValue::LongLongInt(ttl_ms));
        }
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable,
                    ..Default::default()
                },
                field_table,
            )
            .await?;
        Ok(())
    }

    async fn publish(
        &self,
        queue: &str,
        payload: &serde_json::Value,
        persistent: bool,
    ) -> Result<(), TransientBrokerError> {
        let channel = self.channel().await?;
        let bytes = serde_json::to_vec(payload).expect("Value always serializes");
        let props = if persistent {
            BasicProperties::default().with_delivery_mode(2)
        } else {
            BasicProperties::default()
        };
        channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &bytes,
                props,
            )
            .await?
            .await?;
        Ok(())
    }

    async fn queue_depth(&self, queue: &str) -> Result<u32, TransientBrokerError> {
        let channel = self.channel().await?;
        let declared = channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    passive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(declared.message_count())
    }
}

impl AmqpBroker {
    /// Opens a consumer on `queue` with manual ack. Callers decide ack,
    /// nack-requeue, or nack-no-requeue per message based on
    /// `ProcessingError::should_requeue`.
    pub async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        prefetch_count: u16,
    ) -> Result<lapin::Consumer, TransientBrokerError> {
        let channel = self.channel().await?;
        channel
            .basic_qos(prefetch_count, lapin::options::BasicQosOptions::default())
            .await?;
        let consumer = channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        Ok(consumer)
    }

    pub async fn ack(&self, delivery: &lapin::message::Delivery) -> Result<(), TransientBrokerError> {
        delivery.ack(BasicAckOptions::default()).await?;
        Ok(())
    }

    /// Nacks a message. `requeue = false` quarantines a poison pill.
    pub async fn nack(
        &self,
        delivery: &lapin::message::Delivery,
        requeue: bool,
    ) -> Result<(), TransientBrokerError> {
        delivery
            .nack(BasicNackOptions {
                requeue,
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}
