pub mod amqp_client;

pub use amqp_client::AmqpBroker;
