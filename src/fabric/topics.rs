//! Topic, queue and routing-key names shared across the pipeline.

/// MQTT topic carrying raw sensor readings into the detector.
pub const MQTT_SENSOR_TOPIC: &str = "events/sensor";

/// MQTT topic carrying damage events out of the detector.
pub const MQTT_DAMAGE_TOPIC: &str = "events/order-damage";

/// Direct, durable exchange all queue-broker traffic routes through.
pub const AMQP_EXCHANGE: &str = "events";

/// Queue delivering damage events to the order service.
pub const ORDER_DAMAGE_QUEUE: &str = "order-damage-queue";

/// Routing key binding [`ORDER_DAMAGE_QUEUE`] to the exchange.
pub const ORDER_DAMAGE_KEY: &str = "order.damage";

/// Queue receiving order lifecycle events from the order service.
pub const ORDER_EVENTS_QUEUE: &str = "order-events-queue";

/// Routing key binding [`ORDER_EVENTS_QUEUE`] to the exchange.
pub const ORDER_EVENTS_KEY: &str = "order.events";

/// Kafka topic mirroring damage events from the detector.
pub const KAFKA_DAMAGE_TOPIC: &str = "order-status-events";

/// Kafka topic carrying order lifecycle events into the batch service.
pub const KAFKA_ORDER_EVENTS_TOPIC: &str = "order-events";

/// Kafka topic carrying batch lifecycle events out of the batch service.
pub const KAFKA_BATCH_EVENTS_TOPIC: &str = "warehouse-batch-events";

/// Durable consumer group of the batch service.
pub const BATCH_CONSUMER_GROUP: &str = "warehouse-batch-service";
