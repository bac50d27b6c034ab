// MQTT telemetry source backed by rumqttc
use crate::application::telemetry_source::{InboundPayload, TelemetrySource};
use crate::infrastructure::config::MqttSettings;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use tokio::time::{Duration, sleep};

/// Subscribes to a single topic and yields every publish on it.
///
/// The subscription is (re)issued on every ConnAck so a dropped connection
/// picks the topic back up once the event loop reconnects.
pub struct MqttSource {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
    broker: String,
    reconnect_delay: Duration,
}

impl MqttSource {
    pub fn new(settings: &MqttSettings) -> Self {
        let mut options = MqttOptions::new(
            settings.client_id.clone(),
            settings.host.clone(),
            settings.port,
        );
        options.set_keep_alive(settings.keep_alive());
        options.set_clean_session(true);

        let (client, eventloop) = AsyncClient::new(options, 32);

        Self {
            client,
            eventloop,
            topic: settings.topic.clone(),
            broker: format!("mqtt://{}:{}", settings.host, settings.port),
            reconnect_delay: settings.reconnect_delay(),
        }
    }
}

#[async_trait]
impl TelemetrySource for MqttSource {
    async fn next_payload(&mut self) -> anyhow::Result<Option<InboundPayload>> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                    tracing::info!(broker=%self.broker, code=?ack.code, "connected to broker");
                    // try_subscribe: awaiting the request channel here could stall the poll loop
                    match self.client.try_subscribe(self.topic.clone(), QoS::AtMostOnce) {
                        Ok(()) => tracing::info!(topic=%self.topic, "subscribed to telemetry feed"),
                        Err(err) => {
                            tracing::warn!(error=%err, topic=%self.topic, "failed to subscribe")
                        }
                    }
                }
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    return Ok(Some(InboundPayload::new(publish.topic, publish.payload)));
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error=%err, broker=%self.broker, "MQTT connection dropped; reconnecting");
                    sleep(self.reconnect_delay).await;
                }
            }
        }
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.broker, self.topic)
    }
}
