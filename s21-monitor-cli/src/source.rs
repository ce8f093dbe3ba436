//! Message sources
//!
//! The monitor reads S21 traffic either live from the MQTT broker or from a
//! JSON-lines capture file.

use crate::config::MonitorConfig;
use anyhow::{Context, Result};
use rumqttc::{
    Client, Connection, ConnectReturnCode, Event, MqttOptions, Packet, QoS, RecvTimeoutError,
};
use serde::Deserialize;
use signal_hook::consts::{SIGINT, SIGTERM};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pause before polling again after a connection error
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// How long one poll waits before checking the shutdown flag again
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Raised by the interrupt handler; the live source stops once it is set
pub type ShutdownFlag = Arc<AtomicBool>;

/// Route SIGINT/SIGTERM into a flag instead of killing the process
pub fn install_shutdown_handler() -> Result<ShutdownFlag> {
    let flag = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&flag))
            .with_context(|| format!("Failed to register handler for signal {}", signal))?;
    }
    Ok(flag)
}

/// Something that happened on the bus
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// Connected (or reconnected) and subscribed
    Connected,
    /// A message on one of the subscribed topics
    Message { topic: String, payload: Vec<u8> },
    /// Connection lost; the source will retry on the next poll
    Disconnected(String),
}

/// A stream of bus events
pub trait MessageSource {
    /// Block until the next event; `None` once the source is exhausted
    fn next_event(&mut self) -> Option<SourceEvent>;
}

/// Live MQTT subscription to the TX and RX topics
pub struct MqttSource {
    client: Client,
    connection: Connection,
    topics: [String; 2],
    shutdown: ShutdownFlag,
}

impl MqttSource {
    pub fn connect(config: &MonitorConfig, shutdown: ShutdownFlag) -> Result<Self> {
        let mqtt = &config.mqtt;
        let topics = [config.tx_topic()?, config.rx_topic()?];

        let mut options = MqttOptions::new(mqtt.client_id.clone(), mqtt.host.clone(), mqtt.port);
        options.set_keep_alive(Duration::from_secs(mqtt.keep_alive_secs));
        options.set_credentials(
            mqtt.username.clone(),
            mqtt.password.clone().unwrap_or_default(),
        );

        log::info!("Connecting to MQTT broker {}:{}", mqtt.host, mqtt.port);
        let (client, connection) = Client::new(options, 10);

        Ok(Self {
            client,
            connection,
            topics,
            shutdown,
        })
    }

    fn subscribe(&mut self) -> Result<()> {
        for topic in &self.topics {
            self.client
                .subscribe(topic.as_str(), QoS::AtMostOnce)
                .with_context(|| format!("Failed to subscribe to {}", topic))?;
            log::info!("Subscribed to {}", topic);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        log::info!("Disconnecting from MQTT broker");
        if let Err(e) = self.client.disconnect() {
            log::warn!("MQTT disconnect failed: {}", e);
        }
    }
}

impl MessageSource for MqttSource {
    fn next_event(&mut self) -> Option<SourceEvent> {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                self.disconnect();
                return None;
            }

            let notification = match self.connection.recv_timeout(POLL_INTERVAL) {
                Ok(notification) => notification,
                Err(RecvTimeoutError::Timeout) => continue,
                // Event loop is gone, nothing more will arrive
                Err(RecvTimeoutError::Disconnected) => return None,
            };

            match notification {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        log::error!("Failed to connect to MQTT broker: {:?}", ack.code);
                        return Some(SourceEvent::Disconnected(format!("{:?}", ack.code)));
                    }
                    if let Err(e) = self.subscribe() {
                        log::error!("{:#}", e);
                        return Some(SourceEvent::Disconnected(e.to_string()));
                    }
                    return Some(SourceEvent::Connected);
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Some(SourceEvent::Message {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    });
                }
                Ok(other) => log::trace!("MQTT event: {:?}", other),
                Err(e) => {
                    log::warn!("MQTT connection error: {}", e);
                    thread::sleep(RECONNECT_DELAY);
                    return Some(SourceEvent::Disconnected(e.to_string()));
                }
            }
        }
    }
}

/// One captured message in a replay file
#[derive(Debug, Deserialize)]
struct ReplayLine {
    topic: String,
    payload: String,
}

/// Replays captured traffic from a JSON-lines file
///
/// Each line is `{"topic": "info/<device>/rx", "payload": "<S21 JSON>"}`.
pub struct ReplaySource<R> {
    lines: Lines<R>,
    line_no: usize,
    started: bool,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open replay file: {:?}", path))?;
        log::info!("Replaying messages from {:?}", path);
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            started: false,
        }
    }
}

impl<R: BufRead> MessageSource for ReplaySource<R> {
    fn next_event(&mut self) -> Option<SourceEvent> {
        if !self.started {
            self.started = true;
            return Some(SourceEvent::Connected);
        }

        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    log::error!("Failed to read replay file: {}", e);
                    return None;
                }
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<ReplayLine>(&line) {
                Ok(entry) => {
                    return Some(SourceEvent::Message {
                        topic: entry.topic,
                        payload: entry.payload.into_bytes(),
                    })
                }
                Err(e) => log::warn!("Skipping replay line {}: {}", self.line_no, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_replay_source() {
        let data = concat!(
            r#"{"topic":"info/unit/tx","payload":"{\"protocol\":\"S21\",\"F1\":\"0\"}"}"#,
            "\n",
            "\n",
            "garbage\n",
            r#"{"topic":"info/unit/rx","payload":"{}"}"#,
            "\n",
        );
        let mut source = ReplaySource::new(Cursor::new(data));

        assert_eq!(source.next_event(), Some(SourceEvent::Connected));
        match source.next_event() {
            Some(SourceEvent::Message { topic, payload }) => {
                assert_eq!(topic, "info/unit/tx");
                assert_eq!(payload, br#"{"protocol":"S21","F1":"0"}"#.to_vec());
            }
            other => panic!("unexpected event: {:?}", other),
        }
        // Blank and malformed lines are skipped
        match source.next_event() {
            Some(SourceEvent::Message { topic, .. }) => assert_eq!(topic, "info/unit/rx"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(source.next_event(), None);
    }

    #[test]
    fn test_replay_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"topic":"info/unit/rx","payload":"{{}}"}}"#).unwrap();

        let mut source = ReplaySource::open(file.path()).unwrap();
        assert_eq!(source.next_event(), Some(SourceEvent::Connected));
        assert!(matches!(source.next_event(), Some(SourceEvent::Message { .. })));
        assert_eq!(source.next_event(), None);
    }

    #[test]
    fn test_mqtt_source_stops_on_shutdown() {
        let mut config = MonitorConfig::default();
        config.device_id = Some("unit".to_string());
        let shutdown: ShutdownFlag = Arc::new(AtomicBool::new(true));

        // The event loop only connects when polled, so no broker is needed
        let mut source = MqttSource::connect(&config, shutdown).unwrap();
        assert_eq!(source.next_event(), None);
    }

    #[test]
    fn test_mqtt_source_requires_device() {
        let shutdown: ShutdownFlag = Arc::new(AtomicBool::new(false));
        assert!(MqttSource::connect(&MonitorConfig::default(), shutdown).is_err());
    }

    #[test]
    fn test_replay_missing_file() {
        assert!(ReplaySource::open(Path::new("/nonexistent/capture.jsonl")).is_err());
    }
}
