use std::{path::Path, process, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use twinsense::{
    config::{auth::AuthSettings, Config},
    core::{
        generator::Generator,
        runtime::{NoopPublisher, ReadingPublisher, SensorRuntime},
        signer::Signer,
    },
    logger::LoggerManager,
    print_error,
};
use twinsense_mqtt::{MqttHandle, MqttManager};

/// Env-style file with broker settings, looked up in the working directory.
const SENSOR_ENV_FILE: &str = "sensor.env";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::new().unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    });

    let mut logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    info!("Starting twinsense version {}...", env!("CARGO_PKG_VERSION"));
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });
    info!("Log level: {}", cfg.logger.level);
    info!(
        "Sensor '{}' declares metrics: {:?}",
        cfg.sensor.sensor_id,
        cfg.sensor.metric_names()
    );

    let auth = AuthSettings::load(Some(Path::new(SENSOR_ENV_FILE)));
    let mqtt_config = auth.merge_into(cfg.sensor.mqtt.clone());

    // A configured-but-empty key is a misconfiguration; a missing key is an
    // explicit opt-out of signing.
    let signer = match mqtt_config.as_ref().and_then(|m| m.hmac_key.as_deref()) {
        Some(key) => Some(Signer::new(key).unwrap_or_else(|e| {
            error!("Invalid signing key: {}", e);
            process::exit(1);
        })),
        None => {
            if mqtt_config.is_some() {
                warn!("No hmac_key configured — publishing unsigned payloads");
            }
            None
        }
    };

    let (publisher, mqtt_handle): (Arc<dyn ReadingPublisher>, Option<MqttHandle>) =
        match mqtt_config {
            Some(mc) => {
                info!("MQTT transport enabled ({}:{})", mc.host, mc.port);
                debug!("{:#?}", mc);

                let manager = MqttManager::from_config(mc).unwrap_or_else(|e| {
                    error!("Failed to create MqttManager: {}", e);
                    process::exit(1);
                });
                let handle = manager.build_and_start().await.unwrap_or_else(|e| {
                    error!("Failed to start MQTT session: {}", e);
                    process::exit(1);
                });

                info!("MQTT session started");
                (Arc::new(handle.publisher()), Some(handle))
            }
            None => {
                info!("MQTT disabled — readings go to the console only");
                (Arc::new(NoopPublisher), None)
            }
        };

    let cancel = CancellationToken::new();
    let runtime = SensorRuntime::new(
        Arc::new(cfg.sensor.clone()),
        Arc::new(Generator::from_entropy()),
        signer,
        publisher,
        cancel.clone(),
    );

    info!("Starting sensor runtime...");
    let runtime_task = tokio::spawn(runtime.run());

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C — initiating graceful shutdown...");

    cancel.cancel();
    if let Err(e) = tokio::time::timeout(Duration::from_secs(5), runtime_task).await {
        warn!("Sensor runtime did not stop in time: {}", e);
    }

    if let Some(handle) = &mqtt_handle {
        handle.shutdown();
        debug!("Cancellation token triggered — MQTT disconnecting...");
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    info!("Shutdown complete");
    Ok(())
}
