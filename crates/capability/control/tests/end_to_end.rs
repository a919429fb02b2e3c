use std::sync::Arc;
use std::time::Duration;

use domain::ConnectionState;
use hp_control::{ControlConfig, ModeController};
use hp_pipeline::{PollerConfig, PollingLoop};
use hp_protocol::mock::{MockDevice, MockEvent};
use hp_protocol::{ConnectionManager, ConnectionSettings, ModbusClient, RetryExecutor, RetryPolicy};
use hp_storage::status_channel;

#[tokio::test(start_paused = true)]
async fn power_on_round_trip_through_hardware() {
    let device = MockDevice::heat_pump();
    let connection = Arc::new(ConnectionManager::new(
        Arc::new(device.clone()),
        ConnectionSettings::default(),
    ));
    let client = ModbusClient::new(connection.clone(), RetryExecutor::new(RetryPolicy::default()));
    let (writer, store) = status_channel();
    let poller = PollingLoop::new(client.clone(), PollerConfig::default(), writer).unwrap();
    let controller = ModeController::new(client, store.clone(), ControlConfig::default()).unwrap();

    assert_eq!(connection.state(), ConnectionState::Disconnected);
    connection.connect().await.unwrap();
    assert!(connection.is_connected());

    poller.run_cycle().await.unwrap();
    assert!(!store.get_latest().unwrap().is_on);

    controller.set_power(true).await.unwrap();
    // 回显立即可见，原始快照仍为旧值
    assert!(store.get_latest().unwrap().is_on);
    assert!(!store.snapshot().unwrap().status.is_on);

    poller.run_cycle().await.unwrap();
    assert!(store.snapshot().unwrap().status.is_on);
    assert!(store.get_latest().unwrap().is_on);
}

#[tokio::test(start_paused = true)]
async fn writes_wait_for_running_poll_cycle() {
    let device = MockDevice::heat_pump();
    device.set_latency(Duration::from_millis(300));
    let connection = Arc::new(ConnectionManager::new(
        Arc::new(device.clone()),
        ConnectionSettings::default(),
    ));
    let client = ModbusClient::new(connection, RetryExecutor::new(RetryPolicy::default()));
    let (writer, store) = status_channel();
    let poller = PollingLoop::new(client.clone(), PollerConfig::default(), writer).unwrap();
    let controller = ModeController::new(client, store, ControlConfig::default()).unwrap();

    let cycle = {
        let poller = poller.clone();
        tokio::spawn(async move { poller.run_cycle().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    controller.set_target_temperature(45.0).await.unwrap();
    cycle.await.unwrap().unwrap();

    let log = device.transaction_log();
    assert_eq!(log.len(), 10);
    for pair in log.chunks(2) {
        assert!(
            matches!(pair, [MockEvent::Begin(a), MockEvent::End(b)] if a == b),
            "interleaved transactions: {pair:?}"
        );
    }
}
