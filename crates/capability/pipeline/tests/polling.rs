use std::sync::Arc;
use std::time::Duration;

use domain::registers::{COIL_POWER, HOLDING_TARGET_TEMP};
use domain::{ConnectionState, KEEPALIVE_TIMEOUT, MAX_POLL_INTERVAL, ModeSetting};
use hp_pipeline::{PollerConfig, PollerError, PollingLoop};
use hp_protocol::mock::MockDevice;
use hp_protocol::{
    ConnectionManager, ConnectionSettings, ModbusClient, ProtocolError, RetryExecutor, RetryPolicy,
};
use hp_storage::status_channel;
use tokio::time::{Instant, sleep};

fn fast_client(device: &MockDevice) -> ModbusClient {
    let connection = Arc::new(ConnectionManager::new(
        Arc::new(device.clone()),
        ConnectionSettings {
            request_timeout: Duration::from_secs(5),
            inter_request_delay: Duration::from_millis(200),
            reconnect_delay: Duration::from_secs(2),
        },
    ));
    ModbusClient::new(
        connection,
        RetryExecutor::new(RetryPolicy {
            max_attempts: 3,
            backoff: vec![Duration::from_millis(100)],
        }),
    )
}

fn poller(device: &MockDevice, config: PollerConfig) -> PollingLoop {
    let (writer, _store) = status_channel();
    PollingLoop::new(fast_client(device), config, writer).unwrap()
}

#[tokio::test(start_paused = true)]
async fn cycle_publishes_decoded_snapshot() {
    let device = MockDevice::heat_pump();
    let poller = poller(&device, PollerConfig::default());

    let sequence = poller.run_cycle().await.unwrap();

    assert_eq!(sequence, 1);
    let status = poller.store().get_latest().unwrap();
    assert!(!status.is_on);
    assert_eq!(status.lg_mode, ModeSetting::Heat { target_temperature: 40.0 });
    assert_eq!(status.flow_temp, 38.5);
    assert_eq!(poller.connection_status().state, ConnectionState::Connected);
    assert!(poller.connection_status().last_success_at_ms.is_some());
}

#[tokio::test(start_paused = true)]
async fn reads_follow_fixed_region_order() {
    let device = MockDevice::heat_pump();
    let poller = poller(&device, PollerConfig::default());
    poller.run_cycle().await.unwrap();

    let names: Vec<_> = device
        .transaction_log()
        .into_iter()
        .filter_map(|event| match event {
            hp_protocol::mock::MockEvent::Begin(request) => Some(request.name()),
            hp_protocol::mock::MockEvent::End(_) => None,
        })
        .collect();
    assert_eq!(
        names,
        vec![
            "read_coils",
            "read_discrete_inputs",
            "read_input_registers",
            "read_holding_registers"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_cycle_keeps_last_good_snapshot() {
    let device = MockDevice::heat_pump();
    let poller = poller(&device, PollerConfig::default());
    poller.run_cycle().await.unwrap();

    device.set_holding(HOLDING_TARGET_TEMP, 450);
    device.fail_always(Some(ProtocolError::Timeout("no answer".into())));
    let err = poller.run_cycle().await.unwrap_err();

    assert!(matches!(err, PollerError::Modbus(ProtocolError::Exhausted { .. })));
    assert_eq!(poller.consecutive_failure_count(), 1);
    let status = poller.store().get_latest().unwrap();
    assert_eq!(status.target_temperature, 40.0);
}

#[tokio::test(start_paused = true)]
async fn reconnects_once_after_threshold_failed_cycles() {
    let device = MockDevice::heat_pump();
    let poller = poller(&device, PollerConfig::default());
    poller.run_cycle().await.unwrap();

    device.fail_always(Some(ProtocolError::ForeignResponse("unit 3".into())));
    for cycle in 1..=4 {
        assert!(poller.run_cycle().await.is_err());
        assert_eq!(poller.consecutive_failure_count(), cycle);
        assert_eq!(poller.reconnect_count(), 0);
    }

    assert!(poller.run_cycle().await.is_err());
    assert_eq!(poller.consecutive_failure_count(), 5);
    assert_eq!(poller.reconnect_count(), 1);

    // 第 6 个周期开始前恰好重连一次；恢复后计数清零
    device.fail_always(None);
    poller.run_cycle().await.unwrap();
    assert_eq!(poller.reconnect_count(), 1);
    assert_eq!(poller.consecutive_failure_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent_and_shutdown_closes_connection() {
    let device = MockDevice::heat_pump();
    let poller = poller(&device, PollerConfig::default());

    assert!(poller.start());
    assert!(!poller.start());
    assert!(poller.is_running());

    sleep(Duration::from_secs(1)).await;
    poller.shutdown().await;

    assert!(!poller.is_running());
    assert_eq!(device.connect_count(), 1);
    assert_eq!(device.close_count(), 1);
    assert!(poller.store().get_latest().is_some());
}

#[tokio::test(start_paused = true)]
async fn running_loop_keeps_device_alive() {
    let device = MockDevice::heat_pump();
    let poller = poller(&device, PollerConfig::default());
    poller.start();
    sleep(Duration::from_secs(1)).await;

    for _ in 0..24 {
        sleep(Duration::from_secs(5)).await;
        let age = poller.freshness().unwrap();
        assert!(age <= MAX_POLL_INTERVAL);
        assert!(age < KEEPALIVE_TIMEOUT);
    }

    poller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn running_loop_survives_outage_and_reconnects_at_threshold() {
    let device = MockDevice::heat_pump();
    let poller = poller(&device, PollerConfig::default());
    poller.start();
    sleep(Duration::from_secs(1)).await;
    assert_eq!(poller.consecutive_failure_count(), 0);

    device.fail_always(Some(ProtocolError::Timeout("no reply".into())));
    let outage_started = Instant::now();
    while poller.consecutive_failure_count() < 5 {
        assert_eq!(poller.reconnect_count(), 0);
        assert!(poller.is_running());
        assert!(outage_started.elapsed() < Duration::from_secs(120));
        sleep(Duration::from_secs(1)).await;
    }
    // 失败周期之间仍按 poll_interval 休眠
    assert!(outage_started.elapsed() >= 4 * PollerConfig::default().poll_interval);

    sleep(Duration::from_secs(3)).await;
    assert!(poller.is_running());
    assert_eq!(poller.reconnect_count(), 1);
    assert!(poller.store().get_latest().is_some());

    device.fail_always(None);
    sleep(MAX_POLL_INTERVAL).await;
    assert!(poller.is_running());
    assert_eq!(poller.consecutive_failure_count(), 0);
    assert_eq!(poller.reconnect_count(), 1);
    assert!(poller.freshness().unwrap() <= MAX_POLL_INTERVAL);

    poller.shutdown().await;
    assert!(!poller.is_running());
}

#[tokio::test(start_paused = true)]
async fn picks_up_hardware_changes_on_next_cycle() {
    let device = MockDevice::heat_pump();
    let poller = poller(&device, PollerConfig::default());
    poller.run_cycle().await.unwrap();
    assert!(!poller.store().get_latest().unwrap().is_on);

    device.set_coil(COIL_POWER, true);
    poller.run_cycle().await.unwrap();
    assert!(poller.store().get_latest().unwrap().is_on);
}

#[test]
fn rejects_interval_beyond_keepalive_bound() {
    let device = MockDevice::heat_pump();
    let (writer, _store) = status_channel();
    let result = PollingLoop::new(
        fast_client(&device),
        PollerConfig {
            poll_interval: Duration::from_secs(45),
            reconnect_threshold: 5,
        },
        writer,
    );
    assert!(matches!(result, Err(PollerError::InvalidConfig(_))));

    let (writer, _store) = status_channel();
    let result = PollingLoop::new(
        fast_client(&device),
        PollerConfig {
            poll_interval: Duration::from_secs(10),
            reconnect_threshold: 0,
        },
        writer,
    );
    assert!(matches!(result, Err(PollerError::InvalidConfig(_))));
}
