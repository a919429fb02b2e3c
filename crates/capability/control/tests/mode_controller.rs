use std::sync::Arc;
use std::time::Duration;

use domain::registers::{
    COIL_POWER, HOLDING_AUTO_OFFSET, HOLDING_CONTROL_METHOD, HOLDING_ENERGY_STATE,
    HOLDING_OP_MODE, HOLDING_TARGET_TEMP,
};
use domain::{LgMode, ModeSetting};
use hp_control::{
    ControlConfig, ControlError, DeviceInit, ModeController, SetpointOutcome, SetpointProfile,
};
use hp_pipeline::{PollerConfig, PollingLoop};
use hp_protocol::mock::MockDevice;
use hp_protocol::{
    ConnectionManager, ConnectionSettings, ModbusClient, ProtocolError, Request, RetryExecutor,
    RetryPolicy,
};
use hp_storage::status_channel;

struct Harness {
    device: MockDevice,
    poller: PollingLoop,
    controller: ModeController,
}

fn harness(config: ControlConfig) -> Harness {
    let device = MockDevice::heat_pump();
    let connection = Arc::new(ConnectionManager::new(
        Arc::new(device.clone()),
        ConnectionSettings::default(),
    ));
    let client = ModbusClient::new(
        connection,
        RetryExecutor::new(RetryPolicy {
            max_attempts: 3,
            backoff: vec![Duration::from_millis(500)],
        }),
    );
    let (writer, store) = status_channel();
    let poller = PollingLoop::new(client.clone(), PollerConfig::default(), writer).unwrap();
    let controller = ModeController::new(client, store, config).unwrap();
    Harness {
        device,
        poller,
        controller,
    }
}

#[tokio::test(start_paused = true)]
async fn out_of_range_setpoint_never_touches_hardware() {
    let h = harness(ControlConfig::default());

    let err = h.controller.set_target_temperature(15.0).await.unwrap_err();

    assert!(matches!(err, ControlError::Validation(_)));
    assert_eq!(h.device.write_count(), 0);
    assert_eq!(h.device.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn manual_heating_profile_narrows_range() {
    let h = harness(ControlConfig {
        profile: SetpointProfile::ManualHeating,
        ..ControlConfig::default()
    });

    assert!(matches!(
        h.controller.set_target_temperature(55.0).await,
        Err(ControlError::Validation(_))
    ));
    assert_eq!(
        h.controller.set_target_temperature(45.0).await.unwrap(),
        SetpointOutcome::Applied
    );
    assert_eq!(h.device.holding(HOLDING_TARGET_TEMP), 450);
}

#[tokio::test(start_paused = true)]
async fn heat_mode_shows_default_setpoint_without_poll() {
    let h = harness(ControlConfig::default());
    h.device.set_holding(HOLDING_OP_MODE, 3);
    h.device.set_holding(HOLDING_TARGET_TEMP, 300);
    h.poller.run_cycle().await.unwrap();

    h.controller.set_lg_mode(LgMode::Heat).await.unwrap();

    let status = h.poller.store().get_latest().unwrap();
    assert_eq!(status.target_temperature, 40.0);
    assert_eq!(status.lg_mode, ModeSetting::Heat { target_temperature: 40.0 });
    assert_eq!(
        h.device.writes(),
        vec![
            Request::WriteSingleRegister { addr: HOLDING_OP_MODE, value: 4 },
            Request::WriteSingleRegister { addr: HOLDING_TARGET_TEMP, value: 400 },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn setpoint_in_auto_mode_is_written_but_inactive() {
    let h = harness(ControlConfig::default());
    h.device.set_holding(HOLDING_OP_MODE, 3);
    h.poller.run_cycle().await.unwrap();

    let outcome = h.controller.set_target_temperature(42.0).await.unwrap();

    assert_eq!(outcome, SetpointOutcome::Inactive);
    assert_eq!(h.device.holding(HOLDING_TARGET_TEMP), 420);
    let status = h.poller.store().get_latest().unwrap();
    assert_eq!(status.target_temperature, 42.0);
    assert!(!status.lg_mode.target_temperature_is_live());
}

#[tokio::test(start_paused = true)]
async fn negative_offset_is_twos_complement_encoded() {
    let h = harness(ControlConfig::default());

    h.controller.set_auto_mode_offset(-3).await.unwrap();
    assert_eq!(h.device.holding(HOLDING_AUTO_OFFSET), 65533);

    let err = h.controller.set_auto_mode_offset(6).await.unwrap_err();
    assert!(matches!(err, ControlError::Validation(_)));
    assert_eq!(h.device.write_count(), 1);

    h.device.set_holding(HOLDING_OP_MODE, 3);
    h.poller.run_cycle().await.unwrap();
    assert_eq!(
        h.poller.store().get_latest().unwrap().lg_mode,
        ModeSetting::Auto { offset_k: -3 }
    );
}

#[tokio::test(start_paused = true)]
async fn exhausted_write_returns_error() {
    let h = harness(ControlConfig::default());
    h.device.fail_always(Some(ProtocolError::Timeout("bus busy".into())));

    let err = h.controller.set_power(true).await.unwrap_err();

    match err {
        ControlError::Modbus(ProtocolError::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!h.device.coil(COIL_POWER));
}

#[tokio::test(start_paused = true)]
async fn device_init_sequence_is_opt_in() {
    let h = harness(ControlConfig::default());
    h.controller.set_power(true).await.unwrap();
    assert_eq!(
        h.device.writes(),
        vec![Request::WriteSingleCoil { addr: COIL_POWER, value: true }]
    );

    let h = harness(ControlConfig {
        device_init: Some(DeviceInit::default()),
        ..ControlConfig::default()
    });
    h.controller.set_power(true).await.unwrap();
    assert_eq!(
        h.device.writes(),
        vec![
            Request::WriteSingleRegister { addr: HOLDING_CONTROL_METHOD, value: 0 },
            Request::WriteSingleRegister { addr: HOLDING_OP_MODE, value: 4 },
            Request::WriteSingleRegister { addr: HOLDING_ENERGY_STATE, value: 5 },
            Request::WriteSingleCoil { addr: COIL_POWER, value: true },
        ]
    );

    // 关机不运行初始化序列
    h.controller.set_power(false).await.unwrap();
    assert_eq!(h.device.write_count(), 5);
}

#[test]
fn rejects_heat_default_outside_profile() {
    let device = MockDevice::heat_pump();
    let connection = Arc::new(ConnectionManager::new(
        Arc::new(device),
        ConnectionSettings::default(),
    ));
    let client = ModbusClient::new(connection, RetryExecutor::new(RetryPolicy::default()));
    let (_writer, store) = status_channel();

    let result = ModeController::new(
        client,
        store,
        ControlConfig {
            profile: SetpointProfile::ManualHeating,
            heat_default_temperature: 55.0,
            device_init: None,
        },
    );
    assert!(matches!(result, Err(ControlError::Validation(_))));
}
