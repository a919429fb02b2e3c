use std::sync::{Arc, Mutex};
use std::time::Duration;

use hp_protocol::mock::MockDevice;
use hp_protocol::{
    AttemptObserver, AttemptOutcome, AttemptRecord, ConnectionManager, ConnectionSettings,
    ErrorKind, ModbusClient, ProtocolError, Request, RetryExecutor, RetryPolicy,
};
use tokio::time::Instant;

#[derive(Default)]
struct RecordingObserver {
    records: Mutex<Vec<AttemptRecord>>,
}

impl AttemptObserver for RecordingObserver {
    fn on_attempt(&self, record: &AttemptRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

fn client(device: &MockDevice, observer: Arc<RecordingObserver>) -> ModbusClient {
    let connection = Arc::new(ConnectionManager::new(
        Arc::new(device.clone()),
        ConnectionSettings::default(),
    ));
    ModbusClient::new(
        connection,
        RetryExecutor::new(RetryPolicy::default()).with_observer(observer),
    )
}

#[tokio::test(start_paused = true)]
async fn fails_twice_then_succeeds_on_third_attempt() {
    let device = MockDevice::heat_pump();
    device.fail_next(ProtocolError::Timeout("no answer".into()));
    device.fail_next(ProtocolError::MalformedFrame("short".into()));
    let observer = Arc::new(RecordingObserver::default());
    let client = client(&device, observer.clone());

    let executed = client
        .read_words(domain::Region::HoldingRegister, 0, 10)
        .await
        .unwrap();

    assert_eq!(executed.attempts, 3);
    assert_eq!(executed.value[2], 400);
    let outcomes: Vec<_> = observer
        .records
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.outcome)
        .collect();
    assert_eq!(
        outcomes,
        vec![
            AttemptOutcome::Retrying,
            AttemptOutcome::Retrying,
            AttemptOutcome::Success
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_last_error_after_backoff() {
    let device = MockDevice::heat_pump();
    device.fail_always(Some(ProtocolError::Exception("SlaveDeviceBusy".into())));
    let observer = Arc::new(RecordingObserver::default());
    let client = client(&device, observer.clone());

    let started = Instant::now();
    let err = client.write_coil(0, true).await.unwrap_err();

    match err {
        ProtocolError::Exhausted {
            operation,
            attempts,
            last,
        } => {
            assert_eq!(operation, "write_single_coil");
            assert_eq!(attempts, 3);
            assert!(matches!(*last, ProtocolError::Exception(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(started.elapsed() >= Duration::from_secs(6));
    assert!(!device.coil(0));

    let records = observer.records.lock().unwrap();
    assert_eq!(records.len(), 3);
    assert!(records
        .iter()
        .all(|r| r.error_kind == Some(ErrorKind::DeviceException)));
    assert_eq!(records[2].outcome, AttemptOutcome::GaveUp);
}

#[tokio::test(start_paused = true)]
async fn foreign_response_counts_as_no_response() {
    let device = MockDevice::heat_pump();
    device.fail_next(ProtocolError::ForeignResponse("unit id 7".into()));
    let observer = Arc::new(RecordingObserver::default());
    let client = client(&device, observer.clone());

    let executed = client.transact(Request::ReadCoils { addr: 0, count: 1 }).await.unwrap();

    assert_eq!(executed.attempts, 2);
    assert_eq!(
        observer.records.lock().unwrap()[0].error_kind,
        Some(ErrorKind::Transient)
    );
}

#[tokio::test(start_paused = true)]
async fn fatal_errors_are_not_retried() {
    let executor = RetryExecutor::new(RetryPolicy::default());
    let calls = Arc::new(Mutex::new(0));

    let counter = calls.clone();
    let result: Result<_, ProtocolError> = executor
        .execute("validate", move || {
            let counter = counter.clone();
            async move {
                *counter.lock().unwrap() += 1;
                Err::<(), _>(ProtocolError::Validation("15.0 out of range".into()))
            }
        })
        .await;

    assert!(matches!(result, Err(ProtocolError::Validation(_))));
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn sub_second_backoff_is_honoured() {
    let device = MockDevice::heat_pump();
    device.fail_next_n(2, ProtocolError::Timeout("t".into()));
    let connection = Arc::new(ConnectionManager::new(
        Arc::new(device.clone()),
        ConnectionSettings {
            inter_request_delay: Duration::ZERO,
            ..ConnectionSettings::default()
        },
    ));
    let client = ModbusClient::new(
        connection,
        RetryExecutor::new(RetryPolicy {
            max_attempts: 3,
            backoff: vec![Duration::from_millis(100), Duration::from_millis(200)],
        }),
    );

    let started = Instant::now();
    let executed = client.transact(Request::ReadCoils { addr: 0, count: 1 }).await.unwrap();

    assert_eq!(executed.attempts, 3);
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(1));
}
