use std::sync::Arc;
use std::time::Duration;

use domain::Region;
use hp_protocol::mock::{MockDevice, MockEvent};
use hp_protocol::{ConnectionManager, ConnectionSettings, ModbusClient, RetryExecutor, RetryPolicy};

#[tokio::test(start_paused = true)]
async fn concurrent_reads_and_writes_never_interleave() {
    let device = MockDevice::heat_pump();
    device.set_latency(Duration::from_millis(50));
    let connection = Arc::new(ConnectionManager::new(
        Arc::new(device.clone()),
        ConnectionSettings::default(),
    ));
    let client = ModbusClient::new(connection, RetryExecutor::new(RetryPolicy::default()));

    let reader = {
        let client = client.clone();
        tokio::spawn(async move {
            for region in Region::POLL_ORDER {
                if region.is_bit() {
                    client.read_bits(region, 0, 14).await.unwrap();
                } else {
                    client.read_words(region, 0, 14).await.unwrap();
                }
            }
        })
    };
    let writer = {
        let client = client.clone();
        tokio::spawn(async move {
            client.write_coil(0, true).await.unwrap();
            client.write_register(2, 450).await.unwrap();
        })
    };
    reader.await.unwrap();
    writer.await.unwrap();

    let log = device.transaction_log();
    assert_eq!(log.len(), 12);
    for pair in log.chunks(2) {
        match pair {
            [MockEvent::Begin(begin), MockEvent::End(end)] => assert_eq!(begin, end),
            other => panic!("interleaved transactions: {other:?}"),
        }
    }
    assert_eq!(device.write_count(), 2);
    assert!(device.coil(0));
    assert_eq!(device.holding(2), 450);
}
