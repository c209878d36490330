//! End-to-end: real driver against the simulator over a local TCP socket.

use tokio::net::TcpListener;

use dobot_link::drivers::{DobotDriver, DobotDriverConfig};
use dobot_link::{DobotError, FirmwareKind};
use sim::{serve, SimConfig};

async fn spawn_sim(config: SimConfig) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr").to_string();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let _ = serve(stream, config).await;
    });
    addr
}

async fn connect(config: SimConfig) -> (DobotDriver, dobot_link::ConnectInfo) {
    let addr = spawn_sim(config).await;
    DobotDriver::connect(DobotDriverConfig::tcp(addr))
        .await
        .expect("connect and handshake")
}

#[tokio::test]
async fn handshake_reports_firmware_and_version() {
    let (driver, info) = connect(SimConfig::default()).await;
    assert_eq!(info.firmware, FirmwareKind::Dobot);
    assert_eq!(info.version.major, 3);
    assert_eq!(info.version.minor, 2);
    assert_eq!(info.version.revision, 1);

    assert_eq!(driver.device_sn().await.expect("sn"), "SIM0001");
    driver.disconnect().await;
}

#[tokio::test]
async fn queued_commands_execute_after_start() {
    let (driver, _) = connect(SimConfig::default()).await;

    let mut indices = Vec::new();
    for _ in 0..3 {
        let index = driver
            .submit_queued(dobot_link::protocol::ProtocolId::PtpCmd, vec![0; 17])
            .await
            .expect("queued submission");
        indices.push(index);
    }
    assert!(indices.windows(2).all(|w| w[0] < w[1]), "indices: {:?}", indices);

    // Nothing executes until start; immediate traffic is unaffected.
    assert_eq!(driver.current_index().await.expect("current index"), 0);
    assert!(!driver.is_motion_finished().await.expect("motion finish"));
    assert_eq!(driver.device_name().await.expect("name"), "dobot-sim");

    driver.start_exec().await.expect("start exec");
    driver
        .wait_for_index(*indices.last().expect("at least one index"))
        .await
        .expect("queued command executes");
    assert!(driver.is_motion_finished().await.expect("motion finish"));

    driver.stop_exec().await.expect("stop exec");
    driver.disconnect().await;
}

#[tokio::test]
async fn current_index_never_decreases_across_polls() {
    let (driver, _) = connect(SimConfig::default()).await;

    for _ in 0..4 {
        driver
            .submit_queued(dobot_link::protocol::ProtocolId::PtpCmd, vec![0; 17])
            .await
            .expect("queued submission");
    }
    driver.start_exec().await.expect("start exec");

    let mut prev = 0;
    for _ in 0..8 {
        let index = driver.current_index().await.expect("current index");
        assert!(index >= prev, "index went backwards: {} -> {}", prev, index);
        prev = index;
    }
    // Drained: the index holds at the last queued command.
    assert_eq!(prev, 4);
    driver.disconnect().await;
}

#[tokio::test]
async fn device_queue_capacity_is_enforced() {
    let (driver, _) = connect(SimConfig {
        queue_capacity: 2,
        ..SimConfig::default()
    })
    .await;

    assert_eq!(driver.left_space().await.expect("left space"), 2);
    for _ in 0..2 {
        driver
            .submit_queued(dobot_link::protocol::ProtocolId::WaitCmd, vec![100, 0, 0, 0])
            .await
            .expect("queued submission within capacity");
    }
    let overflow = driver
        .submit_queued(dobot_link::protocol::ProtocolId::WaitCmd, vec![100, 0, 0, 0])
        .await;
    assert!(matches!(overflow, Err(DobotError::Busy(_))));

    // Clearing the buffer frees the slots again.
    driver.clear_queue().await.expect("clear");
    driver
        .submit_queued(dobot_link::protocol::ProtocolId::WaitCmd, vec![100, 0, 0, 0])
        .await
        .expect("queued submission after clear");
    driver.disconnect().await;
}

#[tokio::test]
async fn identity_and_wifi_round_trip() {
    let (driver, _) = connect(SimConfig::default()).await;

    driver.set_device_name("cell-3 arm").await.expect("set name");
    assert_eq!(driver.device_name().await.expect("name"), "cell-3 arm");

    driver.set_wifi_ssid("lab-wlan").await.expect("set ssid");
    driver.set_wifi_password("hunter2").await.expect("set password");
    assert_eq!(driver.wifi_ssid().await.expect("ssid"), "lab-wlan");
    assert_eq!(driver.wifi_password().await.expect("password"), "hunter2");

    assert!(driver.set_wifi_ssid("").await.is_err());

    assert_eq!(
        driver.firmware_mode().await.expect("mode"),
        FirmwareKind::Dobot
    );
    driver.disconnect().await;
}

#[tokio::test]
async fn force_stop_halts_execution() {
    let (driver, _) = connect(SimConfig::default()).await;

    let mut last = 0;
    for _ in 0..5 {
        last = driver
            .submit_queued(dobot_link::protocol::ProtocolId::PtpCmd, vec![0; 17])
            .await
            .expect("queued submission");
    }
    driver.start_exec().await.expect("start");
    let first = driver.current_index().await.expect("current index");
    driver.force_stop_exec().await.expect("force stop");
    let halted = driver.current_index().await.expect("current index");
    // One poll may still have advanced before the stop landed.
    assert!(halted <= first + 1);
    assert!(halted < last);
    driver.disconnect().await;
}
