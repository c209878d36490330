//! Queue a few motions against the in-process simulator and wait for them.
//!
//! Pass a serial port (e.g. `/dev/ttyUSB0`) as the first argument to talk to
//! real hardware instead.

use dobot_link::drivers::{DobotDriver, DobotDriverConfig};
use dobot_link::protocol::{params::ParamWriter, ProtocolId};
use dobot_link::DobotError;

#[tokio::main]
async fn main() -> Result<(), DobotError> {
    tracing_subscriber::fmt::init();

    let (driver, info) = match std::env::args().nth(1) {
        Some(port) => DobotDriver::connect(DobotDriverConfig::serial(port, 115_200)).await?,
        None => {
            // No port given: run against the simulator over a duplex pipe.
            let (host_side, sim_side) = tokio::io::duplex(1024);
            tokio::spawn(async move {
                let _ = sim::serve(sim_side, sim::SimConfig::default()).await;
            });
            let driver = DobotDriver::connect_with_stream(
                DobotDriverConfig::tcp("sim:0"),
                host_side,
            );
            let info = driver.handshake().await?;
            (driver, info)
        }
    };

    println!(
        "connected: {:?} firmware v{}, up {}s",
        info.firmware, info.version, info.device_time_secs
    );
    println!("device: {} ({})", driver.device_name().await?, driver.device_sn().await?);

    driver.set_cmd_timeout(1000).await;

    // Three point-to-point moves: mode byte plus x/y/z/r floats.
    let targets = [(200.0f32, 0.0f32, 50.0f32), (200.0, 60.0, 50.0), (200.0, -60.0, 50.0)];
    let mut last_index = 0;
    for (x, y, z) in targets {
        let params = ParamWriter::new()
            .put_u8(1) // MOVJ
            .put_f32(x)
            .put_f32(y)
            .put_f32(z)
            .put_f32(0.0)
            .into_params();
        last_index = driver.submit_queued(ProtocolId::PtpCmd, params).await?;
        println!("queued move to ({x}, {y}, {z}) as index {last_index}");
    }

    driver.start_exec().await?;
    driver.wait_for_index(last_index).await?;
    println!(
        "queue drained, motion finished: {}",
        driver.is_motion_finished().await?
    );

    driver.disconnect().await;
    Ok(())
}
