//! Queued-command tracking.
//!
//! A Write marked queued is not executed on arrival: the controller buffers
//! it and answers with a monotonically increasing 64-bit index. Execution
//! progress is a level-triggered polling contract; the device offers no push
//! notification, so waiting means re-reading the current executed index
//! until it reaches the index handed out at submission.

use std::time::Duration;

use crate::errors::DobotError;
use crate::protocol::{params::ParamReader, Message, ProtocolId};

use super::DobotDriver;

const QUEUE_FULL: &str = "device command queue reports no free slots";

impl DobotDriver {
    /// Buffers a Write command into the device execution queue and returns
    /// the index the device assigned to it.
    ///
    /// Submission is gated on the device's reported free-slot count: when
    /// the cached count is zero it is refreshed straight from the device,
    /// and a still-full queue rejects with `Busy` instead of letting the
    /// command vanish.
    pub async fn submit_queued(&self, id: ProtocolId, params: Vec<u8>) -> Result<u64, DobotError> {
        let cached = *self.queue_space.lock().await;
        if cached == 0 && self.left_space().await? == 0 {
            return Err(DobotError::Busy(QUEUE_FULL.to_string()));
        }
        let ack = self.call_and_wait(&Message::queued_write(id, params)).await?;
        let index = ParamReader::new(&ack.params).u64()?;
        let mut space = self.queue_space.lock().await;
        *space = space.saturating_sub(1);
        Ok(index)
    }

    /// Index of the queued command the device most recently executed.
    pub async fn current_index(&self) -> Result<u64, DobotError> {
        let ack = self
            .call_and_wait(&Message::read(ProtocolId::QueuedCmdCurrentIndex))
            .await?;
        ParamReader::new(&ack.params).u64()
    }

    /// Whether the motion queue has drained, for motion commands.
    pub async fn is_motion_finished(&self) -> Result<bool, DobotError> {
        let ack = self
            .call_and_wait(&Message::read(ProtocolId::QueuedCmdMotionFinish))
            .await?;
        ParamReader::new(&ack.params).bool()
    }

    /// Free queue slots on the device. The receive path caches every answer
    /// to this command, which is what `submit_queued` gates on.
    pub async fn left_space(&self) -> Result<u32, DobotError> {
        let ack = self
            .call_and_wait(&Message::read(ProtocolId::QueuedCmdLeftSpace))
            .await?;
        ParamReader::new(&ack.params).u32()
    }

    /// Polls until the device reports the queued command at `index` as
    /// executed (current index is at or past it, unsigned comparison).
    /// Each poll is bounded by the command timeout; the loop itself runs
    /// until the index is reached or an exchange fails.
    pub async fn wait_for_index(&self, index: u64) -> Result<(), DobotError> {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        loop {
            if self.current_index().await? >= index {
                return Ok(());
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Starts executing buffered commands in submission order.
    pub async fn start_exec(&self) -> Result<(), DobotError> {
        self.queue_control(ProtocolId::QueuedCmdStartExec).await
    }

    /// Pauses execution; buffered commands are kept.
    pub async fn stop_exec(&self) -> Result<(), DobotError> {
        self.queue_control(ProtocolId::QueuedCmdStopExec).await
    }

    /// Stops immediately, abandoning the command in progress.
    pub async fn force_stop_exec(&self) -> Result<(), DobotError> {
        self.queue_control(ProtocolId::QueuedCmdForceStopExec).await
    }

    /// Drops every buffered command. The free-slot cache is reset so the
    /// next queued submission re-reads it from the device.
    pub async fn clear_queue(&self) -> Result<(), DobotError> {
        self.queue_control(ProtocolId::QueuedCmdClear).await?;
        *self.queue_space.lock().await = 0;
        Ok(())
    }

    async fn queue_control(&self, id: ProtocolId) -> Result<(), DobotError> {
        self.call_and_wait(&Message::write(id, Vec::new())).await?;
        Ok(())
    }
}
