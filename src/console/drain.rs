//! Drain side of the console: the single consumer that owns the link.

use embedded_hal_async::delay::DelayNs;

use super::Console;
use crate::config::{CHUNK_PACING_MS, MSG_MAX_SIZE, NOTIFY_CHUNK_SIZE};

/// The physical "send one chunk" primitive.
///
/// Implementations should fail fast when the connection is gone rather than
/// wait for it to come back.
#[allow(async_fn_in_trait)]
pub trait NotifyLink {
    /// Handle identifying the active connection.
    type Conn;
    type Error;

    /// Send one chunk of at most `NOTIFY_CHUNK_SIZE` bytes.
    async fn notify(&mut self, conn: &Self::Conn, chunk: &[u8]) -> Result<(), Self::Error>;
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DrainReport {
    /// Messages whose every chunk was sent.
    pub delivered: usize,
    /// Messages abandoned after a send failure.
    pub failed: usize,
    /// Notifications issued, including those of failed messages.
    pub chunks: usize,
    /// Bytes thrown away because the link was gone or the stream was corrupt.
    pub discarded_bytes: usize,
    /// The pass stopped on a framing error.
    pub desynced: bool,
}

impl<C: Clone, const CAP: usize> Console<C, CAP> {
    /// Drain worker main loop. Never returns.
    ///
    /// Sleeps until a producer or a new connection wakes it. Wakes while no
    /// link is up leave the queue alone so early output survives until the
    /// first connection.
    pub async fn run<L, D>(&self, link: &mut L, delay: &mut D) -> !
    where
        L: NotifyLink<Conn = C>,
        D: DelayNs,
    {
        info!("console drain loop started");
        loop {
            self.wake.wait().await;
            if !self.is_connected() {
                trace!("console: wake without link, deferring");
                continue;
            }

            let report = self.drain(link, delay).await;
            if report.failed > 0 || report.desynced {
                warn!(
                    "console: drained {} messages, {} failed, {} bytes discarded",
                    report.delivered,
                    report.failed,
                    report.discarded_bytes
                );
            }
        }
    }

    /// Send everything currently queued, one message at a time.
    pub async fn drain<L, D>(&self, link: &mut L, delay: &mut D) -> DrainReport
    where
        L: NotifyLink<Conn = C>,
        D: DelayNs,
    {
        let mut report = DrainReport::default();
        let mut message = [0u8; MSG_MAX_SIZE];

        loop {
            let Some(conn) = self.connection() else {
                let discarded = self.discard_all();
                if discarded > 0 {
                    debug!("console: no link, dropped {} queued bytes", discarded);
                }
                report.discarded_bytes += discarded;
                break;
            };

            let len = match self
                .queue
                .lock(|q| q.borrow_mut().pop_record(&mut message))
            {
                None => break,
                Some(Ok(len)) => len,
                Some(Err(e)) => {
                    error!("console: ring buffer desynchronized ({}), discarding", e);
                    report.discarded_bytes += self.discard_all();
                    report.desynced = true;
                    break;
                }
            };

            match send_chunked(link, &conn, &message[..len], delay).await {
                Ok(chunks) => {
                    report.delivered += 1;
                    report.chunks += chunks;
                }
                Err(chunks) => {
                    warn!(
                        "console: notify failed after {} chunks, dropping {} byte message",
                        chunks,
                        len
                    );
                    report.failed += 1;
                    report.chunks += chunks;
                }
            }
        }

        report
    }

    fn discard_all(&self) -> usize {
        self.queue.lock(|q| {
            let mut q = q.borrow_mut();
            let used = q.used();
            q.reset();
            used
        })
    }
}

/// Send `payload` in order as link-sized chunks, pausing after each one.
///
/// Returns the number of chunks sent, as `Err` if a send failed and the
/// rest of the message was abandoned.
async fn send_chunked<L, D>(
    link: &mut L,
    conn: &L::Conn,
    payload: &[u8],
    delay: &mut D,
) -> Result<usize, usize>
where
    L: NotifyLink,
    D: DelayNs,
{
    let mut sent = 0;
    for chunk in payload.chunks(NOTIFY_CHUNK_SIZE) {
        if link.notify(conn, chunk).await.is_err() {
            return Err(sent);
        }
        sent += 1;
        delay.delay_ms(CHUNK_PACING_MS).await;
    }
    Ok(sent)
}
