//! ISR-safe debug console over a single chunked, connection-gated link.
//!
//! Producers in any context hand a message to [`Console`], which frames it
//! into a bounded ring and wakes the drain worker. The worker (see
//! [`Console::run`]) is the only code that touches the link, so messages
//! arrive in order and their chunks never interleave.
//!
//! ```ignore
//! static CONSOLE: Console<Connection, RING_BUF_SIZE> = Console::new();
//!
//! nus_printf!(CONSOLE, "Temp: {}.{} C\n", t / 10, t % 10)?;
//! CONSOLE.send_bytes(b"irq\n", CallContext::Interrupt)?;
//! ```

pub mod drain;
pub mod format;
pub mod queue;

use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

use crate::config::MSG_MAX_SIZE;
use crate::error::ConsoleError;
use format::FormatBuffer;
use queue::MessageQueue;

pub use drain::{DrainReport, NotifyLink};

/// Where a producer is calling from.
///
/// Interrupt callers never log from the enqueue path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallContext {
    Thread,
    Interrupt,
}

/// What to do with messages produced while no link is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EnqueuePolicy {
    /// Buffer anyway; the first connection flushes it and a disconnect clears it.
    #[default]
    AlwaysBuffer,
    /// Reject with [`ConsoleError::NotConnected`].
    RequireConnection,
}

/// Link lifecycle as reported by the BLE stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent<C> {
    Established(C),
    Ended,
}

/// Ring buffer snapshot. Fields are read separately, so they are not
/// guaranteed consistent with a concurrent producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    pub used: usize,
    pub free: usize,
    pub total: usize,
    /// Messages dropped for lack of space since boot.
    pub dropped: u32,
}

/// One console instance: ring buffer, connection slot and wake signal.
///
/// `C` is the connection handle type; it is cloned for each drained message.
pub struct Console<C, const CAP: usize> {
    queue: Mutex<CriticalSectionRawMutex, RefCell<MessageQueue<CAP>>>,
    link: Mutex<CriticalSectionRawMutex, RefCell<Option<C>>>,
    wake: Signal<CriticalSectionRawMutex, ()>,
    dropped: AtomicU32,
    policy: EnqueuePolicy,
}

impl<C, const CAP: usize> Console<C, CAP> {
    pub const fn new() -> Self {
        Self::with_policy(EnqueuePolicy::AlwaysBuffer)
    }

    pub const fn with_policy(policy: EnqueuePolicy) -> Self {
        Self {
            queue: Mutex::new(RefCell::new(MessageQueue::new())),
            link: Mutex::new(RefCell::new(None)),
            wake: Signal::new(),
            dropped: AtomicU32::new(0),
            policy,
        }
    }

    pub fn policy(&self) -> EnqueuePolicy {
        self.policy
    }

    pub fn is_connected(&self) -> bool {
        self.link.lock(|l| l.borrow().is_some())
    }

    /// Queue a raw buffer. Safe from any context, including interrupts.
    ///
    /// Input longer than `MSG_MAX_SIZE` is truncated. Returns the number of
    /// payload bytes queued.
    pub fn send_bytes(&self, data: &[u8], ctx: CallContext) -> Result<usize, ConsoleError> {
        if data.is_empty() {
            return Err(ConsoleError::InvalidArgument);
        }
        if self.policy == EnqueuePolicy::RequireConnection && !self.is_connected() {
            return Err(ConsoleError::NotConnected);
        }

        let payload = &data[..data.len().min(MSG_MAX_SIZE)];
        let pushed = self.queue.lock(|q| q.borrow_mut().push_record(payload));
        if let Err(e) = pushed {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            if ctx == CallContext::Thread {
                warn!("console: ring buffer full ({}), dropping message", e);
            }
            return Err(ConsoleError::NoSpace);
        }

        self.wake.signal(());
        Ok(payload.len())
    }

    /// Queue a plain string with no formatting.
    pub fn send_str(&self, msg: &str, ctx: CallContext) -> Result<usize, ConsoleError> {
        self.send_bytes(msg.as_bytes(), ctx)
    }

    /// Render and queue a formatted message. Not for interrupt context.
    ///
    /// Output beyond `MSG_MAX_SIZE` bytes is cut at a character boundary.
    /// Usually called through [`nus_printf!`](crate::nus_printf).
    pub fn send_fmt(&self, args: fmt::Arguments<'_>) -> Result<usize, ConsoleError> {
        let rendered = FormatBuffer::<MSG_MAX_SIZE>::render(args);
        if rendered.truncated() {
            trace!("console: formatted message truncated");
        }
        self.send_bytes(rendered.as_bytes(), CallContext::Thread)
    }

    pub fn stats(&self) -> Stats {
        let (used, free) = self.queue.lock(|q| {
            let q = q.borrow();
            (q.used(), q.free())
        });
        Stats {
            used,
            free,
            total: CAP,
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// Flush all pending messages.
    pub fn clear(&self) {
        self.queue.lock(|q| q.borrow_mut().reset());
        info!("console: ring buffer cleared");
    }

    /// Single entry point for link lifecycle events.
    pub fn on_connection_event(&self, event: ConnectionEvent<C>) {
        match event {
            ConnectionEvent::Established(conn) => {
                self.link.lock(|l| *l.borrow_mut() = Some(conn));
                info!("console: link established");
                // flush anything buffered before the connection
                self.wake.signal(());
            }
            ConnectionEvent::Ended => {
                let had_link = self.link.lock(|l| l.borrow_mut().take()).is_some();
                if had_link {
                    info!("console: link ended");
                    self.clear();
                }
            }
        }
    }
}

impl<C: Clone, const CAP: usize> Console<C, CAP> {
    fn connection(&self) -> Option<C> {
        self.link.lock(|l| l.borrow().clone())
    }
}

impl<C, const CAP: usize> Default for Console<C, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

/// printf-style send: `nus_printf!(CONSOLE, "x = {}\n", x)`.
#[macro_export]
macro_rules! nus_printf {
    ($console:expr, $($arg:tt)*) => {
        $console.send_fmt(::core::format_args!($($arg)*))
    };
}
