//! Polls the board for its location on a fixed interval from a dedicated
//! thread.
//!
//! The thread owns the connection outright for as long as it runs, which is
//! what keeps calls from interleaving on the half duplex link. A failed
//! poll is logged and skipped; the next cycle starts with a fresh command.

use crate::dwm_api::get_location;
use crate::position::LocationReport;

use log::{info, warn};
use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default time between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

enum Signal {
    Stop,
}

/// A running poll loop. Reports arrive on the receiver returned by
/// [Poller::start].
pub struct Poller<C> {
    handle: Option<JoinHandle<C>>,
    tx: Sender<Signal>,
}

impl<C> Poller<C>
where
    C: Read + Write + Send + 'static,
{
    /// Moves `conn` onto a new thread that calls `get_location` every
    /// `interval` and sends each report down the returned channel.
    ///
    /// The loop ends when [Poller::stop] is called or when the receiver is
    /// dropped.
    pub fn start(conn: C, interval: Duration) -> (Self, Receiver<LocationReport>) {
        let (tx, rx) = mpsc::channel::<Signal>();
        let (report_tx, report_rx) = mpsc::channel();

        let handle = thread::spawn(move || poll_loop(conn, interval, rx, report_tx));

        (
            Poller {
                handle: Some(handle),
                tx,
            },
            report_rx,
        )
    }

    /// Stops the loop after the call in flight and hands the connection
    /// back. `None` if the poll thread panicked.
    pub fn stop(mut self) -> Option<C> {
        // the thread may already be gone if the receiver was dropped
        let _ = self.tx.send(Signal::Stop);
        self.handle.take().and_then(|thread| thread.join().ok())
    }
}

fn poll_loop<C: Read + Write>(
    mut conn: C,
    interval: Duration,
    signals: Receiver<Signal>,
    output: Sender<LocationReport>,
) -> C {
    let mut cycle: u64 = 0;
    loop {
        match signals.try_recv() {
            Ok(Signal::Stop) => break,
            Err(TryRecvError::Disconnected) => {
                info!("poller : handle dropped, stopping.");
                break;
            }
            Err(TryRecvError::Empty) => {}
        }
        cycle += 1;

        match get_location(&mut conn) {
            Ok(report) => {
                if output.send(report).is_err() {
                    info!("poller : nobody is listening, stopping.");
                    break;
                }
            }
            Err(e) => warn!("poller : skipping cycle {} : {}", cycle, e),
        }

        spin_sleep::sleep(interval);
    }
    info!("poller : terminated after {} cycles.", cycle);
    conn
}
