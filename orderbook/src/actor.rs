//! Asynchronous command loop around the synchronous [`Book`].
//!
//! A single worker task owns the book; callers post typed commands over a
//! bounded channel and park on a oneshot reply. That gives serial
//! consistency: commands take effect in worker order, and a caller that
//! saw command A complete before sending B observes all of A's effects.
//!
//! The worker may suspend only on command receive and on trade sends when
//! the trade buffer is full. View publication never blocks; it drops the
//! update when the consumer lags (latest-wins).

use std::sync::Mutex;

use tokio::sync::{mpsc, oneshot};

use crate::book::Book;
use crate::clock::{Clock, SystemClock};
use crate::error::BookError;
use crate::types::{BookConfig, BookView, Order, Trade};

enum Command {
    Submit {
        order: Order,
        reply: oneshot::Sender<Result<(), BookError>>,
    },
    Cancel {
        id: String,
        reply: oneshot::Sender<Result<(), BookError>>,
    },
    Amend {
        id: String,
        price: Option<i64>,
        qty: Option<i64>,
        reply: oneshot::Sender<Result<(), BookError>>,
    },
    Snapshot {
        reply: oneshot::Sender<BookView>,
    },
    Stop,
}

/// Handle to a running book worker.
///
/// Construction spawns the worker on the current tokio runtime. All
/// methods are cheap to call from any task; share the handle through an
/// `Arc` for multiple producers.
pub struct OrderBook {
    cmd_tx: mpsc::Sender<Command>,
    trades_rx: Mutex<Option<mpsc::Receiver<Trade>>>,
    updates_rx: Mutex<Option<mpsc::Receiver<BookView>>>,
}

impl OrderBook {
    pub fn new(cfg: BookConfig) -> Self {
        Self::with_clock(cfg, SystemClock::new())
    }

    pub fn with_clock<C: Clock + 'static>(cfg: BookConfig, clock: C) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(cfg.request_buffer.max(1));
        let (trade_tx, trade_rx) = mpsc::channel(cfg.trade_buffer.max(1));
        let (update_tx, update_rx) = mpsc::channel(cfg.update_buffer.max(1));
        let book = Book::with_clock(cfg, clock);
        tokio::spawn(run_worker(book, cmd_rx, trade_tx, update_tx));
        Self {
            cmd_tx,
            trades_rx: Mutex::new(Some(trade_rx)),
            updates_rx: Mutex::new(Some(update_rx)),
        }
    }

    /// Submits an order and waits for the worker's verdict. Trades the
    /// order produced are delivered on the trade stream before the reply's
    /// follow-up view update.
    pub async fn submit(&self, order: Order) -> Result<(), BookError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Submit { order, reply })
            .await
            .map_err(|_| BookError::Stopped)?;
        rx.await.unwrap_or(Err(BookError::Stopped))
    }

    /// Cancels a resting order by id.
    pub async fn cancel(&self, id: impl Into<String>) -> Result<(), BookError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Cancel {
                id: id.into(),
                reply,
            })
            .await
            .map_err(|_| BookError::Stopped)?;
        rx.await.unwrap_or(Err(BookError::Stopped))
    }

    /// Amends price and/or quantity of a resting order.
    pub async fn amend(
        &self,
        id: impl Into<String>,
        price: Option<i64>,
        qty: Option<i64>,
    ) -> Result<(), BookError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Amend {
                id: id.into(),
                price,
                qty,
                reply,
            })
            .await
            .map_err(|_| BookError::Stopped)?;
        rx.await.unwrap_or(Err(BookError::Stopped))
    }

    /// Returns a copy of the current top of book.
    pub async fn snapshot(&self) -> Result<BookView, BookError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| BookError::Stopped)?;
        rx.await.map_err(|_| BookError::Stopped)
    }

    /// Takes the trade stream. Lossless within its buffer: the worker
    /// blocks when it fills. `None` after the first call.
    pub fn trades(&self) -> Option<mpsc::Receiver<Trade>> {
        self.trades_rx.lock().ok()?.take()
    }

    /// Takes the book-update stream. Published after every successful
    /// state-changing command; lossy when the consumer lags. `None` after
    /// the first call.
    pub fn book_updates(&self) -> Option<mpsc::Receiver<BookView>> {
        self.updates_rx.lock().ok()?.take()
    }

    /// Stops the worker after the command it is currently servicing. Both
    /// output streams close; later commands fail with
    /// [`BookError::Stopped`].
    pub async fn stop(&self) {
        let _ = self.cmd_tx.send(Command::Stop).await;
    }
}

async fn run_worker(
    mut book: Book,
    mut cmd_rx: mpsc::Receiver<Command>,
    trade_tx: mpsc::Sender<Trade>,
    update_tx: mpsc::Sender<BookView>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            Command::Submit { order, reply } => match book.submit(order) {
                Ok(trades) => {
                    for trade in trades {
                        if trade_tx.send(trade).await.is_err() {
                            // Consumer dropped the stream; matching goes on.
                            break;
                        }
                    }
                    let _ = reply.send(Ok(()));
                    publish(&book, &update_tx);
                }
                Err(err) => {
                    let _ = reply.send(Err(err));
                }
            },
            Command::Cancel { id, reply } => {
                let result = book.cancel(&id);
                let changed = result.is_ok();
                let _ = reply.send(result);
                if changed {
                    publish(&book, &update_tx);
                }
            }
            Command::Amend {
                id,
                price,
                qty,
                reply,
            } => {
                let result = book.amend(&id, price, qty);
                let changed = result.is_ok();
                let _ = reply.send(result);
                if changed {
                    publish(&book, &update_tx);
                }
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(book.snapshot());
            }
            Command::Stop => break,
        }
    }
    // Dropping trade_tx and update_tx signals end-of-stream to consumers.
}

fn publish(book: &Book, update_tx: &mpsc::Sender<BookView>) {
    let _ = update_tx.try_send(book.snapshot());
}
