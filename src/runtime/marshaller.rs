//! Cross-thread queue of UI mutations.
//!
//! Everything that touches view state is a closure over `&mut S` posted to a
//! [`UiSender`]. Exactly one thread owns the matching [`UiQueue`] and runs the
//! closures in FIFO order, one at a time. Posting from the UI thread itself is
//! fine: the closure runs on a later turn of the loop.

use tokio::sync::mpsc;

pub type UiTask<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

pub struct UiSender<S> {
    tx: mpsc::UnboundedSender<UiTask<S>>,
}

impl<S> Clone for UiSender<S> {
    fn clone(&self) -> Self {
        UiSender {
            tx: self.tx.clone(),
        }
    }
}

impl<S: 'static> UiSender<S> {
    /// Queues `f` for the UI thread. Returns `false` once the UI has gone away,
    /// in which case the closure is dropped unrun.
    pub fn post<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        if self.tx.send(Box::new(f)).is_err() {
            tracing::debug!("ui queue closed, dropping update");
            return false;
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct UiQueue<S> {
    rx: mpsc::UnboundedReceiver<UiTask<S>>,
}

pub fn channel<S>() -> (UiSender<S>, UiQueue<S>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UiSender { tx }, UiQueue { rx })
}

impl<S> UiQueue<S> {
    /// Waits for the next posted closure. `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<UiTask<S>> {
        self.rx.recv().await
    }

    /// Runs everything posted so far, then returns how many closures ran.
    /// Closures posted while draining wait for the next call.
    pub fn drain(&mut self, state: &mut S) -> usize {
        let pending = self.rx.len();
        let mut ran = 0;
        while ran < pending {
            match self.rx.try_recv() {
                Ok(task) => {
                    task(state);
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        ran
    }
}
