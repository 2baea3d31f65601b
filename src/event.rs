use std::time::Duration;

use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent};
use futures::StreamExt;
use tokio::sync::mpsc;

#[derive(Clone, Debug)]
pub enum Event {
    Key(KeyEvent),
    /// Periodic redraw so expiring notices disappear without input.
    Tick,
    Resize,
}

/// Terminal input pumped onto a channel by a task on the UI runtime.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    _task: tokio::task::JoinHandle<()>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Event>();

        let task = tokio::spawn(async move {
            let mut reader = EventStream::new();
            let mut tick_interval = tokio::time::interval(tick_rate);

            loop {
                tokio::select! {
                    maybe_event = reader.next() => {
                        let mapped = match maybe_event {
                            Some(Ok(CrosstermEvent::Key(key))) => Some(Event::Key(key)),
                            Some(Ok(CrosstermEvent::Resize(_, _))) => Some(Event::Resize),
                            Some(Ok(_)) => None,
                            Some(Err(err)) => {
                                tracing::warn!(%err, "terminal event stream failed");
                                break;
                            }
                            None => break,
                        };
                        if let Some(e) = mapped
                            && tx.send(e).is_err()
                        {
                            break;
                        }
                    }
                    _ = tick_interval.tick() => {
                        if tx.send(Event::Tick).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self { rx, _task: task }
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
