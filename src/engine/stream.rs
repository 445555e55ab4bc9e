//! Event stream: a producer thread publishing per-call events over mpsc.
//!
//! The producer runs the chain on its own thread and sends each event as soon
//! as the call that produced it completes. The receiving side is an
//! [`Iterator`]; it ends after the producer's last message, which is an `Err`
//! item if evaluation failed.

use std::sync::mpsc::{self, Receiver, RecvError, SyncSender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};

pub use crate::interpreter::registry::CallCompleted;

/// Sending half handed to the producer closure.
pub enum EventSender<E> {
    Unbounded(mpsc::Sender<Result<E>>),
    Bounded(SyncSender<Result<E>>),
}

impl<E> EventSender<E> {
    /// Publish one item. Returns `false` once the consumer has gone away.
    pub fn send(&self, item: Result<E>) -> bool {
        match self {
            EventSender::Unbounded(tx) => tx.send(item).is_ok(),
            EventSender::Bounded(tx) => tx.send(item).is_ok(),
        }
    }
}

/// Consumer side of a running chain evaluation.
pub struct EventStream<E> {
    rx: Receiver<Result<E>>,
    producer: Option<JoinHandle<()>>,
    finished: bool,
}

impl<E: Send + 'static> EventStream<E> {
    /// Start `produce` on a new thread. `capacity` bounds the channel; `None`
    /// is unbounded and `Some(0)` is a rendezvous channel.
    pub fn spawn<F>(capacity: Option<usize>, produce: F) -> Self
    where
        F: FnOnce(EventSender<E>) + Send + 'static,
    {
        let (tx, rx) = match capacity {
            Some(bound) => {
                let (tx, rx) = mpsc::sync_channel(bound);
                (EventSender::Bounded(tx), rx)
            }
            None => {
                let (tx, rx) = mpsc::channel();
                (EventSender::Unbounded(tx), rx)
            }
        };

        let producer = thread::spawn(move || produce(tx));

        Self {
            rx,
            producer: Some(producer),
            finished: false,
        }
    }
}

impl<E> EventStream<E> {
    /// Non-blocking poll. `None` means nothing is ready yet, or the stream has
    /// ended; use [`is_finished`](Self::is_finished) to tell them apart.
    pub fn poll(&mut self) -> Option<Result<E>> {
        if self.finished {
            return None;
        }
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => self.close(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drain the stream. Returns every event, or the first error.
    pub fn finish(self) -> Result<Vec<E>> {
        self.collect()
    }

    /// The channel closed: reap the producer and report a panic if it died.
    fn close(&mut self) -> Option<Result<E>> {
        self.finished = true;
        let producer = self.producer.take()?;
        match producer.join() {
            Ok(()) => None,
            Err(_) => Some(Err(Error::ProducerPanicked)),
        }
    }
}

impl<E> Iterator for EventStream<E> {
    type Item = Result<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.rx.recv() {
            Ok(item) => Some(item),
            Err(RecvError) => self.close(),
        }
    }
}
