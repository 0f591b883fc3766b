//! Single-fulfillment completion handles for asynchronous operations.
//!
//! # Design
//! Each asynchronous call returns a `Completion<T>` backed by a oneshot
//! channel: the dispatcher fulfills it at most once, and dropping the handle
//! withdraws interest in the result. Decoding runs when the transport result
//! is claimed, so a caller never observes a partially decoded object. If the
//! dispatcher goes away before fulfilling (disposal, abandoned in-flight
//! work), the completion resolves with `Disposed`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::DashkuError;
use crate::http::HttpResponse;

pub(crate) type TransportResult = Result<HttpResponse, DashkuError>;
type Decode<T> = Box<dyn FnOnce(HttpResponse) -> Result<T, DashkuError> + Send>;

/// Handle to the eventual result of one asynchronous operation.
///
/// Await it from async code, or call [`Completion::wait`] from a blocking
/// caller. Fulfillment happens exactly once.
pub struct Completion<T> {
    rx: oneshot::Receiver<TransportResult>,
    decode: Option<Decode<T>>,
}

impl<T> Completion<T> {
    pub(crate) fn new(rx: oneshot::Receiver<TransportResult>, decode: Decode<T>) -> Self {
        Self {
            rx,
            decode: Some(decode),
        }
    }

    /// A completion that resolves immediately with `err`.
    pub(crate) fn failed(err: DashkuError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(err));
        Self {
            rx,
            decode: Some(Box::new(|_| Err(DashkuError::Disposed))),
        }
    }

    fn resolve(transport: TransportResult, decode: Option<Decode<T>>) -> Result<T, DashkuError> {
        match (transport, decode) {
            (Ok(response), Some(decode)) => decode(response),
            (Err(err), _) => Err(err),
            // Result already claimed; nothing sensible left to hand out.
            (Ok(_), None) => Err(DashkuError::Disposed),
        }
    }

    /// Block the calling thread until the result arrives.
    ///
    /// Must not be called from inside an async context; `.await` the
    /// completion there instead.
    pub fn wait(mut self) -> Result<T, DashkuError> {
        let transport = self
            .rx
            .blocking_recv()
            .map_err(|_| DashkuError::Disposed)?;
        Self::resolve(transport, self.decode.take())
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T, DashkuError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(received) => {
                let transport = received.unwrap_or(Err(DashkuError::Disposed));
                Poll::Ready(Self::resolve(transport, this.decode.take()))
            }
        }
    }
}
