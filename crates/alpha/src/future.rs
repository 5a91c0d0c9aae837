//! # Call Futures
//!
//! Every client operation returns a [`Future`] as soon as its request is
//! issued. The reply can be collected three ways: [`Future::wait`] blocks the
//! calling thread, [`Future::completed`] polls without blocking, and
//! `.await` works through [`IntoFuture`].
//!
//! A future built with a deadline reports `Timeout` once the deadline passes
//! without a reply, even if the reply lands before anyone looks. The request
//! itself is not cancelled; a late reply is discarded.

use std::future::IntoFuture;
use std::pin::Pin;
use std::time::Instant;

use alpharpc::PendingCall;

use crate::error::Error;
use crate::error::Result;

/// Turns the raw reply bytes into the operation's value.
pub(crate) type Finish<T> = Box<dyn FnOnce(Vec<u8>) -> Result<T> + Send>;

pub struct Future<T> {
    call: PendingCall,
    deadline: Option<Instant>,
    finish: Option<Finish<T>>,
    outcome: Option<Result<T>>,
}

impl<T: Send + 'static> Future<T> {
    pub(crate) fn new(call: PendingCall, deadline: Option<Instant>, finish: Finish<T>) -> Self {
        Self {
            call,
            deadline,
            finish: Some(finish),
            outcome: None,
        }
    }

    /// Blocks until the reply arrives and returns its value or error.
    ///
    /// From a thread inside a runtime context this fails with `Rpc`; use
    /// `.await` there instead.
    pub fn wait(mut self) -> Result<T> {
        if let Some(outcome) = self.outcome.take() {
            return outcome;
        }
        let raw = self.call.wait();
        self.resolve(raw)
    }

    /// Reports whether the reply has arrived, without blocking.
    ///
    /// A failed reply, or a deadline that has passed, is returned as `Err`.
    pub fn completed(&mut self) -> Result<bool> {
        if self.outcome.is_none() {
            match self.call.try_take() {
                Some(raw) => {
                    let outcome = self.resolve(raw);
                    self.outcome = Some(outcome);
                }
                None if self.deadline.is_some_and(|d| Instant::now() >= d) => {
                    self.outcome = Some(Err(Error::Timeout));
                }
                None => return Ok(false),
            }
        }

        match &self.outcome {
            Some(Ok(_)) => Ok(true),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(false),
        }
    }

    fn resolve(&mut self, raw: alpharpc::Result<Vec<u8>>) -> Result<T> {
        let bytes = raw.map_err(Error::from)?;
        match self.finish.take() {
            Some(finish) => finish(bytes),
            None => Err(Error::Rpc("Reply already consumed".into())),
        }
    }
}

impl<T: Send + 'static> IntoFuture for Future<T> {
    type Output = Result<T>;
    type IntoFuture = Pin<Box<dyn std::future::Future<Output = Result<T>> + Send>>;

    fn into_future(mut self) -> Self::IntoFuture {
        Box::pin(async move {
            if let Some(outcome) = self.outcome.take() {
                return outcome;
            }
            let raw = self.call.recv().await;
            self.resolve(raw)
        })
    }
}
