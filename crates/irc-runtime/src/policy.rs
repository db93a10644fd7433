#![forbid(unsafe_code)]

use crate::{ErrorKind, Invocable, Kwargs, TargetError};
use irc_value::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// How target calls are guarded.
///
/// With a timeout each call runs on a helper thread; a call that overruns is
/// reported as [`ErrorKind::Timeout`]. Calls go through a [`SerialInvoker`],
/// which never starts a call while an overrun one is still running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvocationPolicy {
    pub timeout: Option<Duration>,
}

impl InvocationPolicy {
    #[must_use]
    pub fn unbounded() -> Self {
        Self { timeout: None }
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    /// Invoker for one run of calls against the same target.
    #[must_use]
    pub fn invoker(self) -> SerialInvoker {
        SerialInvoker {
            policy: self,
            pending: None,
        }
    }
}

type CallOutcome = Result<Value, TargetError>;

/// Issues calls one at a time under an [`InvocationPolicy`].
///
/// A call that timed out cannot be cancelled. Its completion channel is kept,
/// and the next call first waits up to one timeout for it to finish; if it is
/// still running the next call is not issued and reports `Timeout` instead.
#[derive(Debug)]
pub struct SerialInvoker {
    policy: InvocationPolicy,
    pending: Option<Receiver<CallOutcome>>,
}

impl SerialInvoker {
    #[must_use]
    pub fn policy(&self) -> InvocationPolicy {
        self.policy
    }

    /// An overrun call is still outstanding.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.pending.is_some()
    }

    pub fn invoke(
        &mut self,
        target: &Arc<dyn Invocable>,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> CallOutcome {
        let Some(timeout) = self.policy.timeout else {
            return call_guarded(target.as_ref(), &args, &kwargs);
        };

        if let Some(pending) = self.pending.take() {
            match pending.recv_timeout(timeout) {
                Ok(_) | Err(RecvTimeoutError::Disconnected) => {}
                Err(RecvTimeoutError::Timeout) => {
                    self.pending = Some(pending);
                    return Err(TargetError::new(
                        ErrorKind::Timeout,
                        "previous call still running; target not invoked",
                    ));
                }
            }
        }

        let (tx, rx) = mpsc::channel();
        let worker_target = Arc::clone(target);
        thread::Builder::new()
            .name("irc-target-call".to_string())
            .spawn(move || {
                let outcome = call_guarded(worker_target.as_ref(), &args, &kwargs);
                let _ = tx.send(outcome);
            })
            .map_err(|err| {
                TargetError::new(
                    ErrorKind::Other("WorkerSpawnFailed".to_string()),
                    format!("failed spawning target worker: {err}"),
                )
            })?;

        match rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                self.pending = Some(rx);
                Err(TargetError::new(
                    ErrorKind::Timeout,
                    format!("target did not return within {} ms", timeout.as_millis()),
                ))
            }
            Err(RecvTimeoutError::Disconnected) => Err(TargetError::new(
                ErrorKind::Panic,
                "target worker exited without a result",
            )),
        }
    }
}

fn call_guarded(target: &dyn Invocable, args: &[Value], kwargs: &Kwargs) -> CallOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| target.invoke(args, kwargs))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(TargetError::new(ErrorKind::Panic, panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "target panicked".to_string()
    }
}
