//! Background production plumbing.
//!
//! A production job runs on its own worker thread and reports back over an
//! mpsc channel owned by the controller. The worker never touches
//! controller, history, or context state; the controller drains completions
//! on its own thread and applies the staleness check there.

use std::sync::mpsc::Sender;
use std::thread;

use crate::content::{CancelToken, ProduceError, ProduceJob, ProducedOutput};

/// Identity of one started production task, unique per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ScopeId(u64);

impl ScopeId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Message a worker thread sends back when its job ends.
pub(crate) struct Completion {
    pub(crate) scope: ScopeId,
    pub(crate) result: Result<ProducedOutput, ProduceError>,
}

/// Run `job` on a worker thread, reporting the outcome to `sender`.
///
/// A job whose cancellation fired before it ever ran is not executed at
/// all. The send can fail only when the controller is gone, in which case
/// the result has no consumer and is dropped.
pub(crate) fn spawn(
    job: ProduceJob,
    scope: ScopeId,
    cancel: CancelToken,
    sender: Sender<Completion>,
) {
    thread::spawn(move || {
        let result = if cancel.is_cancelled() {
            Err(ProduceError::Cancelled)
        } else {
            job(&cancel)
        };
        let _ = sender.send(Completion { scope, result });
    });
}
