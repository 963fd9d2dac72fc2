//! Task plumbing: delivery tasks, the flush timer, and unload handling.
//!
//! All state lives behind `RefCell`s on one thread. A borrow is never held
//! across an `.await`, and the host diagnostic callback never runs while the
//! engine is borrowed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use tokio::task::{spawn_local, JoinHandle};

use pulse_dispatch::{Batch, DeliveryContext, Transport, TransportSelector};
use pulse_observability::{DiagnosticKind, Observability};

use crate::engine::Engine;

/// Current time on the tokio clock, so paused-clock tests drive the
/// scheduler too.
pub(crate) fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

pub(crate) struct Shared<T> {
    engine: RefCell<Engine>,
    pub(crate) selector: TransportSelector<T>,
    observability: Observability,
    deliveries: RefCell<HashMap<u64, JoinHandle<()>>>,
    timer: RefCell<Option<(Instant, JoinHandle<()>)>>,
}

impl<T: Transport + 'static> Shared<T> {
    pub(crate) fn new(
        engine: Engine,
        selector: TransportSelector<T>,
        observability: Observability,
    ) -> Self {
        Self {
            engine: RefCell::new(engine),
            selector,
            observability,
            deliveries: RefCell::new(HashMap::new()),
            timer: RefCell::new(None),
        }
    }

    /// Run `f` on the engine. Diagnostics it emits reach the host callback
    /// only after the borrow ends.
    pub(crate) fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        let _held = self.observability.diagnostics.hold();
        let mut engine = self.engine.borrow_mut();
        let result = f(&mut *engine);
        drop(engine);
        result
    }

    /// Read engine state. Returns `None` when called from inside an engine
    /// operation.
    pub(crate) fn read_engine<R>(&self, f: impl FnOnce(&Engine) -> R) -> Option<R> {
        self.engine.try_borrow().ok().map(|engine| f(&*engine))
    }
}

/// Spawn one delivery task per batch, then re-arm the timer.
pub(crate) fn dispatch_all<T: Transport + 'static>(
    shared: &Rc<Shared<T>>,
    batches: Vec<Batch>,
    context: DeliveryContext,
) {
    for batch in batches {
        dispatch(shared, batch, context);
    }
    arm_timer(shared);
}

fn dispatch<T: Transport + 'static>(shared: &Rc<Shared<T>>, batch: Batch, context: DeliveryContext) {
    let batch_id = batch.id;
    let task = Rc::clone(shared);
    let handle = spawn_local(async move {
        let outcome = task.selector.deliver(&batch, context).await;
        task.deliveries.borrow_mut().remove(&batch.id);

        let reconciliation = task.with_engine(|engine| engine.complete(batch.id, &outcome, now()));
        tracing::debug!(
            batch_id = batch.id,
            delivered = reconciliation.delivered,
            requeued = reconciliation.requeued,
            exhausted = reconciliation.exhausted,
            "delivery reconciled"
        );
        arm_timer(&task);
    });
    shared.deliveries.borrow_mut().insert(batch_id, handle);
}

/// Make the timer task match the scheduler's deadline.
pub(crate) fn arm_timer<T: Transport + 'static>(shared: &Rc<Shared<T>>) {
    let deadline = shared.engine.borrow().deadline();
    let mut timer = shared.timer.borrow_mut();

    if let (Some(wanted), Some((armed, _))) = (deadline, timer.as_ref()) {
        if wanted == *armed {
            return;
        }
    }
    if let Some((_, handle)) = timer.take() {
        handle.abort();
    }

    if let Some(deadline) = deadline {
        let task = Rc::clone(shared);
        let handle = spawn_local(async move {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
            task.timer.borrow_mut().take();
            let batch = task.with_engine(|engine| engine.poll_timer(now()));
            dispatch_all(&task, batch.into_iter().collect(), DeliveryContext::default());
        });
        *timer = Some((deadline, handle));
    }
}

/// Wait until no delivery is in flight, including ones started meanwhile.
pub(crate) async fn await_deliveries<T: Transport + 'static>(shared: &Rc<Shared<T>>) {
    loop {
        let handles: Vec<JoinHandle<()>> = shared
            .deliveries
            .borrow_mut()
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        if handles.is_empty() {
            return;
        }
        for handle in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    shared
                        .observability
                        .diagnostics
                        .error(DiagnosticKind::DeliveryFailed, format!("delivery task failed: {e}"));
                }
            }
        }
    }
}

/// Abort in-flight deliveries and the timer, reclaim their records, and
/// deliver everything by pixel.
pub(crate) async fn flush_for_unload<T: Transport + 'static>(shared: &Rc<Shared<T>>) {
    let aborted: Vec<JoinHandle<()>> = shared
        .deliveries
        .borrow_mut()
        .drain()
        .map(|(_, handle)| handle)
        .collect();
    for handle in &aborted {
        handle.abort();
    }
    if let Some((_, handle)) = shared.timer.borrow_mut().take() {
        handle.abort();
    }

    let batches = shared.with_engine(|engine| {
        let reclaimed = engine.reclaim_in_flight(now());
        if reclaimed > 0 {
            tracing::debug!(reclaimed, aborted = aborted.len(), "unload: reclaimed in-flight records");
        }
        engine.force_flush(now())
    });
    dispatch_all(shared, batches, DeliveryContext { unloading: true });
    await_deliveries(shared).await;
}
