// ============================================================================
// SCHEDULER - timers y tareas locales
// ============================================================================
// Navegador: intervalos de gloo-timers y wasm_bindgen_futures::spawn_local.
// Tests: ManualScheduler avanza un reloj virtual.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};

/// Future `!Send` que corre en el hilo de la UI
pub type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

pub trait Spawn {
    fn spawn(&self, task: LocalTask);
}

pub trait Scheduler {
    /// Ejecuta `task` cada `interval_ms` hasta que se suelte el handle.
    fn schedule_repeating(&self, interval_ms: u32, task: Rc<dyn Fn()>) -> TimerHandle;
}

/// Cancela su timer al soltarse
#[must_use = "dropping the handle cancels the timer"]
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

struct ManualTimer {
    id: u64,
    interval_ms: u64,
    next_due: u64,
    task: Rc<dyn Fn()>,
}

#[derive(Default)]
struct ManualClock {
    now_ms: Cell<u64>,
    next_id: Cell<u64>,
    timers: RefCell<Vec<ManualTimer>>,
}

/// Scheduler de tiempo virtual: nada se dispara hasta llamar a `advance`.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<ManualClock>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms.get()
    }

    pub fn active_timers(&self) -> usize {
        self.clock.timers.borrow().len()
    }

    /// Avanza el reloj y dispara, en orden, cada timer que vence.
    pub fn advance(&self, ms: u64) {
        let target = self.clock.now_ms.get() + ms;
        loop {
            let due = self
                .clock
                .timers
                .borrow()
                .iter()
                .filter(|timer| timer.next_due <= target)
                .min_by_key(|timer| (timer.next_due, timer.id))
                .map(|timer| (timer.id, timer.next_due, timer.task.clone()));

            let Some((id, due_at, task)) = due else { break };
            self.clock.now_ms.set(due_at);
            if let Some(timer) = self.clock.timers.borrow_mut().iter_mut().find(|t| t.id == id) {
                timer.next_due += timer.interval_ms;
            }
            task();
        }
        self.clock.now_ms.set(target);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, interval_ms: u32, task: Rc<dyn Fn()>) -> TimerHandle {
        let id = self.clock.next_id.get() + 1;
        self.clock.next_id.set(id);
        let interval_ms = u64::from(interval_ms.max(1));
        self.clock.timers.borrow_mut().push(ManualTimer {
            id,
            interval_ms,
            next_due: self.clock.now_ms.get() + interval_ms,
            task,
        });

        let clock: Weak<ManualClock> = Rc::downgrade(&self.clock);
        TimerHandle::new(move || {
            if let Some(clock) = clock.upgrade() {
                clock.timers.borrow_mut().retain(|timer| timer.id != id);
            }
        })
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::{BrowserScheduler, BrowserSpawner};

#[cfg(target_arch = "wasm32")]
mod browser {
    use std::rc::Rc;

    use gloo_timers::callback::Interval;

    use super::{LocalTask, Scheduler, Spawn, TimerHandle};

    #[derive(Clone, Copy, Default)]
    pub struct BrowserSpawner;

    impl Spawn for BrowserSpawner {
        fn spawn(&self, task: LocalTask) {
            wasm_bindgen_futures::spawn_local(task);
        }
    }

    #[derive(Clone, Copy, Default)]
    pub struct BrowserScheduler;

    impl Scheduler for BrowserScheduler {
        fn schedule_repeating(&self, interval_ms: u32, task: Rc<dyn Fn()>) -> TimerHandle {
            let interval = Interval::new(interval_ms, move || task());
            // Soltar el Interval lo limpia
            TimerHandle::new(move || drop(interval))
        }
    }
}
