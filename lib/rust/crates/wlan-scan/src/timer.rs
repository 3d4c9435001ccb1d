// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    log::debug,
    parking_lot::{Condvar, Mutex, MutexGuard},
    std::{
        collections::{BTreeMap, HashMap},
        convert::TryFrom,
        io, mem,
        sync::{
            atomic::{AtomicU64, Ordering},
            Arc,
        },
        thread,
        time::{Duration, Instant},
    },
};

#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone, PartialOrd, Ord)]
pub struct EventId(u64);

/// Identifies a task handed to a `Scheduler`.
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone, PartialOrd, Ord)]
pub struct TaskHandle(pub u64);

pub type TaskCallback = Box<dyn FnOnce() + Send>;

/// A deferred-callback service.
///
/// `schedule` must never run `callback` on the calling thread before returning. `cancel` must
/// not block waiting on a running callback; canceling a task that already ran or is running is
/// a no-op.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, tag: &'static str, callback: TaskCallback) -> TaskHandle;
    fn cancel(&self, handle: TaskHandle);
}

/// A timer to schedule and cancel timeouts and retrieve triggered events.
///
/// Scheduled callbacks only carry the `EventId`. The event itself stays here until it is either
/// retrieved with `triggered` or canceled, so a callback that fires after its event was canceled
/// finds nothing.
pub struct Timer<E> {
    events: HashMap<EventId, (E, TaskHandle)>,
    next_event_id: u64,
    scheduler: Arc<dyn Scheduler>,
    on_fire: Arc<dyn Fn(EventId) + Send + Sync>,
}

impl<E> Timer<E> {
    pub fn new(scheduler: Arc<dyn Scheduler>, on_fire: Arc<dyn Fn(EventId) + Send + Sync>) -> Self {
        Self { events: HashMap::default(), next_event_id: 0, scheduler, on_fire }
    }

    pub fn triggered(&mut self, event_id: &EventId) -> Option<E> {
        self.events.remove(event_id).map(|(event, _)| event)
    }

    pub fn schedule_event(&mut self, delay: Duration, tag: &'static str, event: E) -> EventId {
        self.next_event_id += 1;
        let event_id = EventId(self.next_event_id);
        let on_fire = Arc::clone(&self.on_fire);
        let handle = self.scheduler.schedule(delay, tag, Box::new(move || on_fire(event_id)));
        self.events.insert(event_id, (event, handle));
        event_id
    }

    pub fn cancel_event(&mut self, event_id: EventId) {
        if let Some((_, handle)) = self.events.remove(&event_id) {
            self.scheduler.cancel(handle);
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, (_, handle)) in self.events.drain() {
            self.scheduler.cancel(handle);
        }
    }

    pub fn is_scheduled(&self, event_id: &EventId) -> bool {
        self.events.contains_key(event_id)
    }
}

/// Source of the monotonic time used to timestamp scan requests.
pub trait Clock: Send + Sync {
    fn elapsed_since_boot_nanos(&self) -> i64;

    fn elapsed_since_boot_millis(&self) -> i64 {
        self.elapsed_since_boot_nanos() / 1_000_000
    }
}

/// Measures time from a fixed origin. Scan result timestamps must use the same origin.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::with_origin(Instant::now())
    }

    pub fn with_origin(origin: Instant) -> Self {
        MonotonicClock { origin }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn elapsed_since_boot_nanos(&self) -> i64 {
        let elapsed = Instant::now().saturating_duration_since(self.origin);
        i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX)
    }
}

#[derive(Default)]
struct TaskQueue {
    tasks: BTreeMap<(Instant, TaskHandle), (&'static str, TaskCallback)>,
    deadlines: HashMap<TaskHandle, Instant>,
    shutdown: bool,
}

impl TaskQueue {
    fn next_deadline(&self) -> Option<Instant> {
        self.tasks.keys().next().map(|(deadline, _)| *deadline)
    }

    fn pop_next(&mut self) -> Option<(&'static str, TaskCallback)> {
        let key = *self.tasks.keys().next()?;
        self.deadlines.remove(&key.1);
        self.tasks.remove(&key)
    }
}

#[derive(Default)]
struct Shared {
    queue: Mutex<TaskQueue>,
    wakeup: Condvar,
}

/// Runs scheduled tasks in deadline order on one worker thread.
///
/// The worker is spawned by `new`, so scheduling itself cannot fail. Canceled tasks are
/// dropped from the queue right away and never hold on to the worker.
pub struct ThreadScheduler {
    next_handle: AtomicU64,
    shared: Arc<Shared>,
}

impl ThreadScheduler {
    pub fn new() -> io::Result<Self> {
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("wlan-scan timer".to_string())
            .spawn(move || run_tasks(&worker_shared))?;
        Ok(ThreadScheduler { next_handle: AtomicU64::new(0), shared })
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        // The worker may be the thread dropping the last reference, so it is not joined.
        let discarded = {
            let mut queue = self.shared.queue.lock();
            queue.shutdown = true;
            queue.deadlines.clear();
            self.shared.wakeup.notify_one();
            mem::take(&mut queue.tasks)
        };
        // Pending callbacks are dropped without the lock held.
        drop(discarded);
    }
}

fn run_tasks(shared: &Shared) {
    let mut queue = shared.queue.lock();
    while !queue.shutdown {
        match queue.next_deadline() {
            Some(deadline) if deadline <= Instant::now() => {
                if let Some((tag, callback)) = queue.pop_next() {
                    debug!("Running task '{}'", tag);
                    // Callbacks may schedule or cancel tasks.
                    MutexGuard::unlocked(&mut queue, callback);
                }
            }
            Some(deadline) => {
                shared.wakeup.wait_until(&mut queue, deadline);
            }
            None => shared.wakeup.wait(&mut queue),
        }
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, tag: &'static str, callback: TaskCallback) -> TaskHandle {
        let handle = TaskHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        let deadline = Instant::now() + delay;
        let mut queue = self.shared.queue.lock();
        queue.tasks.insert((deadline, handle), (tag, callback));
        queue.deadlines.insert(handle, deadline);
        self.shared.wakeup.notify_one();
        handle
    }

    fn cancel(&self, handle: TaskHandle) {
        let canceled = {
            let mut queue = self.shared.queue.lock();
            match queue.deadlines.remove(&handle) {
                Some(deadline) => queue.tasks.remove(&(deadline, handle)),
                None => None,
            }
        };
        drop(canceled);
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_utils::FakeScheduler,
        std::sync::mpsc,
    };

    #[derive(PartialEq, Eq, Debug, Hash)]
    struct FooEvent(u8);

    fn fired_ids() -> (Arc<Mutex<Vec<EventId>>>, Arc<dyn Fn(EventId) + Send + Sync>) {
        let fired = Arc::new(Mutex::new(vec![]));
        let fired_clone = Arc::clone(&fired);
        (fired, Arc::new(move |id| fired_clone.lock().push(id)))
    }

    #[test]
    fn triggered_hands_out_event_once() {
        let scheduler = Arc::new(FakeScheduler::new());
        let (fired, on_fire) = fired_ids();
        let mut timer = Timer::new(scheduler.clone(), on_fire);

        let event_id = timer.schedule_event(Duration::from_secs(15), "timeout", FooEvent(8));
        assert!(timer.is_scheduled(&event_id));
        assert!(scheduler.fire_next("timeout"));
        assert_eq!(*fired.lock(), vec![event_id]);
        assert_eq!(timer.triggered(&event_id), Some(FooEvent(8)));
        assert!(!timer.is_scheduled(&event_id));
        assert_eq!(timer.triggered(&event_id), None);
    }

    #[test]
    fn callback_in_flight_after_cancel_finds_nothing() {
        let scheduler = Arc::new(FakeScheduler::new());
        let (fired, on_fire) = fired_ids();
        let mut timer = Timer::new(scheduler.clone(), on_fire);

        let stale_id = timer.schedule_event(Duration::ZERO, "report", FooEvent(1));
        let callback = scheduler.take_task("report").expect("no task scheduled");
        timer.cancel_event(stale_id);
        let live_id = timer.schedule_event(Duration::ZERO, "report", FooEvent(2));

        callback();
        assert_eq!(*fired.lock(), vec![stale_id]);
        assert_eq!(timer.triggered(&stale_id), None);
        assert_eq!(timer.triggered(&live_id), Some(FooEvent(2)));
    }

    #[test]
    fn cancel_event_cancels_scheduled_task() {
        let scheduler = Arc::new(FakeScheduler::new());
        let (fired, on_fire) = fired_ids();
        let mut timer = Timer::new(scheduler.clone(), on_fire);

        let event_id = timer.schedule_event(Duration::from_secs(1), "foo", 1);
        assert_eq!(scheduler.pending_tags(), vec!["foo"]);
        timer.cancel_event(event_id);
        assert!(scheduler.pending_tags().is_empty());
        assert!(!scheduler.fire_next("foo"));
        assert!(fired.lock().is_empty());
    }

    #[test]
    fn scheduled_task_reports_its_event_id() {
        let scheduler = Arc::new(FakeScheduler::new());
        let (fired, on_fire) = fired_ids();
        let mut timer = Timer::new(scheduler.clone(), on_fire);

        let event_id_1 = timer.schedule_event(Duration::from_secs(1), "first", 1);
        let event_id_2 = timer.schedule_event(Duration::from_secs(1), "second", 2);
        assert!(scheduler.fire_next("second"));
        assert!(scheduler.fire_next("first"));
        assert_eq!(*fired.lock(), vec![event_id_2, event_id_1]);
    }

    #[test]
    fn cancel_all_drops_every_scheduler_task() {
        let scheduler = Arc::new(FakeScheduler::new());
        let (fired, on_fire) = fired_ids();
        let mut timer = Timer::new(scheduler.clone(), on_fire);

        let timeout_id = timer.schedule_event(Duration::from_secs(15), "timeout", 1);
        let report_id = timer.schedule_event(Duration::ZERO, "report", 2);
        assert_eq!(scheduler.pending_tags(), vec!["timeout", "report"]);

        timer.cancel_all();
        assert!(scheduler.pending_tags().is_empty());
        assert!(!timer.is_scheduled(&timeout_id));
        assert!(!timer.is_scheduled(&report_id));
        assert!(fired.lock().is_empty());

        // Ids keep increasing, so a new event never collides with a canceled one.
        let next_id = timer.schedule_event(Duration::ZERO, "report", 3);
        assert!(next_id > report_id);
    }

    #[test]
    fn thread_scheduler_runs_task() {
        let scheduler = ThreadScheduler::new().expect("failed to start scheduler");
        let (sender, receiver) = mpsc::channel();
        scheduler.schedule(Duration::from_millis(1), "run", Box::new(move || {
            sender.send(7).expect("failed to send");
        }));
        assert_eq!(receiver.recv_timeout(Duration::from_secs(5)), Ok(7));
    }

    #[test]
    fn thread_scheduler_cancel_drops_task() {
        let scheduler = ThreadScheduler::new().expect("failed to start scheduler");
        let (sender, receiver) = mpsc::channel::<()>();
        let handle = scheduler.schedule(Duration::from_secs(60), "cancel", Box::new(move || {
            sender.send(()).expect("failed to send");
        }));
        scheduler.cancel(handle);
        // The canceled callback, and the sender it owns, is dropped without waiting for its
        // deadline.
        assert_eq!(
            receiver.recv_timeout(Duration::from_secs(5)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn thread_scheduler_runs_tasks_in_deadline_order() {
        let scheduler = ThreadScheduler::new().expect("failed to start scheduler");
        let (sender, receiver) = mpsc::channel();
        for (delay_ms, value) in &[(300, 3), (100, 1), (200, 2)] {
            let sender = sender.clone();
            let value = *value;
            scheduler.schedule(Duration::from_millis(*delay_ms), "order", Box::new(move || {
                sender.send(value).expect("failed to send");
            }));
        }
        let received: Vec<i32> = (0..3)
            .map(|_| receiver.recv_timeout(Duration::from_secs(5)).expect("task did not run"))
            .collect();
        assert_eq!(received, vec![1, 2, 3]);
    }

    #[test]
    fn thread_scheduler_canceled_timeout_does_not_delay_later_tasks() {
        let scheduler = ThreadScheduler::new().expect("failed to start scheduler");
        let (sender, receiver) = mpsc::channel();
        for _ in 0..100 {
            let handle = scheduler.schedule(Duration::from_secs(15), "timeout", Box::new(|| {}));
            scheduler.cancel(handle);
        }
        scheduler.schedule(Duration::ZERO, "report", Box::new(move || {
            sender.send(()).expect("failed to send");
        }));
        assert_eq!(receiver.recv_timeout(Duration::from_secs(5)), Ok(()));
        assert!(scheduler.shared.queue.lock().tasks.is_empty());
    }

    #[test]
    fn thread_scheduler_callback_can_schedule() {
        let scheduler = Arc::new(ThreadScheduler::new().expect("failed to start scheduler"));
        let (sender, receiver) = mpsc::channel();
        let inner_scheduler = Arc::clone(&scheduler);
        scheduler.schedule(Duration::ZERO, "outer", Box::new(move || {
            inner_scheduler.schedule(Duration::ZERO, "inner", Box::new(move || {
                sender.send(()).expect("failed to send");
            }));
        }));
        assert_eq!(receiver.recv_timeout(Duration::from_secs(5)), Ok(()));
    }

    #[test]
    fn dropping_thread_scheduler_discards_pending_tasks() {
        let scheduler = ThreadScheduler::new().expect("failed to start scheduler");
        let (sender, receiver) = mpsc::channel::<()>();
        scheduler.schedule(Duration::from_secs(60), "pending", Box::new(move || {
            sender.send(()).expect("failed to send");
        }));
        drop(scheduler);
        assert_eq!(
            receiver.recv_timeout(Duration::from_secs(5)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let first = clock.elapsed_since_boot_nanos();
        thread::sleep(Duration::from_millis(2));
        let second = clock.elapsed_since_boot_nanos();
        assert!(second > first);
        assert!(clock.elapsed_since_boot_millis() >= 2);
    }
}
