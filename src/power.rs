//! Power state controller.
//!
//! Drives the kernel suspend sequence over the sysfs control files and owns
//! the spurious-wakeup retry machinery. The write to the power state file
//! blocks the calling thread until the hardware actually wakes; everything
//! that happens after it returns is wakeup handling.
//!
//! Every I/O step fails soft: log, return `false`, leave the caller to
//! treat the cycle as "did not complete cleanly".

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const STATE_EXTENDED_FILE: &str = "/sys/power/state-extended";
pub const POWER_STATE_FILE: &str = "/sys/power/state";
/// IR touch controllers on some models wedge across resume; writing "a"
/// here unsticks them.
pub const TOUCH_RECOVERY_NODE: &str = "/sys/devices/virtual/input/input1/neocmd";

/// Spurious wakeups tolerated before the controller gives up and leaves the
/// device awake.
pub const MAX_SPURIOUS_RETRIES: u32 = 20;
/// How long after an unexpected wakeup the guard re-checks whether a resume
/// confirmed it.
pub const GUARD_DELAY: Duration = Duration::from_secs(15);

const SUSPEND_SETTLE: Duration = Duration::from_secs(2);
const RESUME_SETTLE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Awake,
    Suspending,
    AsleepOrRetrying,
}

/// Scheduling seam for the wakeup guard. Production uses `ThreadScheduler`;
/// tests drive callbacks by hand.
pub trait GuardScheduler: Send + Sync {
    fn schedule(&self, delay: Duration, callback: Box<dyn FnOnce() + Send>);
}

pub struct ThreadScheduler;

impl GuardScheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, callback: Box<dyn FnOnce() + Send>) {
        thread::spawn(move || {
            thread::sleep(delay);
            callback();
        });
    }
}

/// Kernel control file locations. Part of the external contract; only tests
/// point these elsewhere.
#[derive(Debug, Clone)]
pub struct PowerPaths {
    pub state_extended: PathBuf,
    pub power_state: PathBuf,
    pub touch_recovery: PathBuf,
}

impl Default for PowerPaths {
    fn default() -> Self {
        Self {
            state_extended: PathBuf::from(STATE_EXTENDED_FILE),
            power_state: PathBuf::from(POWER_STATE_FILE),
            touch_recovery: PathBuf::from(TOUCH_RECOVERY_NODE),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PowerTiming {
    /// Settle delay between flagging state-extended and writing "mem".
    pub settle: Duration,
    /// Kernel catch-up delay during resume.
    pub resume_settle: Duration,
    pub guard_delay: Duration,
}

impl Default for PowerTiming {
    fn default() -> Self {
        Self {
            settle: SUSPEND_SETTLE,
            resume_settle: RESUME_SETTLE,
            guard_delay: GUARD_DELAY,
        }
    }
}

struct Shared {
    state: PowerState,
    retries: u32,
    /// Bumped whenever a new guard is scheduled or a resume cancels the
    /// outstanding one; a firing guard with a stale generation is dead.
    guard_generation: u64,
}

#[derive(Clone)]
pub struct PowerController {
    paths: Arc<PowerPaths>,
    timing: PowerTiming,
    scheduler: Arc<dyn GuardScheduler>,
    shared: Arc<Mutex<Shared>>,
}

impl PowerController {
    pub fn new() -> Self {
        Self::with_config(PowerPaths::default(), PowerTiming::default(), Arc::new(ThreadScheduler))
    }

    pub fn with_config(
        paths: PowerPaths,
        timing: PowerTiming,
        scheduler: Arc<dyn GuardScheduler>,
    ) -> Self {
        Self {
            paths: Arc::new(paths),
            timing,
            scheduler,
            shared: Arc::new(Mutex::new(Shared {
                state: PowerState::Awake,
                retries: 0,
                guard_generation: 0,
            })),
        }
    }

    pub fn state(&self) -> PowerState {
        match self.shared.lock() {
            Ok(s) => s.state,
            Err(_) => PowerState::Awake,
        }
    }

    /// Wakeups seen since the last confirmed resume (or fresh suspend).
    pub fn spurious_wakeups(&self) -> u32 {
        match self.shared.lock() {
            Ok(s) => s.retries,
            Err(_) => 0,
        }
    }

    /// Execute the suspend sequence. Returns once the hardware has woken
    /// again (the "mem" write blocks for the duration of real sleep), or
    /// early with `false` if any step failed and the device never slept.
    pub fn suspend(&self) -> bool {
        {
            let Ok(mut s) = self.shared.lock() else {
                return false;
            };
            if s.state == PowerState::Awake {
                // Fresh cycle requested by the power policy, not a guard
                // retry: the wakeup ledger starts over.
                s.retries = 0;
            }
            s.state = PowerState::Suspending;
        }

        log::info!("Entering suspend");

        if !write_control(&self.paths.state_extended, "1") {
            self.settle_awake();
            return false;
        }

        thread::sleep(self.timing.settle);
        flush_buffers();

        // Blocks until the hardware wakes.
        if !write_control(&self.paths.power_state, "mem") {
            // Roll the extended-suspend flag back so the kernel is not left
            // half-quiesced.
            write_control(&self.paths.state_extended, "0");
            self.settle_awake();
            return false;
        }

        let (generation, wakeups) = {
            let Ok(mut s) = self.shared.lock() else {
                return false;
            };
            s.retries += 1;
            s.state = PowerState::AsleepOrRetrying;
            s.guard_generation += 1;
            (s.guard_generation, s.retries)
        };

        if wakeups > 1 {
            log::error!("Spurious wakeup #{} (no resume confirmed yet)", wakeups);
        } else {
            log::warn!("Woke from suspend; waiting for the resume confirmation");
        }

        let controller = self.clone();
        self.scheduler.schedule(
            self.timing.guard_delay,
            Box::new(move || controller.guard_fired(generation)),
        );

        true
    }

    /// Confirmed resume from the power policy: cancel the guard, clear the
    /// wakeup ledger, unflag extended suspend and unstick the IR touch
    /// controller.
    pub fn resume(&self) -> bool {
        {
            let Ok(mut s) = self.shared.lock() else {
                return false;
            };
            s.guard_generation += 1;
            s.retries = 0;
            s.state = PowerState::Awake;
        }

        log::info!("Resume confirmed");

        let ok = write_control(&self.paths.state_extended, "0");

        thread::sleep(self.timing.resume_settle);

        if !write_control(&self.paths.touch_recovery, "a") {
            log::debug!("No touch recovery node on this model");
        }

        ok
    }

    fn settle_awake(&self) {
        if let Ok(mut s) = self.shared.lock() {
            s.state = PowerState::Awake;
        }
    }

    fn guard_fired(&self, generation: u64) {
        let retry = {
            let Ok(mut s) = self.shared.lock() else {
                return;
            };
            if s.guard_generation != generation {
                log::debug!("Cancelled wakeup guard fired; ignoring");
                return;
            }
            if s.retries == 0 {
                // An explicit resume cleared the ledger between scheduling
                // and firing.
                false
            } else if s.retries > MAX_SPURIOUS_RETRIES {
                log::error!(
                    "{} spurious wakeups exceed the retry bound; leaving the device awake",
                    s.retries
                );
                s.state = PowerState::Awake;
                false
            } else {
                true
            }
        };

        if retry {
            log::warn!("Wakeup not confirmed by a resume; suspending again");
            self.suspend();
        }
    }
}

impl Default for PowerController {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a plain-text value to a sysfs control file. The file is opened
/// without create/truncate, written and closed. Failures are logged and
/// reported as `false`.
fn write_control(path: &Path, value: &str) -> bool {
    let mut file = match std::fs::OpenOptions::new().write(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            log::warn!("Cannot open {} for writing: {}", path.display(), e);
            return false;
        }
    };
    match file.write_all(value.as_bytes()) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Writing '{}' to {} failed: {}", value, path.display(), e);
            false
        }
    }
}

/// Flush filesystem buffers before cutting power to the storage path.
/// Best-effort; the exit status is intentionally ignored.
fn flush_buffers() {
    let _ = Command::new("sync").status();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Scheduler that queues callbacks for explicit firing.
    #[derive(Clone, Default)]
    struct ManualScheduler {
        queue: Arc<Mutex<Vec<Box<dyn FnOnce() + Send>>>>,
    }

    impl GuardScheduler for ManualScheduler {
        fn schedule(&self, _delay: Duration, callback: Box<dyn FnOnce() + Send>) {
            self.queue.lock().unwrap().push(callback);
        }
    }

    impl ManualScheduler {
        fn fire_next(&self) -> bool {
            let callback = {
                let mut q = self.queue.lock().unwrap();
                if q.is_empty() {
                    return false;
                }
                q.remove(0)
            };
            callback();
            true
        }

        fn pending(&self) -> usize {
            self.queue.lock().unwrap().len()
        }
    }

    const ZERO_TIMING: PowerTiming = PowerTiming {
        settle: Duration::ZERO,
        resume_settle: Duration::ZERO,
        guard_delay: Duration::ZERO,
    };

    fn sysfs_fixture(tag: &str) -> (PowerPaths, PathBuf) {
        let dir = std::env::temp_dir().join(format!("ntx-hal-power-{}-{}", tag, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let paths = PowerPaths {
            state_extended: dir.join("state-extended"),
            power_state: dir.join("state"),
            touch_recovery: dir.join("neocmd"),
        };
        for p in [&paths.state_extended, &paths.power_state, &paths.touch_recovery] {
            std::fs::write(p, "").unwrap();
        }
        (paths, dir)
    }

    fn controller(tag: &str) -> (PowerController, ManualScheduler, PowerPaths, PathBuf) {
        let (paths, dir) = sysfs_fixture(tag);
        let scheduler = ManualScheduler::default();
        let ctrl =
            PowerController::with_config(paths.clone(), ZERO_TIMING, Arc::new(scheduler.clone()));
        (ctrl, scheduler, paths, dir)
    }

    #[test]
    fn suspend_writes_the_control_sequence() {
        let (ctrl, scheduler, paths, dir) = controller("sequence");

        assert!(ctrl.suspend());
        assert_eq!(std::fs::read_to_string(&paths.state_extended).unwrap(), "1");
        assert_eq!(std::fs::read_to_string(&paths.power_state).unwrap(), "mem");
        assert_eq!(ctrl.state(), PowerState::AsleepOrRetrying);
        assert_eq!(ctrl.spurious_wakeups(), 1);
        assert_eq!(scheduler.pending(), 1);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn extended_suspend_failure_short_circuits() {
        let (paths, dir) = sysfs_fixture("short-circuit");
        std::fs::write(&paths.power_state, "none").unwrap();
        let broken = PowerPaths {
            state_extended: dir.join("missing").join("state-extended"),
            ..paths.clone()
        };
        let scheduler = ManualScheduler::default();
        let ctrl = PowerController::with_config(broken, ZERO_TIMING, Arc::new(scheduler.clone()));

        assert!(!ctrl.suspend());
        // The power state file was never touched.
        assert_eq!(std::fs::read_to_string(&paths.power_state).unwrap(), "none");
        assert_eq!(ctrl.state(), PowerState::Awake);
        assert_eq!(scheduler.pending(), 0);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn power_state_failure_rolls_back_the_flag() {
        let (paths, dir) = sysfs_fixture("rollback");
        let broken = PowerPaths {
            power_state: dir.join("missing").join("state"),
            ..paths.clone()
        };
        let scheduler = ManualScheduler::default();
        let ctrl = PowerController::with_config(broken, ZERO_TIMING, Arc::new(scheduler));

        assert!(!ctrl.suspend());
        assert_eq!(std::fs::read_to_string(&paths.state_extended).unwrap(), "0");
        assert_eq!(ctrl.state(), PowerState::Awake);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn guard_retries_until_the_bound() {
        let (ctrl, scheduler, _paths, dir) = controller("bound");

        assert!(ctrl.suspend());

        let mut guard_fires = 0;
        while scheduler.fire_next() {
            guard_fires += 1;
            assert!(guard_fires <= 50, "guard loop never terminated");
        }

        // Wakeups 1..=20 are retried; the 21st guard firing sees the bound
        // exceeded and leaves the device awake.
        assert_eq!(guard_fires, 21);
        assert_eq!(ctrl.spurious_wakeups(), 21);
        assert_eq!(ctrl.state(), PowerState::Awake);
        assert_eq!(scheduler.pending(), 0);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn fresh_suspend_resets_the_ledger_after_giving_up() {
        let (ctrl, scheduler, _paths, dir) = controller("fresh");

        assert!(ctrl.suspend());
        while scheduler.fire_next() {}
        assert_eq!(ctrl.spurious_wakeups(), 21);

        assert!(ctrl.suspend());
        assert_eq!(ctrl.spurious_wakeups(), 1);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn resume_clears_state_and_cancels_the_guard() {
        let (ctrl, scheduler, paths, dir) = controller("resume");

        // A few spurious cycles first.
        assert!(ctrl.suspend());
        scheduler.fire_next();
        scheduler.fire_next();
        assert_eq!(ctrl.spurious_wakeups(), 3);

        assert!(ctrl.resume());
        assert_eq!(ctrl.spurious_wakeups(), 0);
        assert_eq!(ctrl.state(), PowerState::Awake);
        assert_eq!(std::fs::read_to_string(&paths.state_extended).unwrap(), "0");
        assert_eq!(std::fs::read_to_string(&paths.touch_recovery).unwrap(), "a");

        // The outstanding guard is stale: firing it neither retries nor
        // schedules anything new.
        assert_eq!(scheduler.pending(), 1);
        scheduler.fire_next();
        assert_eq!(ctrl.spurious_wakeups(), 0);
        assert_eq!(ctrl.state(), PowerState::Awake);
        assert_eq!(scheduler.pending(), 0);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn resume_reports_flag_write_failure_softly() {
        let (paths, dir) = sysfs_fixture("resume-soft");
        let broken = PowerPaths {
            state_extended: dir.join("missing").join("state-extended"),
            ..paths
        };
        let ctrl =
            PowerController::with_config(broken, ZERO_TIMING, Arc::new(ManualScheduler::default()));

        assert!(!ctrl.resume());
        assert_eq!(ctrl.state(), PowerState::Awake);

        let _ = std::fs::remove_dir_all(dir);
    }
}
