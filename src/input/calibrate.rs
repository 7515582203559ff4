//! Touch calibration probe.
//!
//! Some panel revisions share a codename and cannot reveal their axis
//! orientation a priori. For those, the pipeline stays unfinalized until a
//! decision exists: either a persisted one from an earlier run, or the
//! result of an interactive probe run synchronously on the UI thread. The
//! finalization barrier is one-shot; re-entry is a no-op.

use crate::input::event::RawInputEvent;
use crate::input::pipeline::EventPipeline;
use crate::settings::SettingsStore;
use crate::variant::DeviceVariant;

/// Interactive side of the probe, supplied by the application. Blocks until
/// the user has answered (e.g. tapped a marked corner).
pub trait CalibrationUi {
    fn probe_switch_xy(&mut self, variant: &DeviceVariant) -> bool;
}

/// A `CalibrationUi` that answers from a fixed value. Useful for headless
/// tools and tests.
pub struct FixedCalibration(pub bool);

impl CalibrationUi for FixedCalibration {
    fn probe_switch_xy(&mut self, _variant: &DeviceVariant) -> bool {
        self.0
    }
}

/// Finalize the pipeline if it still needs it, resolving the axis-swap
/// decision from persisted settings or, failing that, the interactive
/// probe. The freshly probed decision is persisted; a write failure is
/// logged and does not block finalization.
///
/// Returns the events held during the probe window, already adjusted and
/// ready for dispatch (empty under the discard policy or when the pipeline
/// was already final).
pub fn ensure_finalized(
    pipeline: &mut EventPipeline,
    variant: &DeviceVariant,
    store: &mut SettingsStore,
    ui: &mut dyn CalibrationUi,
) -> Vec<RawInputEvent> {
    if !pipeline.needs_finalize() {
        return Vec::new();
    }

    let switch_xy = match store.values.touch_switch_xy {
        Some(decision) => {
            log::debug!("Using persisted axis calibration: switch_xy={}", decision);
            decision
        }
        None => {
            log::info!("No persisted axis calibration; running interactive probe");
            let decision = ui.probe_switch_xy(variant);
            store.values.touch_switch_xy = Some(decision);
            if let Err(e) = store.save() {
                log::warn!(
                    "Could not persist calibration to {}: {}",
                    store.path().display(),
                    e
                );
            }
            decision
        }
    };

    pipeline.finalize(switch_xy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::event::{EventTime, ABS_X, ABS_Y, EV_ABS};
    use crate::input::pipeline::Disposition;
    use crate::settings::Settings;
    use crate::variant;
    use std::path::PathBuf;

    fn temp_settings(tag: &str) -> SettingsStore {
        let path: PathBuf = std::env::temp_dir().join(format!(
            "ntx-hal-calibrate-{}-{}.toml",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        SettingsStore::open(path)
    }

    /// Probe that counts how often it was asked.
    struct CountingUi {
        answer: bool,
        calls: usize,
    }

    impl CalibrationUi for CountingUi {
        fn probe_switch_xy(&mut self, _variant: &DeviceVariant) -> bool {
            self.calls += 1;
            self.answer
        }
    }

    #[test]
    fn probe_runs_once_and_persists() {
        let variant = variant::resolve("trilogy", "000").unwrap();
        let mut store = temp_settings("probe-once");
        let mut pipeline = EventPipeline::new(variant, &store.values);
        let mut ui = CountingUi {
            answer: true,
            calls: 0,
        };

        let now = EventTime::new(1000, 0);
        let mut ev = RawInputEvent::new(EV_ABS, ABS_Y, 3).at(now);
        assert_eq!(pipeline.apply_at(&mut ev, now), Disposition::Held);

        let replayed = ensure_finalized(&mut pipeline, variant, &mut store, &mut ui);
        assert_eq!(ui.calls, 1);
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0].code, ABS_X);
        assert_eq!(store.values.touch_switch_xy, Some(true));

        // Idempotent: the barrier never re-enters.
        let again = ensure_finalized(&mut pipeline, variant, &mut store, &mut ui);
        assert!(again.is_empty());
        assert_eq!(ui.calls, 1);

        let _ = std::fs::remove_file(store.path());
    }

    #[test]
    fn persisted_decision_skips_the_probe() {
        let variant = variant::resolve("trilogy", "000").unwrap();
        let mut store = temp_settings("persisted");
        store.values = Settings {
            touch_switch_xy: Some(false),
            ..Settings::default()
        };
        let mut pipeline = EventPipeline::new(variant, &store.values);
        let mut ui = CountingUi {
            answer: true,
            calls: 0,
        };

        ensure_finalized(&mut pipeline, variant, &mut store, &mut ui);
        assert_eq!(ui.calls, 0);
        assert!(!pipeline.needs_finalize());
        // switch_xy=false: no swap hook registered.
        assert!(!pipeline.hook_names().contains(&"switch-xy"));
    }

    #[test]
    fn finalized_pipelines_are_untouched() {
        let variant = variant::resolve("dragon", "000").unwrap();
        let mut store = temp_settings("finalized");
        let mut pipeline = EventPipeline::new(variant, &store.values);
        let mut ui = CountingUi {
            answer: false,
            calls: 0,
        };

        assert!(ensure_finalized(&mut pipeline, variant, &mut store, &mut ui).is_empty());
        assert_eq!(ui.calls, 0);
    }
}
