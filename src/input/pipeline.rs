//! Event adjustment pipeline.
//!
//! An ordered chain of named transform hooks applied in place to every raw
//! input event before it reaches the upper dispatcher. The chain is built
//! once from the resolved device descriptor; relative hook order is fixed,
//! only inclusion varies per device.
//!
//! Panels whose axis orientation cannot be known a priori get an
//! unfinalized pipeline: axis hooks are added later by the calibration
//! probe (see `input::calibrate`), and events arriving in the window are
//! buffered or dropped per `PendingInputPolicy`.

use std::time::Duration;

use crate::input::event::{
    EventTime, RawInputEvent, ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_TRACKING_ID, ABS_X,
    ABS_Y, EV_ABS, EV_MSC, MSC_RAW, MSC_RAW_GSENSOR_BACK, MSC_RAW_GSENSOR_FRONT,
    MSC_RAW_GSENSOR_LANDSCAPE_LEFT, MSC_RAW_GSENSOR_LANDSCAPE_RIGHT,
    MSC_RAW_GSENSOR_PORTRAIT_DOWN, MSC_RAW_GSENSOR_PORTRAIT_UP,
};
use crate::settings::Settings;
use crate::variant::{DeviceVariant, TouchProtocol};

/// Events timestamped further than this behind wall-clock "now" are judged
/// boot-relative. Empirical constant; override through `PipelineOptions`
/// only with evidence.
pub const DEFAULT_EPOCH_DRIFT_THRESHOLD: Duration = Duration::from_secs(600);

/// Normalized gravity-sensor orientations emitted in place of the raw
/// `MSC_RAW` codes.
pub const GYRO_PORTRAIT_DOWN: i32 = 0;
pub const GYRO_PORTRAIT_UP: i32 = 1;
pub const GYRO_LANDSCAPE_RIGHT: i32 = 2;
pub const GYRO_LANDSCAPE_LEFT: i32 = 3;
pub const GYRO_FACE_BACK: i32 = 4;
pub const GYRO_FACE_FRONT: i32 = 5;

/// What to do with input that arrives before the pipeline is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingInputPolicy {
    /// Hold raw events and replay them through the full chain once the
    /// calibration decision is in.
    #[default]
    Buffer,
    /// Drop them.
    Discard,
}

/// Outcome of pushing one event through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Event was adjusted in place and should be dispatched.
    Forward,
    /// Pipeline is not finalized yet; the event was buffered or dropped.
    Held,
}

/// Timestamp classification state of the epoch probe. The transition out of
/// `Unprobed` happens at most once per process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochState {
    Unprobed,
    ProbedBootRelative,
    ProbedEpochCorrect,
}

#[derive(Debug)]
enum HookKind {
    SwitchXy,
    MirrorX { width: i32 },
    AlyssumTrackingId,
    EpochGuard { state: EpochState, threshold: Duration },
    GyroTranslate,
}

/// One named transform in the chain, optionally closed over a fixed
/// parameter (screen width for mirroring, threshold for the epoch probe).
#[derive(Debug)]
pub struct AdjustHook {
    name: &'static str,
    kind: HookKind,
}

impl AdjustHook {
    fn switch_xy() -> Self {
        Self {
            name: "switch-xy",
            kind: HookKind::SwitchXy,
        }
    }

    fn mirror_x(width: i32) -> Self {
        Self {
            name: "mirror-x",
            kind: HookKind::MirrorX { width },
        }
    }

    fn alyssum_tracking_id() -> Self {
        Self {
            name: "alyssum-tracking-id",
            kind: HookKind::AlyssumTrackingId,
        }
    }

    fn epoch_guard(threshold: Duration) -> Self {
        Self {
            name: "epoch-guard",
            kind: HookKind::EpochGuard {
                state: EpochState::Unprobed,
                threshold,
            },
        }
    }

    fn gyro_translate() -> Self {
        Self {
            name: "gyro-translate",
            kind: HookKind::GyroTranslate,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&mut self, ev: &mut RawInputEvent, now: EventTime) {
        match &mut self.kind {
            HookKind::SwitchXy => {
                if ev.ev_type == EV_ABS {
                    ev.code = match ev.code {
                        ABS_X => ABS_Y,
                        ABS_Y => ABS_X,
                        ABS_MT_POSITION_X => ABS_MT_POSITION_Y,
                        ABS_MT_POSITION_Y => ABS_MT_POSITION_X,
                        other => other,
                    };
                }
            }
            HookKind::MirrorX { width } => {
                if ev.ev_type == EV_ABS && (ev.code == ABS_X || ev.code == ABS_MT_POSITION_X) {
                    ev.value = *width - ev.value;
                }
            }
            HookKind::AlyssumTrackingId => {
                ev.time = now;
                if ev.ev_type == EV_ABS && ev.code == ABS_MT_TRACKING_ID {
                    ev.value -= 1;
                }
            }
            HookKind::EpochGuard { state, threshold } => match state {
                EpochState::Unprobed => {
                    let lag = now.as_duration().saturating_sub(ev.time.as_duration());
                    if lag > *threshold {
                        log::info!(
                            "Event timestamps lag wall clock by {}s: treating them as boot-relative",
                            lag.as_secs()
                        );
                        *state = EpochState::ProbedBootRelative;
                        ev.time = now;
                    } else {
                        *state = EpochState::ProbedEpochCorrect;
                    }
                }
                EpochState::ProbedBootRelative => ev.time = now,
                EpochState::ProbedEpochCorrect => {}
            },
            HookKind::GyroTranslate => {
                if ev.ev_type == EV_MSC && ev.code == MSC_RAW {
                    let translated = match ev.value {
                        MSC_RAW_GSENSOR_PORTRAIT_DOWN => Some(GYRO_PORTRAIT_DOWN),
                        MSC_RAW_GSENSOR_PORTRAIT_UP => Some(GYRO_PORTRAIT_UP),
                        MSC_RAW_GSENSOR_LANDSCAPE_RIGHT => Some(GYRO_LANDSCAPE_RIGHT),
                        MSC_RAW_GSENSOR_LANDSCAPE_LEFT => Some(GYRO_LANDSCAPE_LEFT),
                        MSC_RAW_GSENSOR_BACK => Some(GYRO_FACE_BACK),
                        MSC_RAW_GSENSOR_FRONT => Some(GYRO_FACE_FRONT),
                        _ => None,
                    };
                    if let Some(v) = translated {
                        ev.value = v;
                    }
                }
            }
        }
    }
}

/// Knobs that rarely change; `Default` is what production uses.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub pending_policy: PendingInputPolicy,
    pub epoch_threshold: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            pending_policy: PendingInputPolicy::default(),
            epoch_threshold: DEFAULT_EPOCH_DRIFT_THRESHOLD,
        }
    }
}

struct Deferred {
    policy: PendingInputPolicy,
    held: Vec<RawInputEvent>,
    invert_axes: bool,
    mirror_x: bool,
    width: i32,
}

pub struct EventPipeline {
    hooks: Vec<AdjustHook>,
    protocol: TouchProtocol,
    deferred: Option<Deferred>,
}

impl EventPipeline {
    pub fn new(variant: &DeviceVariant, settings: &Settings) -> Self {
        Self::with_options(variant, settings, PipelineOptions::default())
    }

    pub fn with_options(
        variant: &DeviceVariant,
        settings: &Settings,
        options: PipelineOptions,
    ) -> Self {
        let mut hooks = Vec::new();
        let mut deferred = None;

        match variant.touch_switch_xy {
            Some(switch_xy) => {
                if switch_xy != settings.invert_touch_axes {
                    hooks.push(AdjustHook::switch_xy());
                }
                if variant.touch_mirror_x {
                    hooks.push(AdjustHook::mirror_x(variant.screen_width));
                }
            }
            None => {
                deferred = Some(Deferred {
                    policy: options.pending_policy,
                    held: Vec::new(),
                    invert_axes: settings.invert_touch_axes,
                    mirror_x: variant.touch_mirror_x,
                    width: variant.screen_width,
                });
                log::info!(
                    "Axis orientation unknown for {}; deferring axis hooks until calibration",
                    variant.model
                );
            }
        }

        if variant.protocol == TouchProtocol::Alyssum {
            hooks.push(AdjustHook::alyssum_tracking_id());
        }
        if variant.probe_ev_epoch_time {
            hooks.push(AdjustHook::epoch_guard(options.epoch_threshold));
        }
        if variant.can_toggle_gsensor && !settings.ignore_accelerometer {
            hooks.push(AdjustHook::gyro_translate());
        }

        let pipeline = Self {
            hooks,
            protocol: variant.protocol,
            deferred,
        };
        log::debug!("Adjustment hooks: [{}]", pipeline.hook_names().join(", "));
        pipeline
    }

    /// Pipeline-wide decoding marker for the upper dispatcher.
    pub fn protocol(&self) -> TouchProtocol {
        self.protocol
    }

    pub fn hook_names(&self) -> Vec<&'static str> {
        self.hooks.iter().map(AdjustHook::name).collect()
    }

    /// True while axis hooks are still waiting on the calibration decision.
    pub fn needs_finalize(&self) -> bool {
        self.deferred.is_some()
    }

    /// Adjust one raw event in place.
    pub fn apply(&mut self, ev: &mut RawInputEvent) -> Disposition {
        self.apply_at(ev, EventTime::now())
    }

    /// Same as `apply`, with the wall clock injected.
    pub fn apply_at(&mut self, ev: &mut RawInputEvent, now: EventTime) -> Disposition {
        if let Some(deferred) = &mut self.deferred {
            if deferred.policy == PendingInputPolicy::Buffer {
                deferred.held.push(*ev);
            }
            return Disposition::Held;
        }

        for hook in &mut self.hooks {
            hook.apply(ev, now);
        }
        Disposition::Forward
    }

    /// Install the deferred axis hooks with the calibrated decision and
    /// replay anything held during the probe window. Returns the adjusted
    /// held events, ready for dispatch. No-op once finalized.
    pub fn finalize(&mut self, switch_xy: bool) -> Vec<RawInputEvent> {
        let Some(deferred) = self.deferred.take() else {
            return Vec::new();
        };

        let mut axis_hooks = Vec::new();
        if switch_xy != deferred.invert_axes {
            axis_hooks.push(AdjustHook::switch_xy());
        }
        if deferred.mirror_x {
            axis_hooks.push(AdjustHook::mirror_x(deferred.width));
        }
        self.hooks.splice(0..0, axis_hooks);

        log::info!(
            "Pipeline finalized (switch_xy={}), hooks: [{}], replaying {} held event(s)",
            switch_xy,
            self.hook_names().join(", "),
            deferred.held.len()
        );

        let mut replay = deferred.held;
        let now = EventTime::now();
        for ev in &mut replay {
            for hook in &mut self.hooks {
                hook.apply(ev, now);
            }
        }
        replay
    }
}
