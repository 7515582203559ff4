//! Per-model descriptors.
//!
//! One fully-populated `BASE` plus small per-model overrides, merged with
//! struct-update syntax into flat immutable consts.

use super::{DeviceVariant, FrontlightPaths, NaturalLight, TouchProtocol, Viewport};

const MSP430_FRONTLIGHT: FrontlightPaths = FrontlightPaths {
    white: Some("/sys/class/backlight/mxc_msp430.0/brightness"),
    red: None,
    green: None,
    mixer: None,
};

const BASE: DeviceVariant = DeviceVariant {
    model: "Kobo",
    display_dpi: 167,
    screen_width: 600,
    screen_height: 800,
    viewport: None,

    has_frontlight: true,
    has_multitouch: true,
    has_keys: false,
    can_invert_display: true,
    can_toggle_gsensor: false,

    touch_switch_xy: Some(true),
    touch_mirror_x: false,

    protocol: TouchProtocol::None,
    probe_ev_epoch_time: true,

    frontlight: Some(MSP430_FRONTLIGHT),
    natural_light: None,
};

/// Kobo Touch A/B/C. Infrared grid, single touch, a real home key, and a
/// panel revision that cannot be identified without probing.
pub const TRILOGY: DeviceVariant = DeviceVariant {
    model: "Kobo Touch",
    has_frontlight: false,
    has_multitouch: false,
    has_keys: true,
    touch_switch_xy: None,
    frontlight: None,
    ..BASE
};

/// Kobo Mini. 5" panel, same generation as the Touch.
pub const PIXIE: DeviceVariant = DeviceVariant {
    model: "Kobo Mini",
    display_dpi: 200,
    has_frontlight: false,
    has_multitouch: false,
    touch_mirror_x: true,
    frontlight: None,
    ..BASE
};

/// Kobo Aura HD.
pub const DRAGON: DeviceVariant = DeviceVariant {
    model: "Kobo Aura HD",
    display_dpi: 265,
    screen_width: 1080,
    screen_height: 1440,
    touch_mirror_x: true,
    ..BASE
};

/// Kobo Aura. The bezel masks a border of the panel, and the touch
/// controller speaks its own MT framing.
pub const PHOENIX: DeviceVariant = DeviceVariant {
    model: "Kobo Aura",
    display_dpi: 212,
    screen_width: 758,
    screen_height: 1024,
    viewport: Some(Viewport {
        x: 6,
        y: 12,
        w: 752,
        h: 1008,
    }),
    touch_mirror_x: true,
    protocol: TouchProtocol::Phoenix,
    ..BASE
};

/// Kobo Aura H2O.
pub const DAHLIA: DeviceVariant = DeviceVariant {
    model: "Kobo Aura H2O",
    display_dpi: 265,
    screen_width: 1080,
    screen_height: 1440,
    touch_mirror_x: true,
    ..BASE
};

/// Kobo Glo HD. Tracking IDs arrive off by one from the kernel.
pub const ALYSSUM: DeviceVariant = DeviceVariant {
    model: "Kobo Glo HD",
    display_dpi: 300,
    screen_width: 1072,
    screen_height: 1448,
    protocol: TouchProtocol::Alyssum,
    ..BASE
};

/// Kobo Touch 2.0. Glo HD electronics behind a Touch-class panel.
pub const PIKA: DeviceVariant = DeviceVariant {
    model: "Kobo Touch 2.0",
    has_frontlight: false,
    protocol: TouchProtocol::Alyssum,
    frontlight: None,
    ..BASE
};

/// Kobo Aura One.
pub const DAYLIGHT: DeviceVariant = DeviceVariant {
    model: "Kobo Aura One",
    display_dpi: 300,
    screen_width: 1404,
    screen_height: 1872,
    probe_ev_epoch_time: false,
    natural_light: Some(NaturalLight {
        min: 0,
        max: 10,
        inverted: false,
    }),
    ..BASE
};

/// Kobo Aura H2O Edition 2.
pub const SNOW: DeviceVariant = DeviceVariant {
    model: "Kobo Aura H2O Edition 2",
    display_dpi: 265,
    screen_width: 1080,
    screen_height: 1440,
    touch_mirror_x: true,
    protocol: TouchProtocol::Snow,
    frontlight: Some(FrontlightPaths {
        white: Some("/sys/class/backlight/lm3630a_led1b"),
        red: Some("/sys/class/backlight/lm3630a_led1a"),
        green: Some("/sys/class/backlight/lm3630a_ledb"),
        mixer: None,
    }),
    natural_light: Some(NaturalLight {
        min: 0,
        max: 10,
        inverted: false,
    }),
    ..BASE
};

/// Kobo Aura H2O Edition 2, Rev 2. Same shell, new touch controller and a
/// two-channel frontlight without the green mixer.
pub const SNOW_REV2: DeviceVariant = DeviceVariant {
    model: "Kobo Aura H2O Edition 2 Rev 2",
    frontlight: Some(FrontlightPaths {
        white: Some("/sys/class/backlight/lm3630a_ledb"),
        red: Some("/sys/class/backlight/lm3630a_leda"),
        green: None,
        mixer: None,
    }),
    protocol: TouchProtocol::None,
    ..SNOW
};

/// Kobo Aura Edition 2.
pub const STAR: DeviceVariant = DeviceVariant {
    model: "Kobo Aura Edition 2",
    display_dpi: 212,
    screen_width: 758,
    screen_height: 1024,
    touch_mirror_x: true,
    protocol: TouchProtocol::Phoenix,
    ..BASE
};

/// Kobo Aura Edition 2, Rev 2.
pub const STAR_REV2: DeviceVariant = DeviceVariant {
    model: "Kobo Aura Edition 2 Rev 2",
    protocol: TouchProtocol::None,
    ..STAR
};

/// Kobo Clara HD.
pub const NOVA: DeviceVariant = DeviceVariant {
    model: "Kobo Clara HD",
    display_dpi: 300,
    screen_width: 1072,
    screen_height: 1448,
    protocol: TouchProtocol::Snow,
    probe_ev_epoch_time: false,
    frontlight: Some(FrontlightPaths {
        white: Some("/sys/class/backlight/mxc_msp430.0/brightness"),
        red: None,
        green: None,
        mixer: Some("/sys/class/backlight/lm3630a_led"),
    }),
    natural_light: Some(NaturalLight {
        min: 0,
        max: 10,
        inverted: true,
    }),
    ..BASE
};

/// Kobo Forma. Page-turn keys and a gravity sensor.
pub const FROST: DeviceVariant = DeviceVariant {
    model: "Kobo Forma",
    display_dpi: 300,
    screen_width: 1440,
    screen_height: 1920,
    has_keys: true,
    can_toggle_gsensor: true,
    protocol: TouchProtocol::Snow,
    probe_ev_epoch_time: false,
    frontlight: Some(FrontlightPaths {
        white: Some("/sys/class/backlight/mxc_msp430.0/brightness"),
        red: None,
        green: None,
        mixer: Some("/sys/class/backlight/lm3630a_led"),
    }),
    natural_light: Some(NaturalLight {
        min: 0,
        max: 10,
        inverted: true,
    }),
    ..BASE
};

/// Kobo Libra H2O.
pub const STORM: DeviceVariant = DeviceVariant {
    model: "Kobo Libra H2O",
    display_dpi: 300,
    screen_width: 1264,
    screen_height: 1680,
    has_keys: true,
    can_toggle_gsensor: true,
    protocol: TouchProtocol::Snow,
    probe_ev_epoch_time: false,
    frontlight: Some(FrontlightPaths {
        white: Some("/sys/class/backlight/mxc_msp430.0/brightness"),
        red: None,
        green: None,
        mixer: Some("/sys/class/backlight/lm3630a_led"),
    }),
    natural_light: Some(NaturalLight {
        min: 0,
        max: 10,
        inverted: true,
    }),
    ..BASE
};
