//! Device variant registry.
//!
//! Maps a detected hardware identity (codename + product id) to an immutable
//! capability/quirk descriptor. Resolution is a pure function and happens
//! exactly once per boot; everything downstream (pipeline construction,
//! power control, network shim) reads the resolved descriptor.

mod models;

use crate::error::{Error, Result};

/// Multitouch decoding variant expected by the upper input dispatcher.
///
/// These are pipeline-wide markers, not per-event transforms: the dispatcher
/// switches its frame decoding on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TouchProtocol {
    #[default]
    None,
    Phoenix,
    Snow,
    Alyssum,
}

/// Visible display region for panels with a bezel-masked border.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Sysfs paths of the frontlight hardware, when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontlightPaths {
    pub white: Option<&'static str>,
    pub red: Option<&'static str>,
    pub green: Option<&'static str>,
    /// Single mixer node driving warmth on devices without separate
    /// red/green channels.
    pub mixer: Option<&'static str>,
}

/// Natural-light (warmth) range parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaturalLight {
    pub min: i32,
    pub max: i32,
    pub inverted: bool,
}

/// Immutable per-model capability and quirk descriptor.
///
/// Exactly one of these is selected per process lifetime; selection never
/// changes afterwards.
#[derive(Debug, Clone, Copy)]
pub struct DeviceVariant {
    pub model: &'static str,
    pub display_dpi: u16,
    pub screen_width: i32,
    pub screen_height: i32,
    pub viewport: Option<Viewport>,

    pub has_frontlight: bool,
    pub has_multitouch: bool,
    pub has_keys: bool,
    pub can_invert_display: bool,
    pub can_toggle_gsensor: bool,

    /// Whether touch X/Y arrive transposed. `None` means the panel revision
    /// cannot be told apart a priori and a one-time calibration probe is
    /// required before the axis hooks can be registered.
    pub touch_switch_xy: Option<bool>,
    /// Whether the X axis arrives mirrored (in final-axis space).
    pub touch_mirror_x: bool,

    pub protocol: TouchProtocol,
    /// Kernels on these models may report boot-relative event timestamps;
    /// the pipeline registers the epoch probe when set.
    pub probe_ev_epoch_time: bool,

    pub frontlight: Option<FrontlightPaths>,
    pub natural_light: Option<NaturalLight>,
}

impl DeviceVariant {
    pub fn needs_touch_probe(&self) -> bool {
        self.touch_switch_xy.is_none()
    }
}

/// Resolve a detected identity to its descriptor.
///
/// Two models shipped hardware revisions sharing a codename; those are told
/// apart by product id, defaulting to the earlier revision. An unmatched
/// codename is a fatal configuration error: there is no safe guessed
/// configuration to fall back to.
pub fn resolve(codename: &str, product_id: &str) -> Result<&'static DeviceVariant> {
    let variant = match codename {
        "trilogy" => &models::TRILOGY,
        "pixie" => &models::PIXIE,
        "dragon" => &models::DRAGON,
        "phoenix" => &models::PHOENIX,
        "dahlia" => &models::DAHLIA,
        "alyssum" => &models::ALYSSUM,
        "pika" => &models::PIKA,
        "daylight" => &models::DAYLIGHT,
        "snow" if product_id == "378" => &models::SNOW_REV2,
        "snow" => &models::SNOW,
        "star" if product_id == "379" => &models::STAR_REV2,
        "star" => &models::STAR,
        "nova" => &models::NOVA,
        "frost" => &models::FROST,
        "storm" => &models::STORM,
        _ => {
            return Err(Error::UnknownDevice {
                codename: codename.to_string(),
                product_id: product_id.to_string(),
            })
        }
    };

    log::info!(
        "Resolved device: {} (codename={}, product_id={})",
        variant.model,
        codename,
        product_id
    );
    Ok(variant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snow_revisions_split_on_product_id() {
        let rev2 = resolve("snow", "378").unwrap();
        let fl = rev2.frontlight.unwrap();
        assert!(fl.white.unwrap().ends_with("lm3630a_ledb"));
        assert!(fl.red.unwrap().ends_with("lm3630a_leda"));
        assert!(fl.green.is_none());

        let base = resolve("snow", "000").unwrap();
        let fl = base.frontlight.unwrap();
        assert!(fl.white.unwrap().ends_with("lm3630a_led1b"));
        assert!(fl.green.is_some());
    }

    #[test]
    fn star_revisions_split_on_product_id() {
        assert_eq!(resolve("star", "379").unwrap().model, "Kobo Aura Edition 2 Rev 2");
        assert_eq!(resolve("star", "000").unwrap().model, "Kobo Aura Edition 2");
    }

    #[test]
    fn resolution_is_deterministic() {
        for _ in 0..3 {
            let v = resolve("alyssum", "000").unwrap();
            assert_eq!(v.protocol, TouchProtocol::Alyssum);
            assert_eq!(v.display_dpi, 300);
        }
    }

    #[test]
    fn unknown_codename_is_fatal() {
        match resolve("bogus", "000") {
            Err(Error::UnknownDevice { codename, .. }) => assert_eq!(codename, "bogus"),
            other => panic!("expected UnknownDevice, got {:?}", other.map(|v| v.model)),
        }
    }

    #[test]
    fn probe_only_where_revision_is_ambiguous() {
        assert!(resolve("trilogy", "000").unwrap().needs_touch_probe());
        assert!(!resolve("dragon", "000").unwrap().needs_touch_probe());
    }
}
