//! Device identity sources.
//!
//! The codename comes from the `PRODUCT` environment hint, falling back to
//! the vendor config script. The product id comes from `MODEL_NUMBER`,
//! falling back to the last three characters of the on-board version file
//! (and to a `"000"` sentinel when that file is absent).

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

pub const VENDOR_CONFIG_SCRIPT: &str = "/bin/kobo_config.sh";
pub const VERSION_FILE: &str = "/mnt/onboard/.kobo/version";

/// Fallback product id when the version file is missing.
pub const PRODUCT_ID_SENTINEL: &str = "000";

/// Resolved hardware identity strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub codename: String,
    pub product_id: String,
    pub firmware: Option<String>,
}

impl DeviceIdentity {
    /// Detect the identity from the environment, with script/file fallbacks.
    pub fn detect() -> Result<Self> {
        let codename = std::env::var("PRODUCT").ok();
        let product_id = std::env::var("MODEL_NUMBER").ok();
        Self::detect_with(codename.as_deref(), product_id.as_deref())
    }

    /// Detect with explicit hints (CLI args or environment) taking
    /// precedence over the script/file fallbacks.
    pub fn detect_with(
        codename_hint: Option<&str>,
        product_id_hint: Option<&str>,
    ) -> Result<Self> {
        Self::detect_inner(codename_hint, product_id_hint, Path::new(VERSION_FILE))
    }

    fn detect_inner(
        codename_hint: Option<&str>,
        product_id_hint: Option<&str>,
        version_file: &Path,
    ) -> Result<Self> {
        let codename = match codename_hint.map(str::trim).filter(|s| !s.is_empty()) {
            Some(v) => v.to_string(),
            None => query_vendor_script()?,
        };

        let version = std::fs::read_to_string(version_file).ok();

        let product_id = match product_id_hint.map(str::trim).filter(|s| !s.is_empty()) {
            Some(v) => v.to_string(),
            None => version
                .as_deref()
                .map(product_id_from_version)
                .unwrap_or_else(|| PRODUCT_ID_SENTINEL.to_string()),
        };

        let firmware = version.as_deref().and_then(firmware_from_version);
        if let Some(ref fw) = firmware {
            log::debug!("Firmware revision: {}", fw);
        }

        log::info!("Device identity: codename={}, product_id={}", codename, product_id);
        Ok(Self {
            codename,
            product_id,
            firmware,
        })
    }
}

fn query_vendor_script() -> Result<String> {
    let output = Command::new(VENDOR_CONFIG_SCRIPT)
        .output()
        .map_err(|e| Error::Identity(format!("{}: {}", VENDOR_CONFIG_SCRIPT, e)))?;

    if !output.status.success() {
        return Err(Error::Identity(format!(
            "{} exited with {}",
            VENDOR_CONFIG_SCRIPT, output.status
        )));
    }

    let codename = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if codename.is_empty() {
        return Err(Error::Identity("vendor script returned no codename".into()));
    }

    log::debug!("Codename from vendor script: {}", codename);
    Ok(codename)
}

/// Last three characters of the version file content.
pub fn product_id_from_version(content: &str) -> String {
    let trimmed = content.trim();
    let start = trimmed
        .char_indices()
        .rev()
        .nth(2)
        .map(|(i, _)| i)
        .unwrap_or(0);
    trimmed[start..].to_string()
}

/// The version file is a comma-separated record; field 3 carries the
/// firmware revision string.
pub fn firmware_from_version(content: &str) -> Option<String> {
    content
        .trim()
        .split(',')
        .nth(2)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERSION_SAMPLE: &str = "N905B6A029,3.0.35+,4.31.19086,3.0.35+,3.0.35+,00000000-0000-0000-0000-000000000378";

    #[test]
    fn product_id_is_last_three_chars() {
        assert_eq!(product_id_from_version(VERSION_SAMPLE), "378");
        assert_eq!(product_id_from_version("xy\n"), "xy");
        assert_eq!(product_id_from_version(""), "");
    }

    #[test]
    fn firmware_is_third_field() {
        assert_eq!(
            firmware_from_version(VERSION_SAMPLE).as_deref(),
            Some("4.31.19086")
        );
        assert_eq!(firmware_from_version("a,b"), None);
    }

    #[test]
    fn hints_take_precedence_over_fallbacks() {
        let path = std::env::temp_dir().join(format!("ntx-hal-version-{}", std::process::id()));
        std::fs::write(&path, VERSION_SAMPLE).unwrap();

        let id = DeviceIdentity::detect_inner(Some("snow"), Some("379"), &path).unwrap();
        assert_eq!(id.codename, "snow");
        assert_eq!(id.product_id, "379");

        // Without a product hint, the version file supplies the id.
        let id = DeviceIdentity::detect_inner(Some("snow"), None, &path).unwrap();
        assert_eq!(id.product_id, "378");
        assert_eq!(id.firmware.as_deref(), Some("4.31.19086"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn absent_version_file_yields_the_sentinel() {
        let path = std::env::temp_dir().join("ntx-hal-version-definitely-missing");
        let id = DeviceIdentity::detect_inner(Some("snow"), None, &path).unwrap();
        assert_eq!(id.product_id, PRODUCT_ID_SENTINEL);
        assert_eq!(id.firmware, None);
    }
}
