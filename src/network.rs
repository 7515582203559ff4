//! Network backend shim.
//!
//! Connectivity is owned by vendor shell scripts; this module only execs
//! them and checks exit status. Radio state is inferred from the loaded
//! kernel modules listing rather than asked of the scripts.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const ENABLE_RADIO_SCRIPT: &str = "enable-wifi.sh";
pub const DISABLE_RADIO_SCRIPT: &str = "disable-wifi.sh";
pub const OBTAIN_IP_SCRIPT: &str = "obtain-ip.sh";
pub const RELEASE_IP_SCRIPT: &str = "release-ip.sh";
pub const RESTORE_ASYNC_SCRIPT: &str = "restore-wifi-async.sh";

pub const DEFAULT_SCRIPTS_DIR: &str = "/usr/local/ntx-hal/scripts";
pub const DEFAULT_INTERFACE: &str = "eth0";
pub const DEFAULT_WIFI_MODULE: &str = "sdio_wifi_pwr";

const PROC_MODULES: &str = "/proc/modules";

pub struct NetworkBackend {
    scripts_dir: PathBuf,
    interface: String,
    wifi_module: String,
    modules_list: PathBuf,
}

impl NetworkBackend {
    /// Build from the environment hints, with defaults matching the stock
    /// firmware.
    pub fn from_env(scripts_dir: impl Into<PathBuf>) -> Self {
        let interface = std::env::var("INTERFACE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_INTERFACE.to_string());
        let wifi_module = std::env::var("WIFI_MODULE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WIFI_MODULE.to_string());
        Self::new(scripts_dir, interface, wifi_module)
    }

    pub fn new(
        scripts_dir: impl Into<PathBuf>,
        interface: impl Into<String>,
        wifi_module: impl Into<String>,
    ) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            interface: interface.into(),
            wifi_module: wifi_module.into(),
            modules_list: PathBuf::from(PROC_MODULES),
        }
    }

    #[cfg(test)]
    fn with_modules_list(mut self, path: impl Into<PathBuf>) -> Self {
        self.modules_list = path.into();
        self
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn enable_radio(&self) -> bool {
        self.run_script(ENABLE_RADIO_SCRIPT)
    }

    pub fn disable_radio(&self) -> bool {
        self.run_script(DISABLE_RADIO_SCRIPT)
    }

    pub fn obtain_ip(&self) -> bool {
        self.run_script(OBTAIN_IP_SCRIPT)
    }

    pub fn release_ip(&self) -> bool {
        self.run_script(RELEASE_IP_SCRIPT)
    }

    /// Kick the connection-restore script and return immediately; it
    /// reconnects in its own time.
    pub fn restore_connection_async(&self) {
        let path = self.scripts_dir.join(RESTORE_ASYNC_SCRIPT);
        match Command::new(&path)
            .env("INTERFACE", &self.interface)
            .env("WIFI_MODULE", &self.wifi_module)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(_child) => log::debug!("Spawned {}", path.display()),
            Err(e) => log::warn!("Could not spawn {}: {}", path.display(), e),
        }
    }

    /// Whether the Wi-Fi driver module is currently loaded.
    pub fn is_radio_enabled(&self) -> bool {
        module_loaded(&self.modules_list, &self.wifi_module)
    }

    fn run_script(&self, name: &str) -> bool {
        let path = self.scripts_dir.join(name);
        log::debug!("Executing {}", path.display());
        match Command::new(&path)
            .env("INTERFACE", &self.interface)
            .env("WIFI_MODULE", &self.wifi_module)
            .status()
        {
            Ok(status) if status.success() => true,
            Ok(status) => {
                log::warn!("{} exited with {}", path.display(), status);
                false
            }
            Err(e) => {
                log::warn!("Could not run {}: {}", path.display(), e);
                false
            }
        }
    }
}

/// Search a loaded-modules listing (the `/proc/modules` format, one module
/// per line, name first) for the named driver.
fn module_loaded(listing: &Path, module: &str) -> bool {
    let Ok(content) = std::fs::read_to_string(listing) else {
        return false;
    };
    content
        .lines()
        .any(|line| line.split_whitespace().next() == Some(module))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(tag: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "ntx-hal-network-{}-{}",
            tag,
            std::process::id()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn radio_state_follows_the_modules_listing() {
        let listing = temp_file(
            "modules",
            "g_ether 38421 0 - Live 0x00000000\nsdio_wifi_pwr 2327 0 - Live 0x00000000\n",
        );
        let backend =
            NetworkBackend::new("/nonexistent", "eth0", "sdio_wifi_pwr").with_modules_list(&listing);
        assert!(backend.is_radio_enabled());

        let backend =
            NetworkBackend::new("/nonexistent", "eth0", "8189fs").with_modules_list(&listing);
        assert!(!backend.is_radio_enabled());

        let _ = std::fs::remove_file(listing);
    }

    #[test]
    fn module_match_is_exact_not_prefix() {
        let listing = temp_file("modules-prefix", "sdio_wifi_pwr_x 2327 0 - Live 0x0\n");
        let backend = NetworkBackend::new("/nonexistent", "eth0", "sdio_wifi_pwr")
            .with_modules_list(&listing);
        assert!(!backend.is_radio_enabled());
        let _ = std::fs::remove_file(listing);
    }

    #[test]
    fn missing_script_fails_softly() {
        let backend = NetworkBackend::new("/nonexistent-scripts-dir", "eth0", "sdio_wifi_pwr");
        assert!(!backend.enable_radio());
        assert!(!backend.release_ip());
    }
}
