use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ntx_hal::network;
use ntx_hal::settings;

#[derive(Parser)]
#[command(name = "ntx-hal")]
#[command(about = "Field debugging front-end for the e-ink hardware abstraction layer")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Hardware codename (normally exported by the firmware init)
    #[arg(long, env = "PRODUCT")]
    pub product: Option<String>,

    /// Product id disambiguating hardware revisions
    #[arg(long, env = "MODEL_NUMBER")]
    pub model_number: Option<String>,

    /// Settings file path
    #[arg(long, default_value = settings::DEFAULT_SETTINGS_PATH)]
    pub settings: PathBuf,

    /// Directory holding the connectivity scripts
    #[arg(long, default_value = network::DEFAULT_SCRIPTS_DIR)]
    pub scripts_dir: PathBuf,

    /// Drop input arriving before touch calibration completes
    /// (default: buffer and replay)
    #[arg(long)]
    pub drop_pending: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the resolved device descriptor
    Info,
    /// Stream raw events from a device node through the adjustment pipeline
    Dump {
        /// Input device node, e.g. /dev/input/event1
        device: PathBuf,
    },
    /// Run the kernel suspend sequence once
    Suspend,
    /// Run the resume sequence
    Resume,
    /// Drive the connectivity scripts
    Wifi {
        #[command(subcommand)]
        action: WifiAction,
    },
}

#[derive(Subcommand)]
pub enum WifiAction {
    /// Enable the radio and obtain an IP
    Up,
    /// Release the IP and disable the radio
    Down,
    /// Kick the asynchronous connection-restore script
    Restore,
    /// Report whether the Wi-Fi driver module is loaded
    Status,
}
