mod cli;

use std::io::{BufRead, Read};

use clap::Parser;

use cli::{Cli, Command, WifiAction};
use ntx_hal::identity::DeviceIdentity;
use ntx_hal::input::calibrate::{self, CalibrationUi};
use ntx_hal::input::event::{self, RawInputEvent};
use ntx_hal::input::pipeline::{
    Disposition, EventPipeline, PendingInputPolicy, PipelineOptions,
};
use ntx_hal::network::NetworkBackend;
use ntx_hal::power::PowerController;
use ntx_hal::settings::SettingsStore;
use ntx_hal::variant::{self, DeviceVariant};

fn main() -> ntx_hal::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let identity =
        DeviceIdentity::detect_with(cli.product.as_deref(), cli.model_number.as_deref())?;
    let variant = variant::resolve(&identity.codename, &identity.product_id)?;

    match &cli.command {
        None | Some(Command::Info) => run_info(variant, &identity),
        Some(Command::Dump { device }) => return run_dump(device.clone(), variant, &cli),
        Some(Command::Suspend) => {
            if !PowerController::new().suspend() {
                log::error!("Suspend did not complete cleanly");
                std::process::exit(1);
            }
        }
        Some(Command::Resume) => {
            if !PowerController::new().resume() {
                log::error!("Resume did not complete cleanly");
                std::process::exit(1);
            }
        }
        Some(Command::Wifi { action }) => {
            let backend = NetworkBackend::from_env(&cli.scripts_dir);
            let ok = match action {
                WifiAction::Up => backend.enable_radio() && backend.obtain_ip(),
                WifiAction::Down => {
                    // Release first; the radio teardown does not care about
                    // a stale lease but dhcp does care about a dead radio.
                    let released = backend.release_ip();
                    backend.disable_radio() && released
                }
                WifiAction::Restore => {
                    backend.restore_connection_async();
                    true
                }
                WifiAction::Status => {
                    println!(
                        "{}: {}",
                        backend.interface(),
                        if backend.is_radio_enabled() { "up" } else { "down" }
                    );
                    true
                }
            };
            if !ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn run_info(variant: &DeviceVariant, identity: &DeviceIdentity) {
    println!("model:          {}", variant.model);
    println!("codename:       {}", identity.codename);
    println!("product id:     {}", identity.product_id);
    if let Some(ref fw) = identity.firmware {
        println!("firmware:       {}", fw);
    }
    println!("display:        {}x{} @ {} dpi", variant.screen_width, variant.screen_height, variant.display_dpi);
    if let Some(v) = variant.viewport {
        println!("viewport:       {}x{}+{}+{}", v.w, v.h, v.x, v.y);
    }
    println!("frontlight:     {}", variant.has_frontlight);
    println!("multitouch:     {}", variant.has_multitouch);
    println!("keys:           {}", variant.has_keys);
    println!("hw invert:      {}", variant.can_invert_display);
    println!("gsensor:        {}", variant.can_toggle_gsensor);
    println!("touch protocol: {:?}", variant.protocol);
    match variant.touch_switch_xy {
        Some(sw) => println!("switch xy:      {}", sw),
        None => println!("switch xy:      needs calibration"),
    }
    println!("mirror x:       {}", variant.touch_mirror_x);
    if let Some(fl) = variant.frontlight {
        if let Some(white) = fl.white {
            println!("fl white:       {}", white);
        }
        if let Some(red) = fl.red {
            println!("fl red:         {}", red);
        }
        if let Some(green) = fl.green {
            println!("fl green:       {}", green);
        }
        if let Some(mixer) = fl.mixer {
            println!("fl mixer:       {}", mixer);
        }
    }
    if let Some(nl) = variant.natural_light {
        println!(
            "natural light:  {}..{}{}",
            nl.min,
            nl.max,
            if nl.inverted { " (inverted)" } else { "" }
        );
    }
}

/// Asks on the terminal instead of drawing a calibration screen; the dump
/// tool has no UI to draw on.
struct PromptCalibration;

impl CalibrationUi for PromptCalibration {
    fn probe_switch_xy(&mut self, variant: &DeviceVariant) -> bool {
        eprint!(
            "No persisted axis calibration for {}. Are touch X/Y swapped? [y/N] ",
            variant.model
        );
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

fn run_dump(
    device: std::path::PathBuf,
    variant: &'static DeviceVariant,
    cli: &Cli,
) -> ntx_hal::Result<()> {
    let mut store = SettingsStore::open(&cli.settings);
    let options = PipelineOptions {
        pending_policy: if cli.drop_pending {
            PendingInputPolicy::Discard
        } else {
            PendingInputPolicy::Buffer
        },
        ..PipelineOptions::default()
    };
    let mut pipeline = EventPipeline::with_options(variant, &store.values, options);
    let replayed =
        calibrate::ensure_finalized(&mut pipeline, variant, &mut store, &mut PromptCalibration);

    let mut n: u64 = 0;
    for ev in replayed {
        n += 1;
        print_event(n, &ev);
    }

    let record_size = if cfg!(target_pointer_width = "64") {
        event::INPUT_EVENT_SIZE_64
    } else {
        event::INPUT_EVENT_SIZE_32
    };

    let mut file = std::fs::File::open(&device)?;
    eprintln!("Dumping adjusted events from {} (Ctrl+C to stop):\n", device.display());

    let mut buf = vec![0u8; record_size];
    loop {
        file.read_exact(&mut buf)?;
        let Some(mut ev) = event::parse_input_event(&buf) else {
            continue;
        };
        if pipeline.apply(&mut ev) == Disposition::Forward {
            n += 1;
            print_event(n, &ev);
        }
    }
}

fn print_event(n: u64, ev: &RawInputEvent) {
    println!(
        "{:6}  {:10}.{:06}  {}  value={}",
        n,
        ev.time.sec,
        ev.time.usec,
        event::code_name(ev.ev_type, ev.code),
        ev.value
    );
}
