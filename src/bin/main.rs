//! CLI binary for the HopeTurtle logger
//!
//! `listen` is what the systemd unit runs on the device; `display` is the
//! command surface the install/update scripts use to put messages on the OLED.

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use embedded_hal::digital::InputPin;
use hopeturtle::{
    ButtonWatcher, CommandSampler, Config, DisplayBackend, DisplayMode, EchoBackend, FixLog,
    FixSource, Geometry, InterruptibleSleep, Orchestrator, SessionOutcome, Shutdown,
    SimulatedButton, StatusRenderer, COMMANDS, MAX_WAIT_SECS,
};
use log::{debug, info, warn};
use std::io::BufRead;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

type DeviceOrchestrator = Orchestrator<CommandSampler, FixLog, InterruptibleSleep>;

fn build_command() -> Command {
    Command::new("hopeturtle")
        .version(env!("CARGO_PKG_VERSION"))
        .about("HopeTurtle field logger: button-triggered GPS fixes with OLED feedback")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("debug")
                .long("debug")
                .global(true)
                .help("Enable debug logging (RUST_LOG overrides)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .value_name("DIR")
                .help("Directory holding <session-id>_gps.csv logs (default: $HT_DATA_DIR or ~/hopeturtle/data)"),
        )
        .arg(
            Arg::new("simulate")
                .long("simulate")
                .global(true)
                .help("Use the textual display and press the button with Enter on stdin")
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("listen")
                .about("Wait for button presses and run an acquisition session for each")
                .arg(attempts_arg())
                .arg(delay_arg()),
        )
        .subcommand(
            Command::new("snapshot")
                .about("Run one acquisition session now")
                .arg(attempts_arg())
                .arg(delay_arg()),
        )
        .subcommand(
            Command::new("display")
                .about("Show a named screen on the OLED")
                .arg(
                    Arg::new("screen")
                        .help(format!("Screen to show: {}", COMMANDS.join(", ")))
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("lines")
                        .help("Text lines for `custom`")
                        .num_args(0..)
                        .index(2),
                ),
        )
        .subcommand(
            Command::new("latest")
                .about("Print the latest logged fix and its distance to the reference point")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the fix record as JSON (requires the `json` feature)")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}

fn attempts_arg() -> Arg {
    Arg::new("attempts")
        .long("attempts")
        .value_name("N")
        .help("Maximum GPS attempts per session (default: $HT_MAX_ATTEMPTS or 15)")
        .value_parser(clap::value_parser!(u32))
}

fn delay_arg() -> Arg {
    Arg::new("delay")
        .long("delay")
        .value_name("SECONDS")
        .help("Pause between unsuccessful attempts, at most 3600 (default: $HT_RETRY_DELAY_S or 3)")
        .value_parser(clap::value_parser!(u64))
}

fn main() -> Result<()> {
    let matches = build_command().get_matches();
    let debug = matches.get_flag("debug");
    let simulate = matches.get_flag("simulate");

    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    debug!(
        "hopeturtle {} ({})",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown revision")
    );

    let mut config = Config::from_env();
    if let Some(dir) = matches.get_one::<String>("data-dir") {
        config.data_dir = PathBuf::from(dir);
    }

    let shutdown =
        Shutdown::install_signal_handlers().context("Failed to install signal handlers")?;

    match matches.subcommand() {
        Some(("listen", sub)) => {
            apply_session_overrides(&mut config, sub);
            listen(&config, &shutdown, simulate)
        }
        Some(("snapshot", sub)) => {
            apply_session_overrides(&mut config, sub);
            snapshot(&config, &shutdown, simulate)
        }
        Some(("display", sub)) => {
            let screen = sub
                .get_one::<String>("screen")
                .map(String::as_str)
                .unwrap_or_default();
            let lines: Vec<String> = sub
                .get_many::<String>("lines")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            show_screen(&config, &shutdown, simulate, screen, &lines);
            Ok(())
        }
        Some(("latest", sub)) => print_latest(&config, sub.get_flag("json")),
        _ => Ok(()),
    }
}

fn apply_session_overrides(config: &mut Config, matches: &ArgMatches) {
    if let Some(attempts) = matches.get_one::<u32>("attempts") {
        config.session.max_attempts = *attempts;
    }
    if let Some(delay) = matches.get_one::<u64>("delay") {
        config.session.retry_delay = Duration::from_secs((*delay).min(MAX_WAIT_SECS));
    }
}

fn geometry(config: &Config) -> Geometry {
    if config.display.height <= 32 {
        Geometry::OLED_128X32
    } else {
        Geometry::OLED_128X64
    }
}

/// The OLED if it can be opened, otherwise the textual echo
fn open_display(config: &Config, simulate: bool) -> Box<dyn DisplayBackend> {
    #[cfg(feature = "hardware")]
    if !simulate {
        match hopeturtle::render::oled::open_oled(&config.display.i2c_bus, config.display.height) {
            Ok(backend) => return backend,
            Err(e) => warn!("[OLED] Not available: {}", e),
        }
    }
    #[cfg(not(feature = "hardware"))]
    if !simulate {
        debug!("Built without the `hardware` feature; using textual display");
    }
    Box::new(EchoBackend::new(geometry(config)))
}

fn build_orchestrator(
    config: &Config,
    shutdown: &Shutdown,
    simulate: bool,
) -> Result<DeviceOrchestrator> {
    let sampler =
        CommandSampler::from_command_line(&config.sampler_command, config.session.sampler_timeout)
            .context("Invalid HT_GPS_CMD")?
            .with_shutdown(shutdown.clone());
    let renderer = StatusRenderer::new(open_display(config, simulate), shutdown.clone());
    info!(
        "Logs in {}, display: {}, worst-case session {:?}",
        config.data_dir.display(),
        renderer.backend_name(),
        config.session.worst_case_duration()
    );
    Ok(Orchestrator::new(
        config.session.clone(),
        config.reference.clone(),
        sampler,
        FixLog::new(&config.data_dir),
        InterruptibleSleep::new(shutdown.clone()),
        renderer,
        shutdown.clone(),
    ))
}

fn listen(config: &Config, shutdown: &Shutdown, simulate: bool) -> Result<()> {
    let mut orchestrator = build_orchestrator(config, shutdown, simulate)?;

    #[cfg(feature = "hardware")]
    if !simulate {
        let pin = hopeturtle::open_cdev_pin(&config.button.gpio_chip, config.button.line)
            .with_context(|| {
                format!(
                    "Cannot open button line {} on {}",
                    config.button.line,
                    config.button.gpio_chip.display()
                )
            })?;
        watch(pin, config, shutdown, &mut orchestrator);
        return Ok(());
    }

    let button = SimulatedButton::new();
    let presser = button.clone();
    println!("Simulated button: press Enter to trigger a GPS snapshot, Ctrl-C to quit");
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for _line in stdin.lock().lines() {
            presser.tap(Duration::from_millis(50));
        }
    });
    watch(button, config, shutdown, &mut orchestrator);
    Ok(())
}

fn watch<P: InputPin>(
    pin: P,
    config: &Config,
    shutdown: &Shutdown,
    orchestrator: &mut DeviceOrchestrator,
) {
    let mut watcher = ButtonWatcher::new(
        pin,
        config.button.debounce,
        config.button.poll_interval,
        shutdown.clone(),
    );
    watcher.run(|_event| {
        info!("Button pressed, capturing GPS snapshot");
        report(orchestrator.run_session().outcome);
    });
    drop(watcher.release());
    info!("Button line released, exiting cleanly");
}

fn snapshot(config: &Config, shutdown: &Shutdown, simulate: bool) -> Result<()> {
    let mut orchestrator = build_orchestrator(config, shutdown, simulate)?;
    report(orchestrator.run_session().outcome);
    Ok(())
}

fn report(outcome: SessionOutcome) {
    match outcome {
        SessionOutcome::Fix { record, km_to_ref } => {
            info!("OLED updated with fix {} ({:.1} km)", record.timestamp, km_to_ref)
        }
        SessionOutcome::NoFix => info!("OLED updated: no GPS fix yet"),
        SessionOutcome::Interrupted => info!("Session interrupted"),
    }
}

fn show_screen(config: &Config, shutdown: &Shutdown, simulate: bool, screen: &str, lines: &[String]) {
    let mode = DisplayMode::from_command(screen, lines);
    if let DisplayMode::Unknown(command) = &mode {
        warn!("Unknown display command '{}'", command);
    }
    let fixes = FixLog::new(&config.data_dir);
    let request = mode.request(&fixes, &config.reference, config.display.message_hold);
    let renderer = StatusRenderer::new(open_display(config, simulate), shutdown.clone());
    drop(renderer.present(&request));
}

fn print_latest(config: &Config, json: bool) -> Result<()> {
    let fixes = FixLog::new(&config.data_dir);
    let Some(fix) = fixes.latest_fix() else {
        println!("No fix found in {}", config.data_dir.display());
        return Ok(());
    };

    if json {
        #[cfg(feature = "json")]
        {
            println!(
                "{}",
                serde_json::to_string_pretty(&fix).context("Failed to serialize fix")?
            );
            return Ok(());
        }
        #[cfg(not(feature = "json"))]
        warn!("Built without the `json` feature; printing text");
    }

    let (lat, lon) = fix.position().unwrap_or_default();
    println!("Timestamp: {}", fix.timestamp);
    println!("Position:  {:.6},{:.6}", lat, lon);
    println!(
        "Distance:  {:.2} km to {}",
        config.reference.distance_km(lat, lon),
        config.reference.name
    );
    println!("Sats:      {}", fix.satellites_label());
    if let Some(hdop) = fix.hdop {
        println!("HDOP:      {:.1}", hdop);
    }
    println!("Log:       {}", fix.source.display());
    Ok(())
}
