//! Bring-up diagnostics and position polling for the DWM1001-DEV.

// Example:
// RUST_LOG=info cargo run --bin hunter --
//                         --device /dev/ttyACM0 diagnostics
//                         --config tag.ron
//
// RUST_LOG=info cargo run --bin hunter -- --dummy poll -n 20

use clap::Parser;
use ghosthunter::{
    args::{
        CommandTask::{self, Diagnostics, Poll},
        DiagnosticsCommand, HunterArgs, PollCommand,
    },
    dummy_dwm::DummyDwm,
    dwm_api::get_location,
    dwm_port::{available_ports, open_dwm_port},
    gui::device_selector,
    location_tracker::{LocationTracker, Movement},
    poller::Poller,
    startup::{bring_up, BringUpTiming},
    tag_config::TagConfiguration,
};

use log::{debug, error, info, warn};
use std::{
    error::Error,
    io::{Read, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

type BoxResult<T> = Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    env_logger::init();
    let args = HunterArgs::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: HunterArgs) -> BoxResult<()> {
    if args.dummy {
        info!("Using a simulated DWM1001-DEV");
        return run_task(DummyDwm::builder().build(), args.command, true);
    }

    let device = match args.device {
        Some(device) => device,
        None => match choose_device()? {
            Some(device) => device,
            None => {
                info!("No device chosen, nothing to do");
                return Ok(());
            }
        },
    };

    info!("Opening connection on {}", device.display());
    let port = open_dwm_port(&device)?;
    run_task(port, args.command, false)
}

fn choose_device() -> BoxResult<Option<PathBuf>> {
    Ok(device_selector(available_ports()?)?)
}

fn run_task<C>(conn: C, task: CommandTask, simulated: bool) -> BoxResult<()>
where
    C: Read + Write + Send + 'static,
{
    match task {
        Diagnostics(cmd) => diagnostics(conn, cmd, simulated),
        Poll(cmd) => poll(conn, cmd),
    }
}

fn diagnostics<C: Read + Write>(
    mut conn: C,
    cmd: DiagnosticsCommand,
    simulated: bool,
) -> BoxResult<()> {
    let desired = match (&cmd.config, cmd.skip_set) {
        (_, true) => None,
        (Some(path), false) => Some(TagConfiguration::from_path(path)?),
        (None, false) => Some(TagConfiguration::default()),
    };
    let timing = if simulated {
        BringUpTiming::immediate()
    } else {
        BringUpTiming::default()
    };

    let config = bring_up(&mut conn, desired.as_ref(), &timing)?;
    if let Some(path) = &cmd.outfile {
        config.to_path(path)?;
        info!("Wrote board config to {}", path.display());
    }

    info!("Location test");
    let report = get_location(&mut conn)?;
    match report.position {
        Some(p) => info!(
            "Tag at ({}, {}, {}) mm, quality {}%",
            p.x, p.y, p.z, p.qf
        ),
        None => warn!("Location engine has no fix"),
    }
    for anchor in report.anchors_nearest_first() {
        info!(
            "Anchor {:#06x}: {} mm away (quality {}%), sits at ({}, {}, {})",
            anchor.address,
            anchor.distance,
            anchor.quality_factor,
            anchor.position.x,
            anchor.position.y,
            anchor.position.z
        );
    }
    Ok(())
}

fn poll<C>(conn: C, cmd: PollCommand) -> BoxResult<()>
where
    C: Read + Write + Send + 'static,
{
    let (poller, reports) = Poller::start(conn, Duration::from_millis(cmd.interval_ms));
    let mut tracker = LocationTracker::new(cmd.tolerance_mm);

    for report in reports.iter().take(cmd.count.unwrap_or(usize::MAX)) {
        let n_anchors = report.anchors.len();
        match tracker.observe(report) {
            Movement::First(p) => info!("First fix at ({}, {}) mm", p.x, p.y),
            Movement::Moved {
                to, distance_mm, ..
            } => info!(
                "Moved {:.0} mm to ({}, {}), {} anchors in range",
                distance_mm, to.x, to.y, n_anchors
            ),
            Movement::Jitter { distance_mm } => debug!("Jitter of {:.0} mm", distance_mm),
            Movement::NoFix => warn!("No fix, {} anchors in range", n_anchors),
        }
    }

    poller.stop();
    Ok(())
}
