mod gui;

use clap::Parser;
use ghosthunter::{
    args::MonitorArgs,
    dummy_dwm::DummyDwm,
    dwm_port::{available_ports, open_dwm_port},
    gui::device_selector,
    poller::Poller,
};
use gui::engage_gui;

use log::error;
use std::{error::Error, time::Duration};

fn main() {
    env_logger::init();
    let args = MonitorArgs::parse();

    if let Err(e) = run(args) {
        error!("{}", e);
        eprintln!("{}", e);
    }
}

fn run(args: MonitorArgs) -> Result<(), Box<dyn Error>> {
    let interval = Duration::from_millis(args.interval_ms);

    if args.dummy {
        let (poller, reports) = Poller::start(DummyDwm::builder().build(), interval);
        engage_gui(reports)?;
        poller.stop();
        return Ok(());
    }

    let device = match args.device {
        Some(device) => device,
        None => match device_selector(available_ports()?)? {
            Some(device) => device,
            None => return Ok(()),
        },
    };
    let port = open_dwm_port(device)?;
    let (poller, reports) = Poller::start(port, interval);
    engage_gui(reports)?;
    poller.stop();
    Ok(())
}
