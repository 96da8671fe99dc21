//! Interactive debug shell for the ASDF throttle quadrant.

mod shell;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use asdf_core::levers::LeverReport;
use asdf_core::prelude::*;
use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use shell::{parse_input, parse_values, values_prompt, ShellInput, HELP};

/// CLI options for the debug shell.
#[derive(Debug, Parser)]
#[command(author, version, about = "ASDF throttle quadrant debug shell")]
struct Args {
    /// Serial port the device is attached to (e.g. /dev/ttyACM0, COM6).
    #[arg(long)]
    port: Option<String>,

    /// Baud rate.
    #[arg(long)]
    baud: Option<u32>,

    /// JSON device configuration; flags override its fields.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Poll frame layout spoken by the firmware (legacy or compact).
    #[arg(long)]
    format: Option<PollFormat>,

    /// Talk to a simulated device instead of a serial port.
    #[arg(long, action = ArgAction::SetTrue)]
    demo: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    println!("{}", HELP);
    if args.demo {
        info!("using simulated device ({:?} poll frames)", config.poll_format);
        let sim = SimulatedDevice::new(config.poll_format).with_stale_byte_after_reset(true);
        run_shell(DeviceController::new(sim, &config), config.poll_format)
    } else {
        let device = DeviceController::<SerialTransport>::open(&config)
            .with_context(|| format!("failed to open {}", config.port_name))?;
        run_shell(device, config.poll_format)
    }
}

fn build_config(args: &Args) -> Result<DeviceConfig> {
    let mut config = match &args.config {
        Some(path) => DeviceConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DeviceConfig::default(),
    };

    if let Some(port) = &args.port {
        config.port_name = port.clone();
    }
    if let Some(baud) = args.baud {
        config.baud_rate = baud;
    }
    if let Some(format) = args.format {
        config.poll_format = format;
    }
    if args.demo {
        config.reset_settle_ms = 0;
    }
    Ok(config)
}

fn run_shell<T: Transport>(mut device: DeviceController<T>, format: PollFormat) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let Some(line) = prompt(&mut lines, &format!("[{}] command> ", device.state()))? else {
            device.close();
            return Ok(());
        };

        let input = match parse_input(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let outcome = match input {
            ShellInput::Quit => {
                device.close();
                return Ok(());
            }
            ShellInput::Help => {
                println!("{}", HELP);
                Ok(())
            }
            ShellInput::Reset => device.reset().map(|()| println!("device ready")),
            ShellInput::Poll => device.poll().map(|reading| print_poll(&reading, format)),
            ShellInput::Release => device
                .release()
                .map(|code| println!("{}", code.description())),
            ShellInput::Diagnostic => device
                .diagnostic()
                .map(|code| println!("{:#04x} ({})", code.as_byte(), code.description())),
            ShellInput::LeverSet(mask) => {
                let Some((mask, values)) = read_lever_set(&mut lines, mask)? else {
                    continue;
                };
                device
                    .configure(mask, &values)
                    .map(|()| println!("levers {} set", mask))
            }
        };

        if let Err(e) = outcome {
            println!("error: {}", e);
        }
    }
}

/// Ask for the bitmask (unless already known) and the lever values
fn read_lever_set<B: BufRead>(
    lines: &mut io::Lines<B>,
    mask: Option<LeverMask>,
) -> Result<Option<(LeverMask, Vec<i32>)>> {
    let mask = match mask {
        Some(mask) => mask,
        None => {
            let Some(line) = prompt(lines, "bitmask (sb t1 t2, e.g. 011)> ")? else {
                return Ok(None);
            };
            match line.trim().parse::<LeverMask>() {
                Ok(mask) => mask,
                Err(e) => {
                    println!("{}", e);
                    return Ok(None);
                }
            }
        }
    };

    if mask.lever_count() == 0 {
        return Ok(Some((mask, Vec::new())));
    }

    let Some(line) = prompt(lines, &values_prompt(mask))? else {
        return Ok(None);
    };
    match parse_values(&line) {
        Ok(values) => Ok(Some((mask, values))),
        Err(e) => {
            println!("{:#}", e);
            Ok(None)
        }
    }
}

fn prompt<B: BufRead>(lines: &mut io::Lines<B>, text: &str) -> Result<Option<String>> {
    print!("{}", text);
    io::stdout().flush()?;
    lines.next().transpose().context("failed to read stdin")
}

fn print_poll(reading: &PollReading, format: PollFormat) {
    println!("frame:   {:02x?}", reading.frame);
    println!("samples: {:?}", reading.sample.values());
    match reading.rate {
        PollRate::Hz(hz) => println!("rate:    {:.1} Hz", hz),
        PollRate::Unavailable => println!("rate:    unavailable"),
    }

    if format == PollFormat::Compact {
        if let Ok(report) = LeverReport::from_frame(&reading.frame) {
            let [t1, t2] = report.throttle_percent();
            println!(
                "levers:  speed brake {:.0}%  throttle {:.0}% / {:.0}%  buttons {:02b}",
                report.speed_brake_percent(),
                t1,
                t2,
                report.buttons
            );
        }
    }
}
