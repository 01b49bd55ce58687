use std::{env, path::PathBuf};

use anyhow::{Context, Result, bail};
use crossbeam_channel::{bounded, unbounded};
use hand_gesture_device::{
    GestureCatalog, GestureDatabase, GestureSettings, HandGestureDevice, Recording,
    SourceDescriptor, TrackingSnapshot, start_device_worker,
};

const USAGE: &str = "usage: hand-gesture-device [--settings FILE] [--gestures FILE]... [RECORDING]";

#[derive(Debug, Default)]
struct Args {
    settings: Option<PathBuf>,
    gestures: Vec<PathBuf>,
    recording: Option<PathBuf>,
    help: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => {
                let path = args.next().context("--settings needs a file")?;
                parsed.settings = Some(path.into());
            }
            "--gestures" => {
                let path = args.next().context("--gestures needs a file")?;
                parsed.gestures.push(path.into());
            }
            "-h" | "--help" => parsed.help = true,
            flag if flag.starts_with('-') => bail!("unknown option `{flag}`\n{USAGE}"),
            _ if parsed.recording.is_some() => bail!("more than one recording given\n{USAGE}"),
            _ => parsed.recording = Some(PathBuf::from(&arg)),
        }
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args(env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let settings = match &args.settings {
        Some(path) => GestureSettings::load(path)
            .with_context(|| format!("failed to load settings {}", path.display()))?,
        None => GestureSettings::default(),
    };

    let databases = if args.gestures.is_empty() {
        vec![GestureDatabase::builtin()]
    } else {
        args.gestures
            .iter()
            .map(|path| {
                GestureDatabase::load(path)
                    .with_context(|| format!("failed to load gestures {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let recording = match &args.recording {
        Some(path) => Recording::load(path)
            .with_context(|| format!("failed to load recording {}", path.display()))?,
        None => {
            log::info!("no recording given, replaying the built-in demo");
            Recording::demo()
        }
    };

    let owners = recording.owners();
    let registry = TrackingSnapshot {
        tracking_active: true,
        owners,
        hands: Vec::new(),
    };

    let mut device = HandGestureDevice::new(GestureCatalog::new(databases), settings);
    let database = device
        .catalog()
        .databases()
        .first()
        .map(|db| db.name.clone())
        .context("no gesture database loaded")?;

    // Every hand in the recording gets a source bound to the first database.
    for (owner, hand) in recording.hands() {
        if let Err(err) =
            device.register(SourceDescriptor::new(owner, hand, database.clone()), &registry)
        {
            eprintln!("skipping {} hand of owner {owner}: {err}", hand.label());
        }
    }

    let (frame_tx, frame_rx) = bounded(64);
    let (event_tx, event_rx) = unbounded();
    let worker = start_device_worker(device, frame_rx, event_tx);

    let printer = std::thread::spawn(move || {
        let mut count = 0usize;
        for event in event_rx {
            println!("{}", event.display_text());
            count += 1;
        }
        count
    });

    for frame in recording.frames {
        if frame_tx.send(frame).is_err() {
            break;
        }
    }
    drop(frame_tx);

    let device = match worker.join() {
        Ok(device) => device,
        Err(_) => bail!("hand gesture worker panicked"),
    };
    let count = match printer.join() {
        Ok(count) => count,
        Err(_) => bail!("event printer panicked"),
    };
    log::info!(
        "replay finished with {count} button events, {} sources still registered",
        device.sources().len()
    );

    Ok(())
}
