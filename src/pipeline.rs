use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::{device::HandGestureDevice, snapshot::RecordedFrame, types::ButtonEvent};

fn run_worker_loop(
    device: &mut HandGestureDevice,
    frame_rx: Receiver<RecordedFrame>,
    mut event_tx: Sender<ButtonEvent>,
) -> usize {
    let mut frames = 0;
    let mut events = 0;

    // Frames are never coalesced; each one carries its own dt.
    while let Ok(frame) = frame_rx.recv() {
        events += device.frame(frame.dt, &frame.snapshot, &mut event_tx);
        frames += 1;
    }

    log::info!("device worker finished: {frames} frames, {events} button events");
    frames
}

/// Drives `device` from `frame_rx` on a worker thread until the frame sender
/// hangs up, then hands the device back through the join handle.
pub fn start_device_worker(
    mut device: HandGestureDevice,
    frame_rx: Receiver<RecordedFrame>,
    event_tx: Sender<ButtonEvent>,
) -> thread::JoinHandle<HandGestureDevice> {
    log::info!(
        "starting hand gesture worker with {} sources",
        device.sources().len()
    );

    thread::spawn(move || {
        run_worker_loop(&mut device, frame_rx, event_tx);
        device
    })
}
