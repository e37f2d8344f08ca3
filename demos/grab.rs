use std::time::Instant;
use std::{env, error::Error};

use v4lcap::prelude::*;
use v4lcap::{CaptureParams, Control, Device};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "/dev/video0".to_string());
    let count: u64 = match args.next() {
        Some(count) => count.parse()?,
        None => 30,
    };
    println!("Using device: {}\n", path);

    let params = CaptureParams {
        path: path.into(),
        ..CaptureParams::default()
    };
    let mut dev = Device::open(params)?;
    println!("Capabilities:\n{}", dev.capabilities());
    println!("Active format:\n{}", dev.format());
    println!("Active parameters:\n{}", dev.parameters());

    for ctrl in Control::ALL.iter().copied() {
        let name = ctrl.to_string();
        match (dev.query_control(ctrl), dev.control(ctrl)) {
            (Ok(desc), Ok(value)) => println!(
                "{:<10}: {} (range {}..={}, step {})",
                name, value, desc.minimum, desc.maximum, desc.step
            ),
            (Err(e), _) | (_, Err(e)) => println!("{:<10}: unavailable ({})", name, e),
        }
    }
    println!();

    dev.start()?;

    let start = Instant::now();
    let mut bytes = 0usize;
    while dev.frame_count() < count {
        let frame = match dev.pull() {
            Ok(frame) => frame,
            Err(e) if e.is_retryable() => {
                println!("retrying: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        bytes += frame.data().len();
        println!("Buffer {}", frame.index());
        println!("{}", frame.meta());
    }
    dev.stop();

    let elapsed = start.elapsed().as_secs_f64();
    println!("FPS: {:.2}", count as f64 / elapsed);
    println!("MB/s: {:.2}", bytes as f64 / 1_048_576.0 / elapsed);

    Ok(())
}
