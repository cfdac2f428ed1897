//! Poll the vision server and print every pose that arrives.
//!
//! Usage: SMARTPICK_HOST=127.0.0.1 cargo run --example vision_client
//! The data request input is simulated as always asserted.
//! Press Ctrl+C to stop.

use smartpick::{ClientConfig, CyclicTask, DataBridge, Heartbeat, MessageGateway, VisionClient};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn main() {
    env_logger::init();

    let config = ClientConfig::from_env();
    println!("Server:   {}", config.server_addr());
    println!("Request:  {:?}", config.request_line());
    println!("Cycle:    {:?}", config.cycle_period);
    println!();

    let bridge = Arc::new(DataBridge::new());
    let gateway = MessageGateway::new();

    let client = match VisionClient::new(config, bridge.clone(), gateway.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let _heartbeat = match Heartbeat::start(
        "demo",
        |level: bool| -> smartpick::Result<()> {
            log::trace!("heartbeat {}", level);
            Ok(())
        },
        Duration::from_millis(100),
    ) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Failed to start heartbeat: {}", e);
            std::process::exit(1);
        }
    };

    let task = match CyclicTask::spawn(client, || true) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to start vision task: {}", e);
            std::process::exit(1);
        }
    };

    println!("Waiting for poses (Ctrl+C to stop)...");

    let start = Instant::now();
    let mut count: u64 = 0;
    let mut last_report = Instant::now();

    while task.is_active() {
        if let Some(p) = bridge.take() {
            count += 1;
            println!(
                "pos=[{:+.3}, {:+.3}, {:+.3}]  rot=[{:+.4}, {:+.4}, {:+.4}]",
                p.x, p.y, p.z, p.rx, p.ry, p.rz,
            );
        }
        while let Some(response) = gateway.get_response() {
            log::debug!("inbox: {}", response);
        }

        let now = Instant::now();
        if now.duration_since(last_report) >= Duration::from_secs(10) {
            println!("--- {} poses in {:.1}s ---", count, start.elapsed().as_secs_f64());
            last_report = now;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    if let Some(stats) = task.stop() {
        println!("\n{:?}", stats);
    }
}
