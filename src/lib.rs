//! # smartpick - vision link for robot bin picking
//!
//! Connects a robot controller to a smart-vision picking server over a raw
//! TCP line protocol. Provides:
//! - A cyclic, non-blocking client with connect-on-next-cycle recovery
//! - A lock-free latest-pose mailbox (sequence lock over native atomics) between the network and control threads
//! - Unbounded text queues for auxiliary commands and responses
//! - A defensive parser for the legacy delimiter-separated datagram format
//!
//! ## Quick Start
//! ```no_run
//! use smartpick::{ClientConfig, CyclicTask, DataBridge, MessageGateway, VisionClient};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! let bridge = Arc::new(DataBridge::new());
//! let client = VisionClient::new(ClientConfig::from_env(), bridge.clone(), MessageGateway::new()).unwrap();
//!
//! let request = Arc::new(AtomicBool::new(true));
//! let trigger = request.clone();
//! let task = CyclicTask::spawn(client, move || trigger.load(Ordering::Relaxed)).unwrap();
//!
//! if let Some(pose) = bridge.take() {
//!     println!("pick at [{}, {}, {}]", pose.x, pose.y, pose.z);
//! }
//! task.stop();
//! ```

pub mod error;
pub mod types;
pub mod protocol;
pub mod config;
pub mod bridge;
pub mod gateway;
pub mod client;
pub mod task;
pub mod heartbeat;

pub use error::{ParseError, VisionError};
pub use types::*;
pub use protocol::{parse_datagram, VisionDatagram};
pub use config::ClientConfig;
pub use bridge::DataBridge;
pub use gateway::MessageGateway;
pub use client::{ClientStats, CycleOutcome, Exchange, RequestSource, VisionClient};
pub use task::{CyclicTask, VisionIo};
pub use heartbeat::{DigitalOutput, Heartbeat};

/// Result type alias for smartpick operations.
pub type Result<T> = std::result::Result<T, VisionError>;
