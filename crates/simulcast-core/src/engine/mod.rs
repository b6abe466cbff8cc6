//! The simulcast engine and the service thread that drives it
//!
//! ```text
//! ┌─────────────┐   SimulcastCommand   ┌──────────────────┐  FetchRequest  ┌──────────────┐
//! │   Player    │ ───────────────────► │ SimulcastService │ ─────────────► │ FetchWorker  │
//! │             │ ◄─────────────────── │   (Simulcast)    │ ◄───────────── │   (ureq)     │
//! └─────────────┘   SimulcastEvent     └──────────────────┘  FetchOutcome  └──────────────┘
//!                                               │
//!                                               │ VoiceSpec (rtrb)
//!                                               ▼
//!                                       ┌──────────────┐
//!                                       │  VoiceMixer  │
//!                                       │ (cpal thread)│
//!                                       └──────────────┘
//! ```

pub mod messages;
mod service;
mod simulcast;
mod tick;

pub use messages::{
    EngineMode, EventBus, ServiceHandle, SimulcastCommand, SimulcastEvent, SimulcastStats,
};
pub use service::{SimulcastClient, SimulcastService};
pub use simulcast::{EngineSettings, Simulcast};
pub use tick::{TickDriver, TickFire};
