//! Cue audio output
//!
//! The audio system follows a lock-free design:
//!
//! - **Engine thread**: owns the [`AudioSession`] and pushes voice commands
//!   through a lock-free ringbuffer
//! - **Audio thread**: owns the [`VoiceMixer`] exclusively and renders the
//!   scheduled voices sample-accurately against the [`AudioClock`]
//! - **Atomics**: clock time and suspended state are read without locks
//!
//! Decoded cue buffers travel as `basedrop::Shared`, so a voice that ends on
//! the audio thread never frees memory there (see [`gc_handle`]).
//!
//! ```ignore
//! use simulcast_core::audio::{start_audio_output, AudioConfig};
//!
//! let (output, session) = start_audio_output(&AudioConfig::default())?;
//! // `output` keeps the stream alive; `session` goes to the engine
//! ```

mod backend;
mod clock;
mod command;
mod config;
mod device;
mod error;
mod gc;
mod mixer;
mod session;
mod voice;

pub use backend::{start_audio_output, AudioOutput};
pub use clock::AudioClock;
pub use command::{command_channel, MixerCommand, VoiceId, VoiceSpec, COMMAND_QUEUE_CAPACITY};
pub use config::{AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE, MAX_BUFFER_SIZE};
pub use device::{find_device_by_id, get_output_devices, AudioDevice};
pub use error::{AudioError, AudioResult};
pub use gc::gc_handle;
pub use mixer::{VoiceMixer, MAX_VOICES};
pub use session::AudioSession;
pub use voice::apply_pan;
