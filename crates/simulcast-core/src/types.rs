//! Common types for Simulcast
//!
//! Fixed constants of the display (disk count, cue timings) and the stereo
//! sample types used by the voice mixer.

/// Number of rotating disks on the display
pub const NUM_DISKS: usize = 4;

/// Number of sound selectors in a structured turn
pub const NUM_SOUND_SELECTORS: usize = 6;

/// Degrees of rotation per rotation unit
pub const DEGREES_PER_UNIT: f64 = 45.0;

/// Seconds between two turns
pub const TURN_INTERVAL_SECS: f64 = 7.25;

/// Ticks between two refill fetches
pub const CHUNK_SIZE: u32 = 4;

/// Offset of the rotation-confirmation tones and of the visual spin (ms)
pub const TURN_DELAY_MS: u32 = 3000;

/// Time after the spin onset at which the angle is normalized (ms)
pub const SETTLE_DELAY_MS: u32 = 4000;

/// Every scheduled voice is released this long after scheduling (ms)
pub const VOICE_LIFETIME_MS: u32 = 9000;

/// Master output gain when audio is toggled on
pub const OUTPUT_GAIN_ON: f32 = 0.8;

/// Pans of the four rotation-confirmation tones, left to right
pub const DISK_PANS: [f32; NUM_DISKS] = [-0.7, -0.3, 0.3, 0.7];

/// Audio sample type
pub type Sample = f32;

/// One output frame, laid out `[left, right]` so a block can be handed to a
/// two-channel device as interleaved f32
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self::new(value, value)
    }
}

impl std::ops::AddAssign for StereoSample {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.left += other.left;
        self.right += other.right;
    }
}

/// The mixer's block buffer
///
/// Allocated once at full size; the audio callback only moves the working
/// length within that capacity.
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    frames: Vec<StereoSample>,
}

impl StereoBuffer {
    pub fn silence(len: usize) -> Self {
        Self {
            frames: vec![StereoSample::silence(); len],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Resize to `len` frames of silence without reallocating
    #[inline]
    pub fn clear_to(&mut self, len: usize) {
        debug_assert!(len <= self.frames.capacity(), "block longer than buffer capacity");
        self.frames.truncate(len);
        self.frames.fill(StereoSample::silence());
        self.frames.resize(len, StereoSample::silence());
    }

    #[inline]
    pub fn as_slice(&self) -> &[StereoSample] {
        &self.frames
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [StereoSample] {
        &mut self.frames
    }

    pub fn scale(&mut self, factor: Sample) {
        for frame in &mut self.frames {
            frame.left *= factor;
            frame.right *= factor;
        }
    }
}

/// View a block of frames as interleaved f32 `[L, R, L, R, ...]`
#[inline]
pub fn interleaved(frames: &[StereoSample]) -> &[Sample] {
    bytemuck::cast_slice(frames)
}
