// Frame-sequence animation over packed sprites

use super::{Sprite, SpriteSource, TextureHandle};
use glam::Vec2;

/// Playback behavior of an [`AnimatedSprite`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    /// Play forward once and hold the last frame
    Normal,
    /// Play backward once from the last frame and hold the first
    Reversed,
    /// Play forward and wrap back to the first frame
    Loop,
    /// Bounce between the first and last frame
    LoopPingPong,
}

/// A sequence of same-sized frames on one texture plus playback state
///
/// Every accessor of the sprite capability set forwards to the current
/// frame, so an `AnimatedSprite` can be drawn anywhere a [`Sprite`] can.
#[derive(Debug, Clone)]
pub struct AnimatedSprite {
    frames: Vec<Sprite>,
    frame: i32,
    direction: i32,
    mode: PlayMode,
    seconds_per_frame: f32,
    elapsed: f32,
    started: bool,
}

impl AnimatedSprite {
    /// Create an empty animation; frames are added with [`add_frame`]
    ///
    /// [`add_frame`]: AnimatedSprite::add_frame
    pub fn new(seconds_per_frame: f32, mode: PlayMode) -> Self {
        debug_assert!(
            seconds_per_frame > 0.0,
            "seconds_per_frame must be positive, got {seconds_per_frame}"
        );
        Self {
            frames: Vec::new(),
            frame: 0,
            direction: initial_direction(mode),
            mode,
            seconds_per_frame,
            elapsed: 0.0,
            started: false,
        }
    }

    /// Create an animation from a prebuilt frame list
    pub fn from_frames(frames: Vec<Sprite>, seconds_per_frame: f32, mode: PlayMode) -> Self {
        let mut anim = Self::new(seconds_per_frame, mode);
        for frame in frames {
            anim.add_frame(frame);
        }
        anim
    }

    /// Append a frame
    ///
    /// All frames must share one texture and one pixel size; mixing is a
    /// programmer error caught by a debug assertion.
    pub fn add_frame(&mut self, frame: Sprite) {
        if let Some(first) = self.frames.first() {
            debug_assert!(
                first.texture() == frame.texture(),
                "animation frames must share a texture"
            );
            debug_assert!(
                first.width() == frame.width() && first.height() == frame.height(),
                "animation frames must share pixel dimensions ({}x{} != {}x{})",
                first.width(),
                first.height(),
                frame.width(),
                frame.height(),
            );
        }

        self.frames.push(frame);
        if !self.started {
            self.frame = initial_frame(self.mode, self.frames.len());
        }
    }

    /// Number of frames
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Index of the frame currently shown
    pub fn current_frame(&self) -> usize {
        self.frame.max(0) as usize
    }

    /// Current playback mode
    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    /// Switch playback mode, restarting from that mode's initial state
    pub fn set_mode(&mut self, mode: PlayMode) {
        self.mode = mode;
        self.frame = initial_frame(mode, self.frames.len());
        self.direction = initial_direction(mode);
        self.elapsed = 0.0;
        self.started = false;
    }

    /// Whether a one-shot mode has reached its resting frame
    ///
    /// `Normal` rests on the last frame, `Reversed` on the first; looping
    /// modes never finish. Callers wanting play-once-then-notify poll this.
    pub fn is_finished(&self) -> bool {
        match self.mode {
            PlayMode::Normal => self.started && self.frame as usize + 1 == self.frames.len(),
            PlayMode::Reversed => self.started && self.frame == 0,
            PlayMode::Loop | PlayMode::LoopPingPong => false,
        }
    }

    /// Advance playback by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        if self.frames.is_empty() {
            return;
        }
        self.started = true;

        self.elapsed += dt;
        while self.elapsed >= self.seconds_per_frame {
            self.elapsed -= self.seconds_per_frame;
            self.step();
        }
    }

    fn step(&mut self) {
        let count = self.frames.len() as i32;
        self.frame += self.direction;

        match self.mode {
            PlayMode::Normal => {
                if self.frame >= count {
                    self.frame = count - 1;
                }
            }
            PlayMode::Reversed => {
                if self.frame < 0 {
                    self.frame = 0;
                }
            }
            PlayMode::Loop => {
                if self.frame >= count {
                    self.frame = 0;
                }
            }
            PlayMode::LoopPingPong => {
                if self.frame >= count {
                    self.frame = count - 1;
                    self.direction = -1;
                } else if self.frame < 0 {
                    self.frame = 0;
                    self.direction = 1;
                }
            }
        }
    }

    fn current(&self) -> &Sprite {
        debug_assert!(!self.frames.is_empty(), "animation has no frames");
        &self.frames[self.current_frame()]
    }
}

fn initial_frame(mode: PlayMode, count: usize) -> i32 {
    match mode {
        PlayMode::Reversed => count.saturating_sub(1) as i32,
        _ => 0,
    }
}

fn initial_direction(mode: PlayMode) -> i32 {
    match mode {
        PlayMode::Reversed => -1,
        _ => 1,
    }
}

impl SpriteSource for AnimatedSprite {
    fn texture(&self) -> TextureHandle {
        self.current().texture()
    }

    fn width(&self) -> u32 {
        self.current().width()
    }

    fn height(&self) -> u32 {
        self.current().height()
    }

    fn uv_min(&self) -> Vec2 {
        self.current().uv_min()
    }

    fn uv_max(&self) -> Vec2 {
        self.current().uv_max()
    }
}
