//! Volume ramps
//!
//! Pure interpolation math, sampled by elapsed wall-clock time rather than by
//! tick count so the result does not depend on how often it is sampled.

use std::time::Duration;

/// Smallest playback rate used for duration compensation
const MIN_RATE: f32 = 0.0001;

/// Clamp a volume to [0, 1], mapping NaN to silence
#[inline]
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Playback rate usable as a divisor
#[inline]
pub fn sanitize_rate(rate: f32) -> f32 {
    if rate.is_finite() && rate > 0.0 {
        rate.max(MIN_RATE)
    } else {
        1.0
    }
}

/// How a requested fade duration becomes wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeProfile {
    /// Shortest fade ever run
    pub min_duration: Duration,

    /// Scale the duration by `1 / playback_rate`
    pub rate_compensated: bool,
}

impl FadeProfile {
    /// Audio fades keep their length in played-content time
    pub const AUDIO: FadeProfile = FadeProfile {
        min_duration: Duration::from_millis(60),
        rate_compensated: true,
    };

    /// Video fades run in plain wall-clock time
    pub const VIDEO: FadeProfile = FadeProfile {
        min_duration: Duration::from_millis(100),
        rate_compensated: false,
    };

    /// Wall-clock duration of a fade requested as `requested`
    pub fn effective_duration(&self, requested: Duration, playback_rate: f32) -> Duration {
        let scaled = if self.rate_compensated {
            let rate = f64::from(sanitize_rate(playback_rate));
            Duration::try_from_secs_f64(requested.as_secs_f64() / rate).unwrap_or(Duration::MAX)
        } else {
            requested
        };
        scaled.max(self.min_duration)
    }
}

/// Linear ramp from one volume to another
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeRamp {
    from: f32,
    to: f32,
    duration: Duration,
}

impl VolumeRamp {
    /// Create a ramp; both volumes are clamped to [0, 1]
    pub fn new(from: f32, to: f32, duration: Duration) -> Self {
        Self {
            from: clamp_volume(from),
            to: clamp_volume(to),
            duration,
        }
    }

    /// Start volume
    pub fn start_volume(&self) -> f32 {
        self.from
    }

    /// Target volume
    pub fn target_volume(&self) -> f32 {
        self.to
    }

    /// Ramp length
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Whether the ramp has reached its target at `elapsed`
    pub fn is_complete(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }

    /// Volume at `elapsed` since the ramp started
    ///
    /// Exactly the target once complete. Intermediate values stay between
    /// the endpoints even where float rounding would overshoot.
    pub fn sample(&self, elapsed: Duration) -> f32 {
        if self.is_complete(elapsed) {
            return self.to;
        }

        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        let value = self.from + (self.to - self.from) * t;
        let (low, high) = if self.from <= self.to {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        };
        value.clamp(low, high)
    }
}
