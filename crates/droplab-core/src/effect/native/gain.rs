//! Level effects - fade envelope and peak ceiling

use crate::effect::{Effect, EffectBase, EffectInfo, ParamInfo, ParamValue};
use crate::types::{Sample, SampleBuffer};

/// Implements the parameter plumbing shared by every effect in this file
macro_rules! delegate_base {
    () => {
        fn info(&self) -> &EffectInfo {
            self.base.info()
        }

        fn get_params(&self) -> &[ParamValue] {
            self.base.get_params()
        }

        fn set_param(&mut self, index: usize, value: f32) {
            self.base.set_param(index, value);
        }

        fn set_bypass(&mut self, bypass: bool) {
            self.base.set_bypass(bypass);
        }

        fn is_bypassed(&self) -> bool {
            self.base.is_bypassed()
        }

        fn reset(&mut self) {
            // No state to reset
        }
    };
}

/// Linear fade-in and fade-out at the buffer edges
///
/// Parameters:
/// - Fade: fraction of the buffer used by each ramp (0.0-0.5)
///
/// The first and last frames land exactly on silence.
pub struct FadeEffect {
    base: EffectBase,
}

impl FadeEffect {
    pub fn new(fraction: f32) -> Self {
        let info = EffectInfo::new("Fade", "Utility").with_param(
            ParamInfo::new("Fade", 0.2)
                .with_range(0.0, 0.5)
                .with_unit("%"),
        );
        let mut base = EffectBase::new(info);
        base.set_actual(0, fraction);
        Self { base }
    }

    pub fn fraction(&self) -> f32 {
        self.base.param_actual(0)
    }

    /// Envelope value at a frame
    fn envelope(frame: usize, frames: usize, ramp: usize) -> Sample {
        if ramp == 0 {
            return 1.0;
        }
        let fade_in = frame as Sample / ramp as Sample;
        let fade_out = (frames - 1 - frame) as Sample / ramp as Sample;
        fade_in.min(fade_out).min(1.0)
    }
}

impl Effect for FadeEffect {
    fn process(&mut self, buffer: &mut SampleBuffer) {
        if self.base.is_bypassed() || buffer.is_empty() {
            return;
        }

        let frames = buffer.frames();
        let channels = buffer.channels() as usize;
        let ramp = (frames as f32 * self.fraction()).round() as usize;
        if ramp == 0 {
            return;
        }

        for (i, frame) in buffer.samples_mut().chunks_exact_mut(channels).enumerate() {
            let gain = Self::envelope(i, frames, ramp);
            frame.iter_mut().for_each(|s| *s *= gain);
        }
    }

    delegate_base!();
}

/// Scales the whole buffer down when its peak exceeds the ceiling
///
/// Parameters:
/// - Ceiling: maximum absolute sample value (0.0-1.0)
pub struct LimiterEffect {
    base: EffectBase,
}

impl LimiterEffect {
    pub fn new(ceiling: f32) -> Self {
        let info = EffectInfo::new("Limiter", "Dynamics")
            .with_param(ParamInfo::new("Ceiling", 1.0).with_range(0.0, 1.0));
        let mut base = EffectBase::new(info);
        base.set_actual(0, ceiling);
        Self { base }
    }

    fn ceiling(&self) -> f32 {
        self.base.param_actual(0)
    }
}

impl Effect for LimiterEffect {
    fn process(&mut self, buffer: &mut SampleBuffer) {
        if self.base.is_bypassed() {
            return;
        }
        let peak = buffer.peak();
        let ceiling = self.ceiling();
        if peak > ceiling && peak > 0.0 {
            log::debug!("LimiterEffect: peak {:.3} scaled to {:.3}", peak, ceiling);
            buffer.scale(ceiling / peak);
        }
    }

    delegate_base!();
}
