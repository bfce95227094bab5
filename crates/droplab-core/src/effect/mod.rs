//! Effect system - trait, parameter descriptions and effect chains
//!
//! Effects run offline over a whole [`SampleBuffer`], so time-varying
//! behaviour (sweeps, fades) is expressed relative to the buffer length
//! rather than through automation.

pub mod native;

use crate::types::SampleBuffer;

/// Information about an effect parameter
#[derive(Debug, Clone)]
pub struct ParamInfo {
    /// Parameter name for display
    pub name: String,
    /// Default value (0.0-1.0)
    pub default: f32,
    /// Minimum actual value
    pub min: f32,
    /// Maximum actual value
    pub max: f32,
    /// Unit label (e.g., "Hz", "Q", "%")
    pub unit: String,
}

impl Default for ParamInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            default: 0.5,
            min: 0.0,
            max: 1.0,
            unit: String::new(),
        }
    }
}

impl ParamInfo {
    /// Create a new parameter info with name and normalized default
    pub fn new(name: impl Into<String>, default: f32) -> Self {
        Self {
            name: name.into(),
            default,
            ..Default::default()
        }
    }

    /// Set the value range
    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Set the unit label
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Map an actual value back into 0.0-1.0
    pub fn normalize(&self, actual: f32) -> f32 {
        if self.max == self.min {
            return 0.0;
        }
        ((actual - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

/// Current parameter value
#[derive(Debug, Clone, Copy)]
pub struct ParamValue {
    /// Normalized value (0.0-1.0)
    pub normalized: f32,
    /// Actual value after range mapping
    pub actual: f32,
}

impl ParamValue {
    /// Create from normalized value with the given param info
    pub fn from_normalized(normalized: f32, info: &ParamInfo) -> Self {
        let normalized = normalized.clamp(0.0, 1.0);
        let actual = info.min + normalized * (info.max - info.min);
        Self { normalized, actual }
    }

    /// Create from an actual value, clamped into the parameter range
    pub fn from_actual(actual: f32, info: &ParamInfo) -> Self {
        Self::from_normalized(info.normalize(actual), info)
    }
}

/// Information about an effect
#[derive(Debug, Clone)]
pub struct EffectInfo {
    /// Effect name for display
    pub name: String,
    /// Effect category (e.g., "Filter", "Utility")
    pub category: String,
    /// Parameter descriptions
    pub params: Vec<ParamInfo>,
}

impl EffectInfo {
    /// Create a new effect info
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            params: Vec::new(),
        }
    }

    /// Add a parameter to this effect
    pub fn with_param(mut self, param: ParamInfo) -> Self {
        self.params.push(param);
        self
    }

    /// Get the number of parameters
    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

/// The core effect trait - implemented by all offline effects
pub trait Effect: Send {
    /// Process a buffer in place
    ///
    /// Any channel count and sample rate must be accepted.
    fn process(&mut self, buffer: &mut SampleBuffer);

    /// Get information about this effect (name, category, parameters)
    fn info(&self) -> &EffectInfo;

    /// Get the current parameter values
    fn get_params(&self) -> &[ParamValue];

    /// Set a parameter by index (normalized value 0.0-1.0)
    fn set_param(&mut self, index: usize, value: f32);

    /// Set the bypass state
    fn set_bypass(&mut self, bypass: bool);

    /// Check if the effect is bypassed
    fn is_bypassed(&self) -> bool;

    /// Clear internal state so the next buffer starts fresh
    fn reset(&mut self);
}

/// Base implementation helper for effects
///
/// Holds bypass state and parameter storage.
#[derive(Debug, Clone)]
pub struct EffectBase {
    info: EffectInfo,
    params: Vec<ParamValue>,
    bypassed: bool,
}

impl EffectBase {
    /// Create a new effect base from effect info
    pub fn new(info: EffectInfo) -> Self {
        let params: Vec<ParamValue> = info
            .params
            .iter()
            .map(|p| ParamValue::from_normalized(p.default, p))
            .collect();
        Self {
            info,
            params,
            bypassed: false,
        }
    }

    pub fn info(&self) -> &EffectInfo {
        &self.info
    }

    pub fn get_params(&self) -> &[ParamValue] {
        &self.params
    }

    /// Set a parameter from a normalized value
    pub fn set_param(&mut self, index: usize, value: f32) {
        if index < self.params.len() {
            self.params[index] = ParamValue::from_normalized(value, &self.info.params[index]);
        }
    }

    /// Set a parameter from an actual value (Hz, Q, ...)
    pub fn set_actual(&mut self, index: usize, value: f32) {
        if index < self.params.len() {
            self.params[index] = ParamValue::from_actual(value, &self.info.params[index]);
        }
    }

    /// Get a parameter's actual (denormalized) value
    pub fn param_actual(&self, index: usize) -> f32 {
        self.params.get(index).map(|p| p.actual).unwrap_or(0.0)
    }

    pub fn set_bypass(&mut self, bypass: bool) {
        self.bypassed = bypass;
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }
}

/// Parameter settings an effect was run with
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSnapshot {
    pub name: String,
    /// (parameter name, actual value, unit)
    pub params: Vec<(String, f32, String)>,
}

impl EffectSnapshot {
    /// Capture the current parameters of an effect
    pub fn capture(effect: &dyn Effect) -> Self {
        let info = effect.info();
        let params = info
            .params
            .iter()
            .zip(effect.get_params())
            .map(|(p, v)| (p.name.clone(), v.actual, p.unit.clone()))
            .collect();
        Self {
            name: info.name.clone(),
            params,
        }
    }

    /// Actual value of a named parameter
    pub fn param(&self, name: &str) -> Option<f32> {
        self.params
            .iter()
            .find(|(n, _, _)| n == name)
            .map(|(_, v, _)| *v)
    }
}

/// Effects applied in order
#[derive(Default)]
pub struct EffectChain {
    effects: Vec<Box<dyn Effect>>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an effect to the end of the chain
    pub fn with(mut self, effect: impl Effect + 'static) -> Self {
        self.effects.push(Box::new(effect));
        self
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Run every effect over the buffer
    pub fn process(&mut self, buffer: &mut SampleBuffer) {
        for effect in &mut self.effects {
            log::debug!(
                "EffectChain::process: {} ({} frames)",
                effect.info().name,
                buffer.frames()
            );
            effect.process(buffer);
        }
    }

    /// Parameter snapshots of all non-bypassed effects
    pub fn snapshots(&self) -> Vec<EffectSnapshot> {
        self.effects
            .iter()
            .filter(|e| !e.is_bypassed())
            .map(|e| EffectSnapshot::capture(e.as_ref()))
            .collect()
    }
}
