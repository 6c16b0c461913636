//! Automatable parameter with a scheduled value timeline
//!
//! Follows the Web Audio `AudioParam` model:
//! - `set_value_at_time`: step to a value at a time
//! - `linear_ramp_to_value_at_time`: straight line from the previous event
//! - `exponential_ramp_to_value_at_time`: geometric curve from the previous event
//! - `cancel_scheduled_values`: drop every event at or after a time
//!
//! Times are seconds on the owning context's clock. A ramp starts where the
//! previous event ends; with no previous event it starts from the intrinsic
//! value at time zero.

use crate::error::{AudioError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Automation {
    SetValue { value: f32, time: f64 },
    LinearRamp { value: f32, end_time: f64 },
    ExponentialRamp { value: f32, end_time: f64 },
}

impl Automation {
    fn time(&self) -> f64 {
        match *self {
            Automation::SetValue { time, .. } => time,
            Automation::LinearRamp { end_time, .. } | Automation::ExponentialRamp { end_time, .. } => {
                end_time
            }
        }
    }

    fn value(&self) -> f32 {
        match *self {
            Automation::SetValue { value, .. }
            | Automation::LinearRamp { value, .. }
            | Automation::ExponentialRamp { value, .. } => value,
        }
    }
}

/// Parameter value plus its automation events, ordered by time
#[derive(Debug, Clone)]
pub struct AudioParam {
    /// Value before the first event (and after pruning)
    value: f32,
    events: Vec<Automation>,
}

impl AudioParam {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            events: Vec::new(),
        }
    }

    /// Set the intrinsic value, discarding all automation
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
        self.events.clear();
    }

    /// Step to `value` at `time`
    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> Result<()> {
        check_time(time)?;
        self.insert(Automation::SetValue { value, time });
        Ok(())
    }

    /// Linear ramp from the previous event to `value`, reached at `end_time`
    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) -> Result<()> {
        check_time(end_time)?;
        self.insert(Automation::LinearRamp { value, end_time });
        Ok(())
    }

    /// Exponential ramp from the previous event to `value`, reached at `end_time`
    ///
    /// `value` must be strictly positive; an exponential curve never reaches
    /// zero, so fades target a small floor instead.
    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) -> Result<()> {
        check_time(end_time)?;
        if !(value.is_finite() && value > 0.0) {
            return Err(AudioError::InvalidRampTarget(value));
        }
        self.insert(Automation::ExponentialRamp { value, end_time });
        Ok(())
    }

    /// Remove every event whose time is at or after `time`
    pub fn cancel_scheduled_values(&mut self, time: f64) -> Result<()> {
        check_time(time)?;
        self.events.retain(|event| event.time() < time);
        Ok(())
    }

    /// Number of pending automation events
    pub fn scheduled_events(&self) -> usize {
        self.events.len()
    }

    /// Computed value at `time`
    pub fn value_at(&self, time: f64) -> f32 {
        // Last settled point on the timeline
        let mut value = self.value;
        let mut point = 0.0_f64;

        for event in &self.events {
            match *event {
                Automation::SetValue { value: v, time: t } => {
                    if t > time {
                        return value;
                    }
                    value = v;
                    point = t;
                }
                Automation::LinearRamp {
                    value: target,
                    end_time,
                } => {
                    if end_time <= time || end_time <= point {
                        value = target;
                        point = end_time.max(point);
                        continue;
                    }
                    let progress = ((time - point) / (end_time - point)) as f32;
                    return value + (target - value) * progress;
                }
                Automation::ExponentialRamp {
                    value: target,
                    end_time,
                } => {
                    if end_time <= time || end_time <= point {
                        value = target;
                        point = end_time.max(point);
                        continue;
                    }
                    // Zero or sign change holds the start value until the end
                    if value == 0.0 || value.signum() != target.signum() {
                        return value;
                    }
                    let progress = ((time - point) / (end_time - point)) as f32;
                    return value * (target / value).powf(progress);
                }
            }
        }

        value
    }

    /// Fold events that finished before `time` into the intrinsic value
    ///
    /// Called once per render block so the event list stays short.
    pub fn prune(&mut self, time: f64) {
        let settled = self
            .events
            .iter()
            .take_while(|event| event.time() <= time)
            .count();

        // Keep the last settled event: it anchors the start of the next ramp
        if settled > 1 {
            let anchor = settled - 1;
            self.value = self.events[anchor - 1].value();
            self.events.drain(..anchor);
        }
    }
}

impl Default for AudioParam {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn check_time(time: f64) -> Result<()> {
    if time.is_finite() && time >= 0.0 {
        Ok(())
    } else {
        Err(AudioError::InvalidTime(time))
    }
}

impl AudioParam {
    /// Events at equal times keep insertion order
    fn insert(&mut self, event: Automation) {
        let index = self
            .events
            .iter()
            .position(|existing| existing.time() > event.time())
            .unwrap_or(self.events.len());
        self.events.insert(index, event);
    }
}
