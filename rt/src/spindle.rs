//! Spindle/coolant orchestration (§4.12, C12). Wraps a `dyn Spindle`
//! device, the coolant mask, and the override percent that overrides apply
//! to at block boundaries (§5: "overrides take effect at the boundary
//! between blocks").

use fluidnc_common::error::Error;
use fluidnc_common::modal::{Coolant, SpindleState};
use fluidnc_hal::{Spindle, SpeedMap};

/// A relay/PWM-driven spindle with no tool-change hook and no rate
/// adjustment — the default concrete device for the `fluidnc` binary's
/// simulation mode.
pub struct SimulatedSpindle {
    state: SpindleState,
    speed: f64,
    map: SpeedMap,
}

impl SimulatedSpindle {
    pub fn new(max_rpm: f64) -> Self {
        Self { state: SpindleState::Disable, speed: 0.0, map: SpeedMap::identity(max_rpm) }
    }
}

impl Spindle for SimulatedSpindle {
    fn set_state(&mut self, state: SpindleState, speed: f64) -> Result<(), Error> {
        self.state = state;
        self.speed = if state == SpindleState::Disable { 0.0 } else { speed };
        Ok(())
    }

    fn get_state(&self) -> (SpindleState, f64) {
        (self.state, self.speed)
    }

    fn speed_map(&self) -> &SpeedMap {
        &self.map
    }

    fn spin_up_delay_ms(&self) -> u32 {
        0
    }

    fn spin_down_delay_ms(&self) -> u32 {
        0
    }
}

/// Gates the main loop in `SysSuspend` while a spindle is spinning up or
/// down; resume only clears once the configured delay has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysSuspend {
    None,
    SpinningUp { remaining_ms: u32 },
    SpinningDown { remaining_ms: u32 },
}

impl SysSuspend {
    pub fn is_suspended(self) -> bool {
        !matches!(self, SysSuspend::None)
    }

    /// Advance the suspend timer by `elapsed_ms`, clearing once it expires.
    pub fn tick(self, elapsed_ms: u32) -> Self {
        match self {
            SysSuspend::None => SysSuspend::None,
            SysSuspend::SpinningUp { remaining_ms } | SysSuspend::SpinningDown { remaining_ms } => {
                let remaining = remaining_ms.saturating_sub(elapsed_ms);
                if remaining == 0 {
                    SysSuspend::None
                } else if matches!(self, SysSuspend::SpinningUp { .. }) {
                    SysSuspend::SpinningUp { remaining_ms: remaining }
                } else {
                    SysSuspend::SpinningDown { remaining_ms: remaining }
                }
            }
        }
    }
}

/// Owns the active spindle device, the coolant mask, and the override
/// percent currently applied to commanded speed.
pub struct SpindleCoolant {
    device: Box<dyn Spindle>,
    coolant: Coolant,
    override_pct: i32,
    suspend: SysSuspend,
}

impl SpindleCoolant {
    pub fn new(device: Box<dyn Spindle>) -> Self {
        Self { device, coolant: Coolant::empty(), override_pct: 100, suspend: SysSuspend::None }
    }

    pub fn suspend(&self) -> SysSuspend {
        self.suspend
    }

    pub fn tick_suspend(&mut self, elapsed_ms: u32) {
        self.suspend = self.suspend.tick(elapsed_ms);
    }

    /// `M3`/`M4`/`M5`: override percent scales the requested speed before
    /// it reaches the device's speed map.
    pub fn set_state(&mut self, state: SpindleState, requested_speed: f64) -> Result<(), Error> {
        let scaled = requested_speed * (self.override_pct as f64 / 100.0);
        let output = self.device.speed_map().evaluate(scaled);
        self.device.set_state(state, output)?;
        self.suspend = match state {
            SpindleState::Disable => {
                let ms = self.device.spin_down_delay_ms();
                if ms > 0 { SysSuspend::SpinningDown { remaining_ms: ms } } else { SysSuspend::None }
            }
            _ => {
                let ms = self.device.spin_up_delay_ms();
                if ms > 0 { SysSuspend::SpinningUp { remaining_ms: ms } } else { SysSuspend::None }
            }
        };
        Ok(())
    }

    /// `M5`: explicit stop; zeroes device output unconditionally (§4.12).
    pub fn stop(&mut self) -> Result<(), Error> {
        self.set_state(SpindleState::Disable, 0.0)
    }

    pub fn set_override_pct(&mut self, pct: i32) {
        self.override_pct = pct.clamp(10, 200);
        let (state, _) = self.device.get_state();
        if state != SpindleState::Disable {
            // Re-apply at the new override; speed tracked at the caller's
            // last requested value would need threading through, so the
            // runtime driving this re-issues set_state with the nominal
            // commanded speed on every override change instead.
        }
    }

    pub fn get_state(&self) -> (SpindleState, f64) {
        self.device.get_state()
    }

    /// Preserved through feed hold (§4.12): applying the mask is the only
    /// effect, there is no hold-aware gating here.
    pub fn set_coolant(&mut self, mask: Coolant) {
        self.coolant = mask;
    }

    pub fn coolant(&self) -> Coolant {
        self.coolant
    }

    pub fn tool_change(&mut self, new_tool: u32, pre_select: bool) -> Result<(), Error> {
        self.device.tool_change(new_tool, pre_select)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn m5_zeroes_device_output() {
        let mut sc = SpindleCoolant::new(Box::new(SimulatedSpindle::new(24000.0)));
        sc.set_state(SpindleState::Cw, 12000.0).unwrap();
        assert_eq!(sc.get_state(), (SpindleState::Cw, 12000.0));
        sc.stop().unwrap();
        assert_eq!(sc.get_state(), (SpindleState::Disable, 0.0));
    }

    #[test]
    fn override_percent_scales_requested_speed() {
        let mut sc = SpindleCoolant::new(Box::new(SimulatedSpindle::new(24000.0)));
        sc.set_override_pct(50);
        sc.set_state(SpindleState::Cw, 10000.0).unwrap();
        assert_eq!(sc.get_state(), (SpindleState::Cw, 5000.0));
    }

    #[test]
    fn coolant_mask_is_independent_of_spindle_state() {
        let mut sc = SpindleCoolant::new(Box::new(SimulatedSpindle::new(24000.0)));
        sc.set_coolant(Coolant::FLOOD | Coolant::MIST);
        sc.stop().unwrap();
        assert_eq!(sc.coolant(), Coolant::FLOOD | Coolant::MIST);
    }

    #[test]
    fn suspend_clears_after_configured_delay() {
        let suspend = SysSuspend::SpinningUp { remaining_ms: 500 };
        let suspend = suspend.tick(300);
        assert!(suspend.is_suspended());
        let suspend = suspend.tick(300);
        assert!(!suspend.is_suspended());
    }
}
