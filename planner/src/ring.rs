//! The planner ring buffer (spec component C4): a FIFO of [`Block`]s with
//! look-ahead velocity planning across the whole queue every time a block
//! is added or a dirty flag forces a full recompute.

use std::collections::VecDeque;

use fluidnc_common::axis::MachineConfig;
use fluidnc_kinematics::Kinematics;
use tracing::{debug, trace};

use crate::block::Block;
use crate::line_data::LineData;

/// Safety margin below "exactly equal" used when comparing a recomputed
/// entry speed to the block's stored one, so floating-point noise doesn't
/// make the reverse pass loop forever without ever terminating early.
const SPEED_EPSILON: f64 = 1e-6;

pub struct PlannerRing {
    capacity: usize,
    blocks: VecDeque<Block>,
    /// The cartesian position the most recently enqueued block ends at
    /// (or the machine position, if the ring is empty).
    current_mpos: Vec<f64>,
}

impl PlannerRing {
    pub fn new(machine: &MachineConfig, initial_mpos: Vec<f64>) -> Self {
        Self {
            capacity: machine.planner_buffer_capacity,
            blocks: VecDeque::with_capacity(machine.planner_buffer_capacity),
            current_mpos: initial_mpos,
        }
    }

    pub fn is_full(&self) -> bool {
        self.blocks.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// The block about to be (or currently being) stepped, the ring's tail.
    pub fn peek_current_block(&self) -> Option<&Block> {
        self.blocks.front()
    }

    /// Drop the tail block once the step engine has consumed it fully.
    pub fn discard_current_block(&mut self) -> Option<Block> {
        self.blocks.pop_front()
    }

    /// Drop every queued block immediately (realtime-queue overflow, or a
    /// hard reset): the ring goes empty without stepping anything further.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// The cartesian position the planner currently considers "planned up
    /// to" — distinct from the step engine's actually-executed position.
    pub fn planned_mpos(&self) -> &[f64] {
        &self.current_mpos
    }

    /// Steps 1-9 of the planner algorithm. Returns `Ok(true)` if the block
    /// was enqueued, `Ok(false)` if it was silently dropped (zero distance,
    /// or the caller reports a jog cancellation arrived mid-plan).
    pub fn plan_line(
        &mut self,
        target_mpos: &[f64],
        line_data: LineData,
        kinematics: &dyn Kinematics,
        machine: &MachineConfig,
        jog_cancelled: bool,
    ) -> bool {
        if jog_cancelled {
            trace!("plan_line: jog cancelled before block was queued");
            return false;
        }

        // Step 1: per-motor deltas and distance, in driven (motor) space.
        let motor_target = kinematics.cartesian_to_motors(target_mpos);
        let motor_current = kinematics.cartesian_to_motors(&self.current_mpos);
        let distance_mm = kinematics.distance(&self.current_mpos, target_mpos);

        // Step 2: drop zero-distance blocks silently (e.g. a pure dwell or
        // a no-op coordinate-system switch that didn't move anything).
        if distance_mm <= 0.0 {
            trace!("plan_line: zero-distance block dropped");
            return false;
        }

        let unit_vec: Vec<f64> = motor_target
            .iter()
            .zip(&motor_current)
            .map(|(t, c)| (t - c) / distance_mm)
            .collect();

        // Step 3: acceleration is the tightest per-axis limit along this
        // move's direction; an axis barely participating in the move (unit
        // component near zero) shouldn't constrain it.
        let acceleration_mm_per_min2 = machine
            .axes
            .iter()
            .zip(&unit_vec)
            .filter(|(_, u)| u.abs() > 1e-9)
            .map(|(axis, u)| axis.acceleration_mm_per_min2 / u.abs())
            .fold(f64::INFINITY, f64::min);
        let acceleration_mm_per_min2 = if acceleration_mm_per_min2.is_finite() {
            acceleration_mm_per_min2
        } else {
            machine
                .axes
                .iter()
                .map(|a| a.acceleration_mm_per_min2)
                .fold(f64::INFINITY, f64::min)
        };

        // Step 4: nominal speed from the feed word (or G93 inverse-time),
        // then clamp to whatever the slowest participating axis allows.
        let requested_speed = if line_data.inverse_time {
            if line_data.feed_rate > 0.0 {
                distance_mm / line_data.feed_rate
            } else {
                0.0
            }
        } else {
            line_data.feed_rate
        };
        let rate_limit = machine
            .axes
            .iter()
            .zip(&unit_vec)
            .filter(|(_, u)| u.abs() > 1e-9)
            .map(|(axis, u)| axis.max_rate_mm_per_min / u.abs())
            .fold(f64::INFINITY, f64::min);
        let nominal_speed_mm_per_min = if rate_limit.is_finite() {
            requested_speed.min(rate_limit)
        } else {
            requested_speed
        };

        // Step 5: junction speed against the most recently queued block,
        // via the centripetal-cosine formula; an empty ring starts from
        // rest, and a near-reversal (cos_theta ~ -1) also starts from rest.
        let v_junction = match self.blocks.back() {
            None => 0.0,
            Some(prev) => {
                let cos_theta: f64 = prev
                    .motor_unit_vec
                    .iter()
                    .zip(&unit_vec)
                    .map(|(a, b)| a * b)
                    .sum::<f64>()
                    .clamp(-1.0, 1.0);
                if cos_theta < -0.999 {
                    0.0
                } else {
                    let sine_term_inv = ((1.0 - cos_theta) / 2.0).sqrt();
                    if sine_term_inv < 1e-9 {
                        nominal_speed_mm_per_min.min(prev.nominal_speed_mm_per_min)
                    } else {
                        (acceleration_mm_per_min2 * machine.junction_deviation_mm * sine_term_inv
                            / (1.0 - sine_term_inv * sine_term_inv))
                            .max(0.0)
                            .sqrt()
                    }
                }
            }
        };

        // Step 6: entry speed can't exceed either block's nominal speed.
        let entry_speed_mm_per_min = nominal_speed_mm_per_min
            .min(v_junction)
            .min(self.blocks.back().map(|b| b.nominal_speed_mm_per_min).unwrap_or(f64::INFINITY));

        self.current_mpos = target_mpos.to_vec();

        let block = Block {
            target_mpos: target_mpos.to_vec(),
            motor_unit_vec: unit_vec,
            distance_mm,
            acceleration_mm_per_min2,
            nominal_speed_mm_per_min,
            entry_speed_mm_per_min,
            exit_speed_mm_per_min: 0.0,
            line_data,
        };

        if self.blocks.len() == self.capacity {
            debug!("planner ring at capacity, dropping oldest unconsumed block");
            self.blocks.pop_front();
        }
        self.blocks.push_back(block);
        self.recompute();
        true
    }

    /// Steps 7-9: reverse pass tightens entry speeds so every block can
    /// decelerate into whatever its successor demands; forward pass then
    /// propagates the tightened entries forward as achievable exit speeds.
    /// Call this directly after an override or spindle-speed change that
    /// invalidates the whole buffer's plan, not just the newest block.
    pub fn recompute(&mut self) {
        let len = self.blocks.len();
        if len == 0 {
            return;
        }

        // Reverse pass: walk from the most recently queued block back
        // toward the one about to execute, tightening each block's entry
        // speed to whatever lets it decelerate into its successor's entry.
        for i in (0..len.saturating_sub(1)).rev() {
            let next_entry = self.blocks[i + 1].entry_speed_mm_per_min;
            let reachable = self.blocks[i].max_speed_after(next_entry);
            let candidate = self.blocks[i].entry_speed_mm_per_min.min(reachable);
            if candidate + SPEED_EPSILON < self.blocks[i].entry_speed_mm_per_min {
                self.blocks[i].entry_speed_mm_per_min = candidate;
            } else {
                break;
            }
        }

        // Forward pass: walk tail to head, setting each block's exit speed
        // to the fastest it can accelerate to while still not exceeding
        // what the next block's (already reverse-pass-tightened) entry
        // speed allows.
        for i in 0..len {
            let next_entry = self
                .blocks
                .get(i + 1)
                .map(|b| b.entry_speed_mm_per_min)
                .unwrap_or(0.0);
            let block = &mut self.blocks[i];
            let reachable = block.max_speed_after(block.entry_speed_mm_per_min);
            block.exit_speed_mm_per_min = block.nominal_speed_mm_per_min.min(reachable).min(next_entry);
        }

        // Step 9: the last block in the ring must come to rest — there is
        // no successor to plan a nonzero junction into.
        if let Some(last) = self.blocks.back_mut() {
            last.exit_speed_mm_per_min = 0.0;
        }
    }

    /// Force every stored block to be replanned from scratch on the next
    /// [`PlannerRing::recompute`] call — used when a feed/rapid override or
    /// spindle-speed change invalidates the whole buffer's cached plan.
    pub fn mark_dirty(&mut self) {
        self.recompute();
    }
}
