//! Realtime-command byte decoding (§4.9, §6): single bytes picked off the
//! serial stream out-of-band and never buffered into a line. Codes and
//! override step sizes mirror `RealtimeCmd.h`/`RealtimeCmd.cpp` in the
//! source machine.

/// One tick of an override dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideStep {
    Reset,
    CoarsePlus,
    CoarseMinus,
    FinePlus,
    FineMinus,
}

/// Rapid override only has three fixed levels, not a dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RapidLevel {
    Full,
    Medium,
    Low,
}

/// A decoded pin change from a remote I/O expander (§4.9: "encodes pin
/// changes as a two-byte realtime sequence").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinEvent {
    pub pin: u8,
    pub active: bool,
}

/// Everything a single realtime byte (or byte pair, for pin events) can
/// resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeEvent {
    Reset,
    StatusReport,
    CycleStart,
    FeedHold,
    SafetyDoor,
    JogCancel,
    DebugReport,
    /// `Macro0`..`Macro3`; §4.10 also allows macros 4-9 but those are only
    /// reachable as job-stack invocations, not realtime bytes.
    Macro(u8),
    FeedOverride(OverrideStep),
    RapidOverride(RapidLevel),
    SpindleOverride(OverrideStep),
    SpindleStop,
    CoolantFloodToggle,
    CoolantMistToggle,
    Pin(PinEvent),
}

/// Standard Grbl/FluidNC override step sizes and bounds, percent.
pub const FEED_OVERRIDE_MIN: i32 = 10;
pub const FEED_OVERRIDE_MAX: i32 = 200;
pub const FEED_OVERRIDE_DEFAULT: i32 = 100;
pub const FEED_OVERRIDE_COARSE: i32 = 10;
pub const FEED_OVERRIDE_FINE: i32 = 1;
pub const SPINDLE_OVERRIDE_MIN: i32 = 10;
pub const SPINDLE_OVERRIDE_MAX: i32 = 200;
pub const SPINDLE_OVERRIDE_DEFAULT: i32 = 100;
pub const SPINDLE_OVERRIDE_COARSE: i32 = 10;
pub const SPINDLE_OVERRIDE_FINE: i32 = 1;

/// Stateful decoder: most realtime bytes resolve standalone, but a pin
/// event needs to remember the previous byte (`0xC4`/`0xC5`) across a call
/// boundary. One instance per channel; `reset()` on any framing error so a
/// stray leading continuation byte can't corrupt a later, valid sequence
/// (§8 "UTF-8 robustness": malformed input is reported, not propagated).
#[derive(Debug, Default)]
pub struct RealtimeDecoder {
    pending_pin_active: Option<bool>,
}

/// Outcome of feeding one byte to the decoder.
pub enum Decoded {
    Event(RealtimeEvent),
    /// First half of a two-byte pin sequence; consumed, no event yet.
    Pending,
    /// Not a realtime byte at all — the caller should treat it as line text.
    NotRealtime,
}

impl RealtimeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.pending_pin_active = None;
    }

    /// Whether `byte` is ever realtime (out-of-band), independent of
    /// whether it currently decodes to a *known* event — used by the line
    /// editor to decide "pick this off, don't buffer it" before dispatch.
    pub fn is_realtime_byte(byte: u8) -> bool {
        byte >= 0x80 || matches!(byte, 0x18 | b'?' | b'~' | b'!')
    }

    /// Feed one byte. Returns `NotRealtime` for ordinary line-text bytes;
    /// otherwise the byte is consumed out-of-band (never reaches the line
    /// buffer) whether or not it resolved to a specific event.
    pub fn feed(&mut self, byte: u8) -> Decoded {
        if let Some(active) = self.pending_pin_active.take() {
            return Decoded::Event(RealtimeEvent::Pin(PinEvent {
                pin: byte & 0x3F,
                active,
            }));
        }
        if !Self::is_realtime_byte(byte) {
            return Decoded::NotRealtime;
        }
        match byte {
            0x18 => Decoded::Event(RealtimeEvent::Reset),
            b'?' => Decoded::Event(RealtimeEvent::StatusReport),
            b'~' => Decoded::Event(RealtimeEvent::CycleStart),
            b'!' => Decoded::Event(RealtimeEvent::FeedHold),
            0x84 => Decoded::Event(RealtimeEvent::SafetyDoor),
            0x85 => Decoded::Event(RealtimeEvent::JogCancel),
            0x86 => Decoded::Event(RealtimeEvent::DebugReport),
            0x87..=0x8A => Decoded::Event(RealtimeEvent::Macro(byte - 0x87)),
            0x90 => Decoded::Event(RealtimeEvent::FeedOverride(OverrideStep::Reset)),
            0x91 => Decoded::Event(RealtimeEvent::FeedOverride(OverrideStep::CoarsePlus)),
            0x92 => Decoded::Event(RealtimeEvent::FeedOverride(OverrideStep::CoarseMinus)),
            0x93 => Decoded::Event(RealtimeEvent::FeedOverride(OverrideStep::FinePlus)),
            0x94 => Decoded::Event(RealtimeEvent::FeedOverride(OverrideStep::FineMinus)),
            0x95 => Decoded::Event(RealtimeEvent::RapidOverride(RapidLevel::Full)),
            0x96 => Decoded::Event(RealtimeEvent::RapidOverride(RapidLevel::Medium)),
            0x97 => Decoded::Event(RealtimeEvent::RapidOverride(RapidLevel::Low)),
            0x99 => Decoded::Event(RealtimeEvent::SpindleOverride(OverrideStep::Reset)),
            0x9A => Decoded::Event(RealtimeEvent::SpindleOverride(OverrideStep::CoarsePlus)),
            0x9B => Decoded::Event(RealtimeEvent::SpindleOverride(OverrideStep::CoarseMinus)),
            0x9C => Decoded::Event(RealtimeEvent::SpindleOverride(OverrideStep::FinePlus)),
            0x9D => Decoded::Event(RealtimeEvent::SpindleOverride(OverrideStep::FineMinus)),
            0x9E => Decoded::Event(RealtimeEvent::SpindleStop),
            0xA0 => Decoded::Event(RealtimeEvent::CoolantFloodToggle),
            0xA1 => Decoded::Event(RealtimeEvent::CoolantMistToggle),
            0xC4 => {
                self.pending_pin_active = Some(true);
                Decoded::Pending
            }
            0xC5 => {
                self.pending_pin_active = Some(false);
                Decoded::Pending
            }
            other => {
                tracing::debug!(byte = other, "unrecognized realtime byte, dropped");
                Decoded::Pending // consumed, no event; caller treats like Pending (no line corruption)
            }
        }
    }
}

/// Apply an [`OverrideStep`] to a current percent value, clamped to
/// `[min, max]`.
pub fn apply_override_step(current: i32, step: OverrideStep, coarse: i32, fine: i32, default: i32, min: i32, max: i32) -> i32 {
    let next = match step {
        OverrideStep::Reset => default,
        OverrideStep::CoarsePlus => current + coarse,
        OverrideStep::CoarseMinus => current - coarse,
        OverrideStep::FinePlus => current + fine,
        OverrideStep::FineMinus => current - fine,
    };
    next.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_realtime_codes_decode() {
        let mut d = RealtimeDecoder::new();
        assert!(matches!(d.feed(0x18), Decoded::Event(RealtimeEvent::Reset)));
        assert!(matches!(d.feed(b'?'), Decoded::Event(RealtimeEvent::StatusReport)));
        assert!(matches!(d.feed(0x85), Decoded::Event(RealtimeEvent::JogCancel)));
    }

    #[test]
    fn ordinary_text_byte_is_not_realtime() {
        let mut d = RealtimeDecoder::new();
        assert!(matches!(d.feed(b'G'), Decoded::NotRealtime));
    }

    #[test]
    fn pin_event_spans_two_bytes() {
        let mut d = RealtimeDecoder::new();
        assert!(matches!(d.feed(0xC4), Decoded::Pending));
        match d.feed(5) {
            Decoded::Event(RealtimeEvent::Pin(PinEvent { pin, active })) => {
                assert_eq!(pin, 5);
                assert!(active);
            }
            _ => panic!("expected a pin event"),
        }
    }

    #[test]
    fn override_step_clamps_to_bounds() {
        let v = apply_override_step(
            195,
            OverrideStep::CoarsePlus,
            FEED_OVERRIDE_COARSE,
            FEED_OVERRIDE_FINE,
            FEED_OVERRIDE_DEFAULT,
            FEED_OVERRIDE_MIN,
            FEED_OVERRIDE_MAX,
        );
        assert_eq!(v, FEED_OVERRIDE_MAX);
    }
}
