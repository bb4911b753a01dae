//! The closed error taxonomy (spec component C1).
//!
//! Every failure the pipeline can produce — parse, modal, runtime, expression,
//! flow-control, resource, or protocol — is a variant of [`Error`]. Each
//! variant carries a stable numeric code for legacy ack senders (`error:<n>`)
//! and a short text string for verbose mode (`error:<text>`). `Error::Ok`
//! does not exist as a variant: success is `Result::Ok(())`, matching the
//! "exactly one `ok` or one `error:` per line" rule in the protocol.
//!
//! Codes below 150 mirror the legacy FluidNC/Grbl error table so that
//! existing senders keyed on numeric code keep working. Codes at 200+ are
//! this pipeline's own (expression, flow-control, homing, probe) kinds that
//! the legacy table never assigned a number.

use thiserror::Error as ThisError;

/// A single closed enumeration of pipeline failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ThisError)]
#[non_exhaustive]
pub enum Error {
    // ── Parse / lexical ─────────────────────────────────────────
    #[error("Expected a G, M, or other command letter")]
    ExpectedCommandLetter = 1,
    #[error("Missing the expected G-code word value or numeric value format is not valid")]
    BadNumberFormat = 2,
    #[error("Grbl '$' system command was not recognized or supported")]
    InvalidStatement = 3,
    #[error("Negative value received for an expected positive value")]
    NegativeValue = 4,
    #[error("Homing is not enabled per settings")]
    SettingDisabled = 5,
    #[error("Minimum step pulse time must be greater than 3usec")]
    SettingStepPulseMin = 6,
    #[error("An EEPROM/NVS read failed, using defaults")]
    SettingReadFail = 7,

    // ── Runtime / state ──────────────────────────────────────────
    #[error("Command requires idle state")]
    IdleError = 8,
    #[error("Locked out during alarm or jog state")]
    SystemGcLock = 9,
    #[error("Target location out of travel, machine position safely retained")]
    SoftLimitError = 10,
    #[error("Line overflowed the line buffer")]
    Overflow = 11,
    #[error("Requested feed rate exceeds the maximum supported step rate")]
    MaxStepRateExceeded = 12,
    #[error("Safety door is ajar, not opened")]
    CheckDoor = 13,
    #[error("Line length exceeded, breaks the line buffer")]
    LineLengthExceeded = 14,
    #[error("Jog target exceeds machine travel, command ignored")]
    TravelExceeded = 15,
    #[error("Jog command missing a '=' or contains prohibited g-code")]
    InvalidJogCommand = 16,
    #[error("Laser mode requires PWM output")]
    SettingDisabledLaser = 17,
    #[error("Homing not enabled for any cycle in the config")]
    HomingNoCycles = 18,
    #[error("Homing cannot be run on multiple axes at once on this config")]
    SingleAxisHoming = 19,

    // ── Modal / semantic ─────────────────────────────────────────
    #[error("Unsupported or invalid g-code command found in block")]
    GcodeUnsupportedCommand = 20,
    #[error("More than one g-code command from the same modal group found in block")]
    GcodeModalGroupViolation = 21,
    #[error("Feed rate has not yet been set or is undefined")]
    GcodeUndefinedFeedRate = 22,
    #[error("G-code command in block requires an integer value")]
    GcodeCommandValueNotInteger = 23,
    #[error("More than one g-code command that requires axis words found in block")]
    GcodeAxisCommandConflict = 24,
    #[error("Repeated g-code word found in block")]
    GcodeWordRepeated = 25,
    #[error("No axis words found in block for g-code command or current modal state")]
    GcodeNoAxisWords = 26,
    #[error("Line number value is invalid")]
    GcodeInvalidLineNumber = 27,
    #[error("G-code command is missing a required value word")]
    GcodeValueWordMissing = 28,
    #[error("G59.x work coordinate systems are not supported")]
    GcodeUnsupportedCoordSys = 29,
    #[error("G53 only allowed with G0 and G1 motion modes")]
    GcodeG53InvalidMotionMode = 30,
    #[error("Axis words found in block when no command or current modal state uses them")]
    GcodeAxisWordsExist = 31,
    #[error("G2/G3 arcs require at least one in-plane axis word")]
    GcodeNoAxisWordsInPlane = 32,
    #[error("Target position exceeds machine travel, check your code")]
    GcodeInvalidTarget = 33,
    #[error("Arc radius value is invalid")]
    GcodeArcRadiusError = 34,
    #[error("G2/G3 arcs require at least one in-plane offset word")]
    GcodeNoOffsetsInPlane = 35,
    #[error("Unused value words found in block")]
    GcodeUnusedWords = 36,
    #[error("G43.1 dynamic tool length offset is not assigned to configured tool length axis")]
    GcodeG43DynamicAxisError = 37,
    #[error("Tool number greater than max supported value")]
    GcodeMaxValueExceeded = 38,
    #[error("Number of G10/M66 P-parameters exceeded the maximum supported value")]
    PParamMaxExceeded = 39,
    #[error("Control pin state invalid for the requested operation")]
    CheckControlPins = 40,

    // ── Expression / parameter evaluator ─────────────────────────
    #[error("Attempted division by zero in an expression")]
    ExpressionDivideByZero = 200,
    #[error("Expression argument is out of the valid domain for the operator")]
    ExpressionInvalidArgument = 201,
    #[error("Expression uses an unrecognized operator or function")]
    ExpressionUnknownOp = 202,
    #[error("Expression has a syntax error (unbalanced brackets or missing operand)")]
    ExpressionSyntaxError = 203,
    #[error("Parameter reference syntax is invalid")]
    ExpressionBadParameter = 204,
    #[error("Expression nesting exceeds the supported precedence stack depth")]
    ExpressionStackOverflow = 205,

    // ── Flow control ──────────────────────────────────────────────
    #[error("Flow-control statement has a syntax error or mismatched nesting")]
    FlowControlSyntaxError = 210,
    #[error("Flow-control statement used outside of a running macro/file")]
    FlowControlNotExecutingMacro = 211,
    #[error("Flow-control stack depth exceeded")]
    FlowControlStackOverflow = 212,
    #[error("ALARM[] statement raised an alarm from a running macro")]
    FlowControlAlarmRaised = 213,
    #[error("ERROR[] statement failed the line from a running macro")]
    FlowControlErrorRaised = 214,

    // ── Filesystem / NVS / auth ───────────────────────────────────
    #[error("File system failed to mount")]
    FsFailedMount = 60,
    #[error("Failed to read file")]
    FsFailedRead = 61,
    #[error("Failed to open directory")]
    FsFailedOpenDir = 62,
    #[error("Directory not found")]
    FsDirNotFound = 63,
    #[error("File is empty")]
    FsFileEmpty = 64,
    #[error("File not found")]
    FsFileNotFound = 65,
    #[error("Failed to open file")]
    FsFailedOpenFile = 66,
    #[error("File system is busy")]
    FsFailedBusy = 67,
    #[error("Failed to delete directory")]
    FsFailedDelDir = 68,
    #[error("Failed to delete file")]
    FsFailedDelFile = 69,
    #[error("Failed to rename file")]
    FsFailedRenameFile = 70,
    #[error("Setting number out of range")]
    NumberRange = 80,
    #[error("Setting value invalid")]
    InvalidValue = 81,
    #[error("Failed to create file")]
    FsFailedCreateFile = 82,
    #[error("Failed to format file system")]
    FsFailedFormat = 83,
    #[error("Failed to send message")]
    MessageFailed = 90,
    #[error("Persistent settings store write failed")]
    NvsSetFailed = 100,
    #[error("Persistent settings store stats read failed")]
    NvsGetStatsFailed = 101,
    #[error("Authentication failed")]
    AuthenticationFailed = 110,

    // ── Protocol ──────────────────────────────────────────────────
    #[error("End of line")]
    Eol = 111,
    #[error("End of file")]
    Eof = 112,
    #[error("Reset occurred during command execution")]
    Reset = 113,
    #[error("Realtime block queue overflowed, motion aborted")]
    RealtimeQueueOverflow = 114,
    #[error("Another interface is busy sending a file")]
    AnotherInterfaceBusy = 120,
    #[error("Jog command was cancelled")]
    JogCancelled = 130,
    #[error("Pin specification is invalid")]
    BadPinSpecification = 150,
    #[error("Runtime configuration setting is invalid")]
    BadRuntimeConfigSetting = 151,
    #[error("Configuration is invalid, system is in config alarm")]
    ConfigurationInvalid = 152,
    #[error("Upload failed")]
    UploadFailed = 160,
    #[error("Download failed")]
    DownloadFailed = 161,
    #[error("Setting is read-only")]
    ReadOnlySetting = 162,

    // ── Hardware ──────────────────────────────────────────────────
    #[error("Homing failed: reset occurred during the cycle")]
    HomingFailReset = 220,
    #[error("Homing failed: safety door opened during the cycle")]
    HomingFailDoor = 221,
    #[error("Homing failed: could not clear the limit switch during pulloff")]
    HomingFailPulloff = 222,
    #[error("Homing failed: could not find the limit switch during approach")]
    HomingFailApproach = 223,
    #[error("Homing failed: ambiguous switch state on opposing limits")]
    HomingAmbiguousSwitch = 224,
    #[error("Probe failed: switch was already triggered before the move started")]
    ProbeFailInitial = 225,
    #[error("Probe failed: no contact detected before the programmed distance")]
    ProbeFailContact = 226,
    #[error("Spindle failed to reach commanded state")]
    SpindleControl = 230,
    #[error("A control pin (door/reset/feed-hold/cycle-start) changed unexpectedly")]
    ControlPin = 231,
}

impl Error {
    /// The stable numeric code sent to legacy `error:<n>` consumers.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Short text for verbose-mode acks (`error:<text>`).
    #[inline]
    pub fn message(self) -> String {
        self.to_string()
    }
}
