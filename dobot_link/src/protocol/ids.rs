use int_enum::IntEnum;
use serde::{Deserialize, Serialize};

/// Command identifiers understood by the controller firmware.
///
/// Ids are grouped in blocks of ten per function family; gaps inside a block
/// are ids the firmware reserves but never shipped. The queued-command block
/// at 240 drives the on-device execution queue and is the one this crate's
/// engine depends on directly; the rest are carried for callers building
/// typed wrappers on top of [`crate::drivers::DobotDriver::submit_immediate`].
#[repr(u8)]
#[derive(Debug, Serialize, Deserialize, IntEnum, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolId {
    // Device information
    DeviceSn = 1,
    DeviceName = 2,
    DeviceVersion = 3,
    DeviceWithL = 4,
    DeviceTime = 5,
    DeviceInfo = 7,

    // Pose
    GetPose = 11,
    ResetPose = 12,
    GetKinematics = 13,
    GetPoseL = 14,

    // Alarm
    AlarmsState = 21,

    // Homing
    HomeParams = 31,
    HomeCmd = 32,
    AutoLeveling = 33,

    // Hand-held teaching
    HhtTrigMode = 41,
    HhtTrigOutputEnabled = 42,
    HhtTrigOutput = 43,

    ArmOrientation = 51,

    // End effector
    EndEffectorParams = 61,
    EndEffectorLaser = 62,
    EndEffectorSuctionCup = 63,
    EndEffectorGripper = 64,

    // JOG
    JogJointParams = 71,
    JogCoordinateParams = 72,
    JogCommonParams = 73,
    JogCmd = 74,
    JogLParams = 75,

    // PTP
    PtpJointParams = 81,
    PtpCoordinateParams = 82,
    PtpJumpParams = 83,
    PtpCommonParams = 84,
    PtpCmd = 85,
    PtpLParams = 86,
    PtpWithLCmd = 87,
    PtpJump2Params = 88,
    PtpPoCmd = 89,
    PtpPoWithLCmd = 90,

    // CP
    CpParams = 91,
    CpCmd = 92,
    CpLeCmd = 93,
    CpRHoldEnable = 94,
    CpCommonParams = 95,

    // ARC
    ArcParams = 101,
    ArcCmd = 102,
    CircleCmd = 103,
    ArcCommonParams = 104,

    WaitCmd = 111,
    TrigCmd = 121,

    // Extended I/O
    IoMultiplexing = 131,
    IoDo = 132,
    IoPwm = 133,
    IoDi = 134,
    IoAdc = 135,
    EMotor = 136,
    EMotorS = 137,
    ColorSensor = 138,
    IrSwitch = 139,

    // Calibration
    AngleSensorStaticError = 141,
    AngleSensorCoef = 142,
    BaseDecoderStaticError = 143,
    LrHandCalibrateValue = 144,

    // WiFi
    WifiConfigMode = 151,
    WifiSsid = 152,
    WifiPassword = 153,
    WifiIpAddress = 154,
    WifiNetmask = 155,
    WifiGateway = 156,
    WifiDns = 157,
    WifiConnectStatus = 158,

    // Firmware
    FirmwareSwitch = 161,
    FirmwareMode = 162,

    // Lost-step detection
    LostStepSet = 171,
    LostStepDetect = 172,

    // Queued-command engine
    QueuedCmdStartExec = 241,
    QueuedCmdStopExec = 242,
    QueuedCmdForceStopExec = 243,
    QueuedCmdStartDownload = 244,
    QueuedCmdStopDownload = 245,
    QueuedCmdClear = 246,
    QueuedCmdCurrentIndex = 247,
    QueuedCmdLeftSpace = 248,
    QueuedCmdMotionFinish = 249,
}
