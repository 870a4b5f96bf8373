//! Sensor descriptor types exposed by the adapter to its callers.
//!
//! Everything here is plain data. The types derive serde so whatever
//! transport sits in front of the adapter can carry them unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Enrollment slots available to a single user
pub const MAX_ENROLLMENTS_PER_USER: i32 = 5;

pub const HW_COMPONENT_ID: &str = "fingerprintSensor";
pub const HW_VERSION: &str = "vendor/model/revision";
pub const FW_VERSION: &str = "1.01";
pub const SERIAL_NUMBER: &str = "00000001";
pub const SW_COMPONENT_ID: &str = "matchingAlgorithm";
pub const SW_VERSION: &str = "vendor/version/revision";

/// Physical form factor of the fingerprint sensor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorType {
    Unknown,
    UnderDisplayUltrasonic,
    UnderDisplayOptical,
    PowerButton,
    HomeButton,
    Rear,
}

impl SensorType {
    /// Under-display sensors are the only ones that take a UDFPS handler
    pub fn is_under_display(self) -> bool {
        matches!(self, SensorType::UnderDisplayUltrasonic | SensorType::UnderDisplayOptical)
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorType::Unknown => "UNKNOWN",
            SensorType::UnderDisplayUltrasonic => "UNDER_DISPLAY_ULTRASONIC",
            SensorType::UnderDisplayOptical => "UNDER_DISPLAY_OPTICAL",
            SensorType::PowerButton => "POWER_BUTTON",
            SensorType::HomeButton => "HOME_BUTTON",
            SensorType::Rear => "REAR",
        };
        f.write_str(name)
    }
}

/// Biometric strength class of the sensor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorStrength {
    Convenience = 0,
    Weak = 1,
    Strong = 2,
}

impl SensorStrength {
    /// Map a raw integer onto a strength, clamping out-of-range values.
    ///
    /// Returns the strength and whether the value had to be clamped.
    pub fn from_raw(value: i32) -> (Self, bool) {
        match value {
            0 => (SensorStrength::Convenience, false),
            1 => (SensorStrength::Weak, false),
            2 => (SensorStrength::Strong, false),
            v if v < 0 => (SensorStrength::Convenience, true),
            _ => (SensorStrength::Strong, true),
        }
    }
}

/// Identification of one hardware or software component of the sensor stack
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInfo {
    pub component_id: String,
    pub hardware_version: String,
    pub firmware_version: String,
    pub serial_number: String,
    pub software_version: String,
}

impl ComponentInfo {
    /// The hardware record reported for every sensor
    pub fn hardware() -> Self {
        Self {
            component_id: HW_COMPONENT_ID.to_string(),
            hardware_version: HW_VERSION.to_string(),
            firmware_version: FW_VERSION.to_string(),
            serial_number: SERIAL_NUMBER.to_string(),
            software_version: String::new(),
        }
    }

    /// The matching-algorithm record reported for every sensor
    pub fn software() -> Self {
        Self {
            component_id: SW_COMPONENT_ID.to_string(),
            software_version: SW_VERSION.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommonProps {
    pub sensor_id: i32,
    pub sensor_strength: SensorStrength,
    pub max_enrollments_per_user: i32,
    pub component_info: Vec<ComponentInfo>,
}

/// Where the sensor sits on a display, in display pixels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SensorLocation {
    pub sensor_location_x: i32,
    pub sensor_location_y: i32,
    pub sensor_radius: i32,
    /// Display identifier, empty when the location applies to the default display
    #[serde(default)]
    pub display: String,
}

impl SensorLocation {
    pub fn display_id(&self) -> Option<&str> {
        if self.display.is_empty() {
            None
        } else {
            Some(&self.display)
        }
    }
}

impl fmt::Display for SensorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SensorLocation{{x: {}, y: {}, radius: {}, display: {:?}}}",
            self.sensor_location_x, self.sensor_location_y, self.sensor_radius, self.display
        )
    }
}

/// Capability descriptor for one physical sensor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SensorProps {
    pub common_props: CommonProps,
    pub sensor_type: SensorType,
    pub sensor_locations: Vec<SensorLocation>,
    pub supports_navigation_gestures: bool,
    pub supports_detect_interaction: bool,
    pub hal_handles_display_touches: bool,
    pub hal_controls_illumination: bool,
    /// Never populated by this adapter; kept so the shape matches what clients expect
    #[serde(default)]
    pub touch_detection_parameters: Option<TouchDetectionParameters>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TouchDetectionParameters {
    pub target_size: f32,
    pub min_overlap: f32,
}

/// Legacy driver codes at or above this value are vendor specific
pub const LEGACY_VENDOR_BASE: i32 = 1000;

/// Acquisition feedback reported to the client
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcquiredInfo {
    Unknown = 0,
    Good = 1,
    Partial = 2,
    Insufficient = 3,
    SensorDirty = 4,
    TooSlow = 5,
    TooFast = 6,
    Vendor = 7,
    Start = 8,
}

impl AcquiredInfo {
    /// Translate a legacy driver acquired code into client info plus vendor sub-code
    pub fn from_legacy(code: i32) -> (Self, i32) {
        if code >= LEGACY_VENDOR_BASE {
            return (AcquiredInfo::Vendor, code - LEGACY_VENDOR_BASE);
        }
        let info = match code {
            0 => AcquiredInfo::Good,
            1 => AcquiredInfo::Partial,
            2 => AcquiredInfo::Insufficient,
            3 => AcquiredInfo::SensorDirty,
            4 => AcquiredInfo::TooSlow,
            5 => AcquiredInfo::TooFast,
            6 => AcquiredInfo::Start,
            _ => AcquiredInfo::Unknown,
        };
        (info, 0)
    }
}

/// Errors reported to the client
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unknown = 0,
    HwUnavailable = 1,
    UnableToProcess = 2,
    Timeout = 3,
    NoSpace = 4,
    Canceled = 5,
    UnableToRemove = 6,
    Vendor = 7,
    BadCalibration = 8,
}

impl ErrorCode {
    /// Translate a legacy driver error into client error plus vendor sub-code
    pub fn from_legacy(code: i32) -> (Self, i32) {
        if code >= LEGACY_VENDOR_BASE {
            return (ErrorCode::Vendor, code - LEGACY_VENDOR_BASE);
        }
        let error = match code {
            1 => ErrorCode::HwUnavailable,
            2 => ErrorCode::UnableToProcess,
            3 => ErrorCode::Timeout,
            4 => ErrorCode::NoSpace,
            5 => ErrorCode::Canceled,
            6 => ErrorCode::UnableToRemove,
            _ => ErrorCode::Unknown,
        };
        (error, 0)
    }
}
