/// 6DOF pose of one recognized part, as reported by the vision server.
///
/// Always populated as a whole. "No pose" is expressed by the absence of a
/// fresh sample in the [`DataBridge`](crate::DataBridge), never by sentinel values.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseSample {
    /// Translation [x, y, z] in the server's linear unit (mm for KUKA bases).
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Rotation about X in radians (legacy `gamma`, KUKA C).
    pub rx: f64,
    /// Rotation about Y in radians (legacy `beta`, KUKA B).
    pub ry: f64,
    /// Rotation about Z in radians (legacy `alpha`, KUKA A).
    pub rz: f64,
}

impl PoseSample {
    pub fn new(x: f64, y: f64, z: f64, rx: f64, ry: f64, rz: f64) -> Self {
        Self { x, y, z, rx, ry, rz }
    }

    pub fn translation(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn rotation(&self) -> [f64; 3] {
        [self.rx, self.ry, self.rz]
    }
}

/// Link state of the vision client. Owned by the client thread only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

bitflags::bitflags! {
    /// Snapshot of the `VisionInputs` digital input group.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VisionInputs: u8 {
        const RUN_MODE            = 1 << 0;
        const CALIBRATION_MODE    = 1 << 1;
        /// Robot wants a vision result now.
        const DATA_REQUEST        = 1 << 2;
        const CALIBRATION_REQUEST = 1 << 3;
    }
}

bitflags::bitflags! {
    /// Values for the `VisionOutputs` digital output group.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VisionOutputs: u8 {
        const DATA_REQUEST_SENT    = 1 << 0;
        const PICK_POSITION_READY  = 1 << 1;
        const CALIBRATION_COMPLETE = 1 << 2;
    }
}

impl VisionInputs {
    /// True when the robot is asking for a vision exchange this cycle.
    pub fn trigger_requested(self) -> bool {
        self.contains(VisionInputs::DATA_REQUEST)
    }
}
