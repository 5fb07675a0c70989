// Motion core: arbitration between operator drive commands, the obstacle
// interlock and timed actuator sequences
//
// Provides:
// - MotionArbiter: per-cycle mode/drive update and motor output
// - ActuatorSequencer: blocking claw/launcher sequences

pub mod arbiter;
pub mod sequencer;

pub use arbiter::{DriveState, MotionArbiter};
pub use sequencer::{ActuatorLease, ActuatorSequencer, Sequence, Step};
