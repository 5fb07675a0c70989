// Decides the motor output for each cycle from the decoded command, the
// current mode and the latest distance reading.
//
// Priority per cycle:
// 1. an action decoded this cycle (STOP resets drive; others run a sequence)
// 2. a drive command decoded this cycle
// 3. the obstacle interlock
// 4. the stored drive command, clamped

use tracing::{debug, info, warn};

use super::sequencer::Sequence;
use crate::config::SafetyConfig;
use crate::hw::convert::is_no_echo;
use crate::messages::{ActionRequest, Command, DriveCommand, Mode, MotorOutput};

/// Mode and drive intent carried from one cycle to the next
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveState {
    pub mode: Mode,
    pub drive: DriveCommand,
}

#[derive(Debug, Clone)]
pub struct MotionArbiter {
    obstacle_threshold_cm: i32,
}

impl MotionArbiter {
    pub fn new(safety: &SafetyConfig) -> Self {
        Self {
            obstacle_threshold_cm: safety.obstacle_threshold_cm,
        }
    }

    /// Apply this cycle's command to the drive state.
    ///
    /// Returns the actuator sequence to run, if the command asked for one.
    pub fn apply_command(&self, state: &mut DriveState, command: &Command) -> Option<Sequence> {
        match command {
            Command::NoCommand => None,
            Command::Drive { left, right } => {
                state.drive = DriveCommand::new(*left, *right);
                state.mode = Mode::Drive;
                None
            }
            Command::Action(name) => match name.parse::<ActionRequest>() {
                Ok(ActionRequest::Stop) => {
                    if state.mode != Mode::Stop {
                        info!("STOP requested, clearing drive command");
                    }
                    state.drive = DriveCommand::stop();
                    state.mode = Mode::Stop;
                    None
                }
                Ok(action) => Sequence::for_action(action),
                Err(e) => {
                    warn!("Ignoring action: {}", e);
                    None
                }
            },
        }
    }

    /// Whether a distance reading counts as an obstacle. The no-echo
    /// sentinel never does.
    pub fn is_blocked(&self, distance_cm: i32) -> bool {
        !is_no_echo(distance_cm) && distance_cm < self.obstacle_threshold_cm
    }

    /// Compute this cycle's motor output, updating the mode carried forward
    pub fn arbitrate(&self, state: &mut DriveState, distance_cm: i32) -> MotorOutput {
        let blocked = self.is_blocked(distance_cm);

        let output = match state.mode {
            Mode::Drive | Mode::ObstacleStop if blocked => self.engage_interlock(state, distance_cm),
            // Stale drive left over from before a sequence: suppress output, keep IDLE
            Mode::Idle if blocked => MotorOutput::zero(),
            // Only reachable from DRIVE, so resuming goes back there
            Mode::ObstacleStop => {
                info!("Path clear ({} cm), resuming drive", distance_cm);
                state.mode = Mode::Drive;
                MotorOutput::from(&state.drive)
            }
            Mode::Drive | Mode::Idle | Mode::Stop => MotorOutput::from(&state.drive),
            // Sequence modes end inside the sequencer; never drive while one is set
            Mode::PickupBox | Mode::DropBox | Mode::Shoot => MotorOutput::zero(),
        };

        debug!(
            "Arbitrated {:?} in {} at {} cm",
            output, state.mode, distance_cm
        );
        output
    }

    // Output is suppressed but the stored drive command is kept
    fn engage_interlock(&self, state: &mut DriveState, distance_cm: i32) -> MotorOutput {
        if state.mode != Mode::ObstacleStop {
            warn!(
                "Obstacle at {} cm (< {} cm), stopping",
                distance_cm, self.obstacle_threshold_cm
            );
        }
        state.mode = Mode::ObstacleStop;
        MotorOutput::zero()
    }
}
