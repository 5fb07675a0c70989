// Timed servo sequences for the claw and the launcher
//
// A sequence runs to completion inside the cycle that requested it. While it
// runs it holds exclusive access to the actuators and the clock, so nothing
// else can move the robot until it returns.

use std::fmt;
use std::time::Duration;

use tracing::{info, trace};

use super::arbiter::DriveState;
use crate::clock::Clock;
use crate::config::{SequenceTimings, ServoConfig};
use crate::hw::{Actuators, Servo, Side};
use crate::messages::{ActionRequest, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    PickupBox,
    DropBox,
    Shoot,
}

impl Sequence {
    /// STOP is not a sequence; it is handled by the arbiter
    pub fn for_action(action: ActionRequest) -> Option<Self> {
        match action {
            ActionRequest::Stop => None,
            ActionRequest::PickupBox => Some(Sequence::PickupBox),
            ActionRequest::DropBox => Some(Sequence::DropBox),
            ActionRequest::Shoot => Some(Sequence::Shoot),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Sequence::PickupBox => Mode::PickupBox,
            Sequence::DropBox => Mode::DropBox,
            Sequence::Shoot => Mode::Shoot,
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mode().as_str())
    }
}

/// Move one servo, then let it settle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub servo: Servo,
    pub angle: u8,
    pub settle: Duration,
}

impl Step {
    fn new(servo: Servo, angle: u8, settle_ms: u64) -> Self {
        Self {
            servo,
            angle,
            settle: Duration::from_millis(settle_ms),
        }
    }
}

/// Exclusive hold on the actuators for the length of a sequence.
///
/// Acquiring brakes both drive motors; every step waits on the borrowed clock.
/// The borrows end with the lease, handing the actuators back to the caller.
pub struct ActuatorLease<'a, A: Actuators + ?Sized, C: Clock> {
    actuators: &'a mut A,
    clock: &'a mut C,
}

impl<'a, A: Actuators + ?Sized, C: Clock> ActuatorLease<'a, A, C> {
    pub fn acquire(actuators: &'a mut A, clock: &'a mut C) -> Self {
        trace!("Actuator lease acquired");
        actuators.set_motor(Side::Left, 0);
        actuators.set_motor(Side::Right, 0);
        Self { actuators, clock }
    }

    pub async fn hold(&mut self, step: Step) {
        trace!(
            "{:?} -> {} deg, settle {}ms",
            step.servo,
            step.angle,
            step.settle.as_millis()
        );
        self.actuators.set_servo(step.servo, step.angle);
        self.clock.wait(step.settle).await;
    }
}

#[derive(Debug, Clone)]
pub struct ActuatorSequencer {
    servos: ServoConfig,
    timings: SequenceTimings,
}

impl ActuatorSequencer {
    pub fn new(servos: ServoConfig, timings: SequenceTimings) -> Self {
        Self { servos, timings }
    }

    /// The ordered steps for a sequence
    pub fn steps(&self, sequence: Sequence) -> Vec<Step> {
        let s = &self.servos;
        let t = &self.timings;
        match sequence {
            Sequence::PickupBox => vec![
                Step::new(Servo::Claw, s.claw_open, t.pickup_open_ms),
                Step::new(Servo::Claw, s.claw_close, t.pickup_close_ms),
            ],
            Sequence::DropBox => vec![Step::new(Servo::Claw, s.claw_open, t.drop_open_ms)],
            Sequence::Shoot => vec![
                Step::new(Servo::Launcher, s.launcher_ready, t.shoot_ready_ms),
                Step::new(Servo::Launcher, s.launcher_fire, t.shoot_fire_ms),
                Step::new(Servo::Launcher, s.launcher_ready, t.shoot_recover_ms),
            ],
        }
    }

    /// Put the mechanisms in their resting positions (claw open, launcher ready)
    pub fn park<A: Actuators + ?Sized>(&self, actuators: &mut A) {
        actuators.set_claw(self.servos.claw_open);
        actuators.set_launcher(self.servos.launcher_ready);
    }

    /// Run `sequence` to completion. The mode shows the sequence while it runs
    /// and is IDLE afterwards; the stored drive command is untouched.
    pub async fn run<A, C>(
        &self,
        sequence: Sequence,
        state: &mut DriveState,
        actuators: &mut A,
        clock: &mut C,
    ) where
        A: Actuators + ?Sized,
        C: Clock,
    {
        info!("Starting {} sequence", sequence);
        state.mode = sequence.mode();
        let started = clock.elapsed();

        {
            let mut lease = ActuatorLease::acquire(actuators, clock);
            for step in self.steps(sequence) {
                lease.hold(step).await;
            }
        }
        trace!("Actuator lease released");

        state.mode = Mode::Idle;
        info!(
            "{} sequence done in {}ms",
            sequence,
            clock.elapsed().saturating_sub(started).as_millis()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use crate::config::{LAUNCHER_FIRE_DEG, LAUNCHER_READY_DEG};
    use crate::hw::SimRobot;
    use crate::messages::DriveCommand;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Event {
        Motor(Side, i16),
        Servo(Servo, u8),
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
    }

    impl Actuators for Recorder {
        fn set_motor(&mut self, side: Side, power: i16) {
            self.events.push(Event::Motor(side, power));
        }

        fn set_servo(&mut self, servo: Servo, angle: u8) {
            self.events.push(Event::Servo(servo, angle));
        }
    }

    fn sequencer() -> ActuatorSequencer {
        ActuatorSequencer::new(ServoConfig::default(), SequenceTimings::default())
    }

    #[tokio::test]
    async fn test_shoot_ends_ready_and_idle() {
        let seq = sequencer();
        let mut robot = SimRobot::new(Default::default());
        let mut clock = VirtualClock::new();
        let mut state = DriveState {
            mode: Mode::Drive,
            drive: DriveCommand::new(100, 100),
        };

        seq.run(Sequence::Shoot, &mut state, &mut robot, &mut clock)
            .await;

        assert_eq!(robot.servo(Servo::Launcher), LAUNCHER_READY_DEG);
        assert_eq!(state.mode, Mode::Idle);
        assert_eq!(state.drive, DriveCommand::new(100, 100));
        assert_eq!(clock.elapsed_ms(), 800);
    }

    #[tokio::test]
    async fn test_shoot_step_order() {
        let seq = sequencer();
        let mut rec = Recorder::default();
        let mut clock = VirtualClock::new();
        let mut state = DriveState::default();

        seq.run(Sequence::Shoot, &mut state, &mut rec, &mut clock)
            .await;

        assert_eq!(
            rec.events,
            vec![
                Event::Motor(Side::Left, 0),
                Event::Motor(Side::Right, 0),
                Event::Servo(Servo::Launcher, LAUNCHER_READY_DEG),
                Event::Servo(Servo::Launcher, LAUNCHER_FIRE_DEG),
                Event::Servo(Servo::Launcher, LAUNCHER_READY_DEG),
            ]
        );
    }

    #[tokio::test]
    async fn test_pickup_and_drop_timing() {
        let seq = sequencer();
        let mut robot = SimRobot::new(Default::default());
        let mut clock = VirtualClock::new();
        let mut state = DriveState::default();

        seq.run(Sequence::PickupBox, &mut state, &mut robot, &mut clock)
            .await;
        assert_eq!(robot.servo(Servo::Claw), 95);
        assert_eq!(clock.elapsed_ms(), 650);

        seq.run(Sequence::DropBox, &mut state, &mut robot, &mut clock)
            .await;
        assert_eq!(robot.servo(Servo::Claw), 20);
        assert_eq!(clock.elapsed_ms(), 1150);
        assert_eq!(state.mode, Mode::Idle);
    }

    #[test]
    fn test_steps_follow_config() {
        let timings = SequenceTimings {
            pickup_open_ms: 300,
            ..SequenceTimings::default()
        };
        let servos = ServoConfig {
            claw_close: 90,
            ..ServoConfig::default()
        };
        let seq = ActuatorSequencer::new(servos, timings);
        let steps = seq.steps(Sequence::PickupBox);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].settle, Duration::from_millis(300));
        assert_eq!(steps[1].angle, 90);
    }

    #[test]
    fn test_stop_is_not_a_sequence() {
        assert_eq!(Sequence::for_action(ActionRequest::Stop), None);
        assert_eq!(
            Sequence::for_action(ActionRequest::Shoot).map(|s| s.mode()),
            Some(Mode::Shoot)
        );
    }

    #[test]
    fn test_park() {
        let mut rec = Recorder::default();
        sequencer().park(&mut rec);
        assert_eq!(
            rec.events,
            vec![
                Event::Servo(Servo::Claw, 20),
                Event::Servo(Servo::Launcher, LAUNCHER_READY_DEG),
            ]
        );
    }
}
