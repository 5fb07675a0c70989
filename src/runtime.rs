// Fixed-rate control loop
// Each cycle: read sensors -> decode one line -> arbitrate / run a sequence
//             -> drive motors -> emit telemetry
// Nothing in a cycle can abort the loop: every step degrades to a safe default
// and telemetry is written every cycle.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::clock::{Clock, TokioClock};
use crate::config::RobotConfig;
use crate::decoder;
use crate::hw::{Robot, Side, SimRobot};
use crate::link::{LineTransport, SerialLink, StdioLink};
use crate::messages::{Command, Mode, MotorOutput, SensorSnapshot, Telemetry};
use crate::motion::{ActuatorSequencer, DriveState, MotionArbiter, Sequence};

/// What happened in one cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub snapshot: SensorSnapshot,
    pub command: Command,
    pub sequence: Option<Sequence>,
    pub output: MotorOutput,
    pub mode: Mode,
}

pub struct Runtime<R: Robot, L: LineTransport, C: Clock> {
    robot: R,
    link: L,
    clock: C,
    state: DriveState,
    arbiter: MotionArbiter,
    sequencer: ActuatorSequencer,
    ir_line_threshold: i32,
    cycle_period: Duration,
    cycles: u64,
}

impl<R: Robot, L: LineTransport, C: Clock> Runtime<R, L, C> {
    /// Build the runtime and put the robot in its startup posture:
    /// motors off, claw open, launcher ready, mode IDLE.
    pub fn new(config: &RobotConfig, mut robot: R, link: L, clock: C) -> Self {
        let sequencer = ActuatorSequencer::new(config.servos, config.timings.clone());
        robot.set_motor(Side::Left, 0);
        robot.set_motor(Side::Right, 0);
        sequencer.park(&mut robot);

        Self {
            robot,
            link,
            clock,
            state: DriveState::default(),
            arbiter: MotionArbiter::new(&config.safety),
            sequencer,
            ir_line_threshold: config.safety.ir_line_threshold,
            cycle_period: config.cycle_period(),
            cycles: 0,
        }
    }

    pub fn state(&self) -> &DriveState {
        &self.state
    }

    pub fn robot(&self) -> &R {
        &self.robot
    }

    pub fn robot_mut(&mut self) -> &mut R {
        &mut self.robot
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one control cycle
    pub async fn cycle(&mut self) -> CycleReport {
        // 1. Sensors
        let snapshot = SensorSnapshot::capture(&mut self.robot);
        let (line_left, line_right) = snapshot.line_under(self.ir_line_threshold);
        debug!("Line under sensors: left={}, right={}", line_left, line_right);

        // 2. At most one command
        let line = match self.link.recv_line() {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read command line: {}", e);
                None
            }
        };
        let command = decoder::decode(line.as_deref());

        // 3. Mode / drive update; sequences block this cycle until done
        let sequence = self.arbiter.apply_command(&mut self.state, &command);
        if let Some(sequence) = sequence {
            self.sequencer
                .run(sequence, &mut self.state, &mut self.robot, &mut self.clock)
                .await;
        }
        let output = self.arbiter.arbitrate(&mut self.state, snapshot.distance_cm);

        // 4. Motors
        self.robot.set_motor(Side::Left, output.left());
        self.robot.set_motor(Side::Right, output.right());

        // 5. Telemetry
        self.emit_telemetry(&snapshot);
        self.cycles += 1;

        CycleReport {
            snapshot,
            command,
            sequence,
            output,
            mode: self.state.mode,
        }
    }

    fn emit_telemetry(&mut self, snapshot: &SensorSnapshot) {
        let telemetry = Telemetry::new(self.clock.elapsed_ms(), snapshot, self.state.mode);
        match telemetry.to_line() {
            Ok(line) => {
                if let Err(e) = self.link.send_line(&line) {
                    warn!("Failed to send telemetry: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize telemetry: {}", e),
        }
    }

    /// Run cycles at the configured period until Ctrl-C or `max_cycles`.
    ///
    /// A cycle that overruns (e.g. while a sequence settles) delays the next
    /// tick instead of bunching cycles up. Motors are stopped on the way out.
    pub async fn run(&mut self, max_cycles: Option<u64>) {
        let mut tick = interval(self.cycle_period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        info!(
            "Control loop started: {}ms period",
            self.cycle_period.as_millis()
        );

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = &mut ctrl_c => {
                    info!("Interrupted");
                    break;
                }
            }

            self.cycle().await;

            if max_cycles.is_some_and(|max| self.cycles >= max) {
                info!("Reached {} cycles", self.cycles);
                break;
            }
        }

        self.shutdown();
    }

    /// Stop both motors
    pub fn shutdown(&mut self) {
        info!("Stopping motors");
        self.robot.set_motor(Side::Left, 0);
        self.robot.set_motor(Side::Right, 0);
    }
}

/// Where operator commands come from
#[derive(Debug, Clone)]
pub enum LinkChoice {
    Stdio,
    Serial { port: String, baudrate: u32 },
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub link: LinkChoice,
    pub config_path: Option<PathBuf>,
    /// Stop after this many cycles; `None` runs until interrupted
    pub max_cycles: Option<u64>,
}

pub async fn run(options: RunOptions) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = match &options.config_path {
        Some(path) => {
            info!("Loading config from {}", path.display());
            RobotConfig::load(path)?
        }
        None => RobotConfig::default(),
    };
    info!(
        "Obstacle threshold {}cm, cycle {}ms",
        config.safety.obstacle_threshold_cm, config.cycle_period_ms
    );

    let robot = SimRobot::new(config.battery.clone());

    match options.link {
        LinkChoice::Stdio => {
            info!("Using stdio link");
            let link = StdioLink::spawn();
            let mut runtime = Runtime::new(&config, robot, link, TokioClock::new());
            runtime.run(options.max_cycles).await;
        }
        LinkChoice::Serial { port, baudrate } => {
            let link = SerialLink::open(&port, baudrate)?;
            let mut runtime = Runtime::new(&config, robot, link, TokioClock::new());
            runtime.run(options.max_cycles).await;
        }
    }

    Ok(())
}
