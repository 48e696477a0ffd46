use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Context;
use chrono::Local;
use tokio::{
    sync::{mpsc, Mutex},
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use thermostat_common::{
    dispatch,
    ports::{Display, Indicator, SerialPort, TemperatureSensor},
    RenderError, Renderer, RuntimeConfig, SensorFailurePolicy, ThermostatMachine, TickReport,
};

use crate::hardware::{
    open_serial, spawn_stdin_buttons, ButtonSource, ConsoleDisplay, LogIndicator, SimulatedSensor,
};

const DEFAULT_CONFIG_PATH: &str = "thermostat.json";
const HEAT_LED_PIN: u8 = 18;
const COOL_LED_PIN: u8 = 23;

type SharedMachine<S, I> = Arc<Mutex<ThermostatMachine<S, I>>>;

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::var("THERMOSTAT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut runtime = load_runtime_config(&config_path).unwrap_or_else(|err| {
        warn!("failed to load runtime config: {err:#}");
        RuntimeConfig::default()
    });
    apply_env_overrides(&mut runtime);

    info!(
        "buttons: mode GPIO{}, up GPIO{}, down GPIO{}",
        runtime.buttons.mode, runtime.buttons.up, runtime.buttons.down
    );

    let mut machine = ThermostatMachine::new(
        &runtime.thermostat,
        SimulatedSensor::new(&runtime.sensor),
        LogIndicator::new("heat", HEAT_LED_PIN),
        LogIndicator::new("cool", COOL_LED_PIN),
    );
    if let Err(err) = machine.recompute_indicators() {
        warn!("initial indicator evaluation failed: {err}");
    }
    let machine = Arc::new(Mutex::new(machine));

    let renderer = Renderer::new(
        &runtime.render,
        &runtime.display,
        ConsoleDisplay::new(),
        open_serial(&runtime.serial),
    );
    let end = Arc::new(AtomicBool::new(false));

    let render_task = tokio::spawn(render_loop(
        machine.clone(),
        renderer,
        end.clone(),
        Duration::from_millis(runtime.render.tick_ms),
        runtime.render.sensor_failure,
    ));

    let (button_tx, button_rx) = mpsc::channel(16);
    let _input_thread =
        spawn_stdin_buttons(button_tx).context("failed to start button input thread")?;
    let input_task = tokio::spawn(watch_buttons(
        machine.clone(),
        button_rx,
        end.clone(),
        runtime.buttons.end_on_close,
    ));

    let signal_task = {
        let end = end.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("cleaning up, exiting...");
                    end.store(true, Ordering::Release);
                }
                Err(err) => warn!("failed to listen for shutdown signal: {err}"),
            }
        })
    };

    info!(
        "thermostat running: set-point {}F, tick {}ms",
        runtime.thermostat.initial_set_point_f, runtime.render.tick_ms
    );

    let outcome = render_task.await.context("render task panicked")?;

    signal_task.abort();
    input_task.abort();

    {
        let machine = machine.lock().await;
        debug!(
            "final indicators: heat {}, cool {}",
            machine.heat_indicator().current().as_str(),
            machine.cool_indicator().current().as_str()
        );
    }

    outcome.context("render loop stopped")
}

fn load_runtime_config(path: &Path) -> anyhow::Result<RuntimeConfig> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!("no config at {}, using defaults", path.display());
            return Ok(RuntimeConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()))
        }
    };

    RuntimeConfig::from_json(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn apply_env_overrides(runtime: &mut RuntimeConfig) {
    if let Ok(path) = std::env::var("THERMOSTAT_SERIAL_PATH") {
        runtime.serial.path = Some(PathBuf::from(path));
    }

    if let Some(set_point) = std::env::var("THERMOSTAT_SET_POINT")
        .ok()
        .and_then(|value| value.parse::<i32>().ok())
    {
        runtime.thermostat.initial_set_point_f = set_point;
    }
}

/// Renders one frame per period until `end` is set, then clears the display,
/// darkens the indicators and releases the display pins.
async fn render_loop<S, I, D, P>(
    machine: SharedMachine<S, I>,
    mut renderer: Renderer<D, P>,
    end: Arc<AtomicBool>,
    period: Duration,
    sensor_failure: SensorFailurePolicy,
) -> Result<(), RenderError>
where
    S: TemperatureSensor,
    I: Indicator,
    D: Display,
    P: SerialPort,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let result = loop {
        interval.tick().await;
        if end.load(Ordering::Acquire) {
            break Ok(());
        }

        let now = Local::now().naive_local();
        let tick = {
            let mut machine = machine.lock().await;
            renderer.tick(now, &mut machine)
        };

        match tick {
            Ok(report) => log_tick(renderer.ticks(), &report),
            Err(RenderError::Sensor(err)) if sensor_failure == SensorFailurePolicy::Skip => {
                warn!("tick {} skipped: {err}", renderer.ticks());
            }
            Err(err) => break Err(err),
        }
    };

    machine.lock().await.indicators_off();
    let teardown = renderer.teardown();
    info!("display loop stopped after {} ticks", renderer.ticks());

    result?;
    teardown
}

fn log_tick(tick: u64, report: &TickReport) {
    debug!(
        "tick {tick}: [{}] [{}] humidity {:.1}%",
        report.frame.line1(),
        report.frame.line2(),
        report.humidity
    );

    if let Some(indicators) = report.indicators {
        debug!(
            "indicators re-evaluated: heat {}, cool {}",
            indicators.heat.as_str(),
            indicators.cool.as_str()
        );
    }

    if let Some(record) = report.telemetry {
        info!("telemetry sent: {record}");
    }

    if let Some(err) = &report.telemetry_error {
        warn!("telemetry write failed: {err}");
    }
}

async fn input_loop<B, S, I>(machine: SharedMachine<S, I>, mut buttons: B)
where
    B: ButtonSource,
    S: TemperatureSensor,
    I: Indicator,
{
    while let Some(button) = buttons.next_press().await {
        let result = {
            let mut machine = machine.lock().await;
            dispatch(&mut machine, button)
        };

        match result {
            Ok(outcome) => info!(
                "* {} pressed: state {}, set-point {}F, heat {}, cool {}",
                button.as_str(),
                outcome.snapshot.state.as_str(),
                outcome.snapshot.set_point,
                outcome.indicators.heat.as_str(),
                outcome.indicators.cool.as_str()
            ),
            Err(err) => warn!("* {} pressed: {err}", button.as_str()),
        }
    }
    debug!("button source closed");
}

async fn watch_buttons<B, S, I>(
    machine: SharedMachine<S, I>,
    buttons: B,
    end: Arc<AtomicBool>,
    end_on_close: bool,
) where
    B: ButtonSource,
    S: TemperatureSensor,
    I: Indicator,
{
    input_loop(machine, buttons).await;
    if end_on_close {
        info!("button input closed, exiting...");
        end.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use thermostat_common::{
        config::{DisplayConfig, RenderConfig, SimulatedSensorConfig, ThermostatConfig},
        Button, DisplayError, DisplayFrame, IndicatorCommand, Measurement, PortError,
        SensorError, ThermostatState,
    };

    #[derive(Clone, Default)]
    struct Shared {
        lines: Arc<StdMutex<Vec<String>>>,
        frames: Arc<StdMutex<usize>>,
        released: Arc<AtomicBool>,
        fail_writes: Arc<AtomicBool>,
    }

    struct TestDisplay(Shared);

    impl Display for TestDisplay {
        fn write(&mut self, _frame: &DisplayFrame) -> Result<(), DisplayError> {
            if self.0.fail_writes.load(Ordering::SeqCst) {
                return Err(DisplayError::Write("bus stuck".to_string()));
            }
            *self.0.frames.lock().unwrap() += 1;
            Ok(())
        }

        fn clear(&mut self) -> Result<(), DisplayError> {
            Ok(())
        }

        fn release(&mut self) -> Result<(), DisplayError> {
            self.0.released.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct TestSerial(Shared);

    impl SerialPort for TestSerial {
        fn write_line(&mut self, line: &str) -> Result<(), PortError> {
            self.0.lines.lock().unwrap().push(line.to_string());
            Ok(())
        }
    }

    /// Room at a fixed temperature whose bus can be broken mid-test.
    struct SwitchableSensor {
        celsius: f32,
        broken: Arc<AtomicBool>,
    }

    impl TemperatureSensor for SwitchableSensor {
        fn read(&mut self) -> Result<Measurement, SensorError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(SensorError::Bus("no ack from 0x38".to_string()));
            }
            Ok(Measurement::new(self.celsius, 40.0))
        }
    }

    /// Machine in Heat at 68F with a 72F set-point, so the heat led pulses.
    fn heating_machine(broken: Arc<AtomicBool>) -> SharedMachine<SwitchableSensor, LogIndicator> {
        let sensor = SwitchableSensor {
            celsius: 20.0,
            broken,
        };
        let mut machine = ThermostatMachine::new(
            &ThermostatConfig {
                initial_set_point_f: 72,
            },
            sensor,
            LogIndicator::new("heat", HEAT_LED_PIN),
            LogIndicator::new("cool", COOL_LED_PIN),
        );
        machine.cycle_state().unwrap();
        assert_eq!(machine.heat_indicator().current(), IndicatorCommand::Pulse);
        Arc::new(Mutex::new(machine))
    }

    fn test_renderer(shared: &Shared) -> Renderer<TestDisplay, TestSerial> {
        Renderer::new(
            &RenderConfig::default(),
            &DisplayConfig::default(),
            TestDisplay(shared.clone()),
            TestSerial(shared.clone()),
        )
    }

    async fn assert_dark<S: TemperatureSensor>(machine: &SharedMachine<S, LogIndicator>) {
        let machine = machine.lock().await;
        assert_eq!(machine.heat_indicator().current(), IndicatorCommand::Off);
        assert_eq!(machine.cool_indicator().current(), IndicatorCommand::Off);
    }

    fn shared_machine(set_point: i32) -> SharedMachine<SimulatedSensor, LogIndicator> {
        let config = ThermostatConfig {
            initial_set_point_f: set_point,
        };
        let sensor = SimulatedSensor::new(&SimulatedSensorConfig {
            base_celsius: 20.0,
            humidity_percent: 40.0,
        });
        Arc::new(Mutex::new(ThermostatMachine::new(
            &config,
            sensor,
            LogIndicator::new("heat", HEAT_LED_PIN),
            LogIndicator::new("cool", COOL_LED_PIN),
        )))
    }

    #[tokio::test(start_paused = true)]
    async fn render_loop_emits_telemetry_and_releases_display() {
        let shared = Shared::default();
        let machine = shared_machine(72);
        let renderer = Renderer::new(
            &RenderConfig::default(),
            &DisplayConfig::default(),
            TestDisplay(shared.clone()),
            TestSerial(shared.clone()),
        );
        let end = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(render_loop(
            machine.clone(),
            renderer,
            end.clone(),
            Duration::from_secs(1),
            SensorFailurePolicy::Skip,
        ));

        // Ticks land at 0s, 1s, ... 90s: 91 frames, telemetry on 30, 60, 90.
        tokio::time::sleep(Duration::from_millis(90_500)).await;
        end.store(true, Ordering::Release);
        task.await.unwrap().unwrap();

        assert_eq!(*shared.frames.lock().unwrap(), 91);
        assert_eq!(shared.lines.lock().unwrap().len(), 3);
        assert!(shared.released.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn end_flag_stops_before_next_frame() {
        let shared = Shared::default();
        let renderer = Renderer::new(
            &RenderConfig::default(),
            &DisplayConfig::default(),
            TestDisplay(shared.clone()),
            TestSerial(shared.clone()),
        );
        let end = Arc::new(AtomicBool::new(true));

        render_loop(
            shared_machine(72),
            renderer,
            end,
            Duration::from_secs(1),
            SensorFailurePolicy::Halt,
        )
        .await
        .unwrap();

        assert_eq!(*shared.frames.lock().unwrap(), 0);
        assert!(shared.released.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn halt_policy_ends_loop_on_sensor_failure() {
        let shared = Shared::default();
        let broken = Arc::new(AtomicBool::new(false));
        let machine = heating_machine(broken.clone());
        broken.store(true, Ordering::SeqCst);

        let result = render_loop(
            machine.clone(),
            test_renderer(&shared),
            Arc::new(AtomicBool::new(false)),
            Duration::from_secs(1),
            SensorFailurePolicy::Halt,
        )
        .await;

        assert_eq!(
            result,
            Err(RenderError::Sensor(SensorError::Bus(
                "no ack from 0x38".to_string()
            )))
        );
        assert_eq!(*shared.frames.lock().unwrap(), 0);
        assert!(shared.released.load(Ordering::SeqCst));
        assert_dark(&machine).await;
    }

    #[tokio::test(start_paused = true)]
    async fn skip_policy_keeps_rendering_after_sensor_failure() {
        let shared = Shared::default();
        let broken = Arc::new(AtomicBool::new(false));
        let machine = heating_machine(broken.clone());
        broken.store(true, Ordering::SeqCst);
        let end = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(render_loop(
            machine.clone(),
            test_renderer(&shared),
            end.clone(),
            Duration::from_secs(1),
            SensorFailurePolicy::Skip,
        ));

        // Ticks at 0s..=2s fail, the sensor recovers before 3s and 4s.
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        broken.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(2)).await;
        end.store(true, Ordering::Release);
        task.await.unwrap().unwrap();

        assert_eq!(*shared.frames.lock().unwrap(), 2);
        assert!(shared.released.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn display_failure_ends_loop_after_teardown() {
        let shared = Shared::default();
        shared.fail_writes.store(true, Ordering::SeqCst);
        let machine = heating_machine(Arc::new(AtomicBool::new(false)));

        let result = render_loop(
            machine.clone(),
            test_renderer(&shared),
            Arc::new(AtomicBool::new(false)),
            Duration::from_secs(1),
            SensorFailurePolicy::Skip,
        )
        .await;

        assert_eq!(
            result,
            Err(RenderError::Display(DisplayError::Write(
                "bus stuck".to_string()
            )))
        );
        assert!(shared.released.load(Ordering::SeqCst));
        assert_dark(&machine).await;
    }

    #[tokio::test(start_paused = true)]
    async fn closed_button_source_ends_render_loop_when_configured() {
        let shared = Shared::default();
        let machine = shared_machine(72);
        let end = Arc::new(AtomicBool::new(false));

        let render = tokio::spawn(render_loop(
            machine.clone(),
            test_renderer(&shared),
            end.clone(),
            Duration::from_secs(1),
            SensorFailurePolicy::Skip,
        ));

        let (tx, rx) = mpsc::channel(4);
        tx.send(Button::Mode).await.unwrap();
        drop(tx);
        watch_buttons(machine.clone(), rx, end.clone(), true).await;
        assert!(end.load(Ordering::Acquire));

        render.await.unwrap().unwrap();
        assert!(shared.released.load(Ordering::SeqCst));
        assert_dark(&machine).await;
    }

    #[tokio::test]
    async fn closed_button_source_keeps_running_by_default() {
        let machine = shared_machine(72);
        let end = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<Button>(1);
        drop(tx);

        watch_buttons(machine.clone(), rx, end.clone(), false).await;

        assert!(!end.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn input_loop_applies_each_press_once() {
        let machine = shared_machine(72);
        let (tx, rx) = mpsc::channel(8);

        for button in [Button::Mode, Button::Up, Button::Up, Button::Up, Button::Down] {
            tx.send(button).await.unwrap();
        }
        drop(tx);
        input_loop(machine.clone(), rx).await;

        let machine = machine.lock().await;
        assert_eq!(machine.state(), ThermostatState::Heat);
        assert_eq!(machine.set_point(), 74);
        // 20.0C is 68F, below the set-point.
        assert_eq!(machine.heat_indicator().current(), IndicatorCommand::Pulse);
        assert_eq!(machine.cool_indicator().current(), IndicatorCommand::Off);
    }

    #[test]
    fn missing_config_file_gives_defaults() {
        let path = std::env::temp_dir().join("thermostat-config-does-not-exist.json");
        let runtime = load_runtime_config(&path).unwrap();
        assert_eq!(runtime, RuntimeConfig::default());
    }
}
