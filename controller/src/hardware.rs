use std::{
    fs::{File, OpenOptions},
    future::Future,
    io::{BufRead, Write},
    path::PathBuf,
    thread,
};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use thermostat_common::{
    config::{SerialConfig, SimulatedSensorConfig},
    ports::{Display, Indicator, SerialPort, TemperatureSensor},
    Button, DisplayError, DisplayFrame, IndicatorCommand, Measurement, PortError, SensorError,
};

// Character LCD wiring (BCM): RS, EN, D4, D5, D6, D7.
const LCD_PINS: [u8; 6] = [17, 27, 5, 6, 13, 26];

pub struct SimulatedSensor {
    base_celsius: f32,
    humidity_percent: f32,
    reads: u64,
}

impl SimulatedSensor {
    pub fn new(config: &SimulatedSensorConfig) -> Self {
        Self {
            base_celsius: config.base_celsius,
            humidity_percent: config.humidity_percent,
            reads: 0,
        }
    }
}

impl TemperatureSensor for SimulatedSensor {
    fn read(&mut self) -> Result<Measurement, SensorError> {
        self.reads = self.reads.wrapping_add(1);

        // Hardware integration point:
        // replace this slow sawtooth with the AHTx0 driver on the I2C bus.
        let step = (self.reads / 10) % 8;
        let temperature = self.base_celsius + step as f32 * 0.25;
        Ok(Measurement::new(temperature, self.humidity_percent))
    }
}

/// Two-line character display rendered into the log.
pub struct ConsoleDisplay {
    pins: Option<[u8; 6]>,
    last_frame: Option<DisplayFrame>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        info!("lcd acquired pins {:?}", LCD_PINS);
        Self {
            pins: Some(LCD_PINS),
            last_frame: None,
        }
    }

    pub fn is_released(&self) -> bool {
        self.pins.is_none()
    }
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConsoleDisplay {
    fn write(&mut self, frame: &DisplayFrame) -> Result<(), DisplayError> {
        if self.is_released() {
            return Err(DisplayError::Released);
        }
        if self.last_frame.as_ref() != Some(frame) {
            info!(target: "lcd", "[{}] [{}]", frame.line1(), frame.line2());
        }
        self.last_frame = Some(frame.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        if self.is_released() {
            return Err(DisplayError::Released);
        }
        self.last_frame = None;
        debug!(target: "lcd", "cleared");
        Ok(())
    }

    fn release(&mut self) -> Result<(), DisplayError> {
        // All six handles go together.
        if let Some(pins) = self.pins.take() {
            info!("lcd released pins {:?}", pins);
        }
        Ok(())
    }
}

impl Drop for ConsoleDisplay {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!("lcd release on drop failed: {err}");
        }
    }
}

pub struct LogIndicator {
    name: &'static str,
    pin: u8,
    current: Option<IndicatorCommand>,
}

impl LogIndicator {
    pub fn new(name: &'static str, pin: u8) -> Self {
        Self {
            name,
            pin,
            current: None,
        }
    }

    pub fn current(&self) -> IndicatorCommand {
        self.current.unwrap_or_default()
    }
}

impl Indicator for LogIndicator {
    fn set(&mut self, command: IndicatorCommand) {
        if self.current != Some(command) {
            info!("{} led (GPIO{}) -> {}", self.name, self.pin, command.as_str());
        }
        self.current = Some(command);
    }
}

/// Serial link backed by a tty device or plain file. The device is opened on
/// first use and reopened after a write failure.
pub struct FileSerial {
    path: PathBuf,
    file: Option<File>,
}

impl FileSerial {
    pub fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    fn file(&mut self) -> Result<&mut File, PortError> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(&self.path)
                .map_err(|err| {
                    PortError::Unavailable(format!("{}: {err}", self.path.display()))
                })?;
            info!("serial output opened at {}", self.path.display());
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| PortError::Unavailable(self.path.display().to_string()))
    }
}

impl SerialPort for FileSerial {
    fn write_line(&mut self, line: &str) -> Result<(), PortError> {
        if !line.is_ascii() {
            return Err(PortError::NonAscii);
        }

        let file = self.file()?;
        let result = file
            .write_all(line.as_bytes())
            .and_then(|()| file.flush());
        if let Err(err) = result {
            self.file = None;
            return Err(PortError::Write(err.to_string()));
        }
        Ok(())
    }
}

pub struct StdoutSerial;

impl SerialPort for StdoutSerial {
    fn write_line(&mut self, line: &str) -> Result<(), PortError> {
        if !line.is_ascii() {
            return Err(PortError::NonAscii);
        }
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(line.as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(|err| PortError::Write(err.to_string()))
    }
}

pub fn open_serial(config: &SerialConfig) -> Box<dyn SerialPort + Send> {
    match &config.path {
        Some(path) => {
            info!(
                "telemetry on {} ({} baud, 8N1)",
                path.display(),
                config.baud_rate
            );
            Box::new(FileSerial::new(path.clone()))
        }
        None => {
            info!("no serial path configured; telemetry goes to stdout");
            Box::new(StdoutSerial)
        }
    }
}

pub trait ButtonSource {
    /// Next clean press edge, or `None` once the source is closed.
    fn next_press(&mut self) -> impl Future<Output = Option<Button>> + Send;
}

impl ButtonSource for mpsc::Receiver<Button> {
    async fn next_press(&mut self) -> Option<Button> {
        self.recv().await
    }
}

pub fn parse_button(input: &str) -> Option<Button> {
    match input.trim().to_ascii_lowercase().as_str() {
        "m" | "c" | "mode" | "cycle" => Some(Button::Mode),
        "+" | "u" | "up" => Some(Button::Up),
        "-" | "d" | "down" => Some(Button::Down),
        _ => None,
    }
}

/// Feeds presses typed on stdin into the same channel GPIO edge callbacks
/// would use. Runs on its own thread so a pending read never holds up
/// runtime shutdown.
pub fn spawn_stdin_buttons(tx: mpsc::Sender<Button>) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("buttons".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("stdin read failed: {err}");
                        return;
                    }
                };
                match parse_button(&line) {
                    Some(button) => {
                        if tx.blocking_send(button).is_err() {
                            return;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => warn!("unrecognised input `{}` (use m, + or -)", line.trim()),
                }
            }
            debug!("stdin closed; no further button presses");
        })
}
