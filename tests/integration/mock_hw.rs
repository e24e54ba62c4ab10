//! Mock hardware and network adapters for integration tests.
//!
//! The board is the real [`NodeBoard`] with the real [`Thermometer`] and
//! [`PressureSensor`] wrapped around scripted leaves, so the tests exercise
//! the glitch retry and the psi conversion too.  Every leaf shares its state
//! through `Rc` handles that the test keeps after the board is moved into
//! place.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;

use tanknode::adapters::hardware::NodeBoard;
use tanknode::app::events::{AppEvent, ReportData};
use tanknode::app::ports::{
    ButtonPort, Clock, DisplayPort, EventSink, HttpSocket, HttpTransport, RadioError,
    TransportError, WifiRadio,
};
use tanknode::app::ControlLoop;
use tanknode::config::NodeConfig;
use tanknode::error::SensorError;
use tanknode::net::{ConnectivityMonitor, Reporter};
use tanknode::sensors::flow::{PulseAccumulator, PULSES_PER_LITER};
use tanknode::sensors::pressure::{AnalogInput, PressureSensor};
use tanknode::sensors::temperature::{TemperatureProbe, Thermometer};

pub const TEST_SSID: &str = "FieldHotspot";
pub const TEST_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 20);
pub const OK_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\n7";

// ── Display ───────────────────────────────────────────────────

#[derive(Default)]
pub struct PanelState {
    pub writes: Vec<(u8, u8, String)>,
    pub clears: u32,
    pub powered: bool,
    pub power_log: Vec<bool>,
    /// Each write advances this clock by the given milliseconds.
    pub write_cost: Option<(Rc<Cell<u64>>, u64)>,
}

impl PanelState {
    /// Most recent text written at (`row`, `col`).
    pub fn text_at(&self, row: u8, col: u8) -> Option<&str> {
        self.writes
            .iter()
            .rev()
            .find(|(r, c, _)| *r == row && *c == col)
            .map(|(_, _, t)| t.as_str())
    }

    pub fn any_write_contains(&self, needle: &str) -> bool {
        self.writes.iter().any(|(_, _, t)| t.contains(needle))
    }
}

pub struct MockPanel(pub Rc<RefCell<PanelState>>);

impl DisplayPort for MockPanel {
    fn clear(&mut self) {
        self.0.borrow_mut().clears += 1;
    }

    fn write(&mut self, row: u8, col: u8, text: &str) {
        let mut p = self.0.borrow_mut();
        p.writes.push((row, col, text.to_owned()));
        if let Some((clock, ms)) = &p.write_cost {
            clock.set(clock.get() + ms);
        }
    }

    fn set_power(&mut self, on: bool) {
        let mut p = self.0.borrow_mut();
        p.powered = on;
        p.power_log.push(on);
    }

    fn is_powered(&self) -> bool {
        self.0.borrow().powered
    }
}

// ── Temperature probe ─────────────────────────────────────────

pub struct ProbeState {
    /// Consumed one per read; `steady` once empty.
    pub readings: VecDeque<Result<f32, SensorError>>,
    pub steady: Result<f32, SensorError>,
    pub conversions: u32,
    pub reads: u32,
}

impl Default for ProbeState {
    fn default() -> Self {
        Self {
            readings: VecDeque::new(),
            steady: Ok(20.0),
            conversions: 0,
            reads: 0,
        }
    }
}

pub struct ScriptedProbe(pub Rc<RefCell<ProbeState>>);

impl TemperatureProbe for ScriptedProbe {
    fn start_conversion(&mut self) -> Result<(), SensorError> {
        self.0.borrow_mut().conversions += 1;
        Ok(())
    }

    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        let mut p = self.0.borrow_mut();
        p.reads += 1;
        let steady = p.steady;
        p.readings.pop_front().unwrap_or(steady)
    }
}

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _: u32) {}
}

// ── Pressure ADC ──────────────────────────────────────────────

pub struct FixedAdc(pub Rc<Cell<Result<u16, SensorError>>>);

impl AnalogInput for FixedAdc {
    fn read_millivolts(&mut self) -> Result<u16, SensorError> {
        self.0.get()
    }
}

// ── Button ────────────────────────────────────────────────────

/// Each queued press is reported once.
pub struct MockButton(pub Rc<Cell<u32>>);

impl ButtonPort for MockButton {
    fn was_pressed(&mut self) -> bool {
        let n = self.0.get();
        if n == 0 {
            return false;
        }
        self.0.set(n - 1);
        true
    }
}

pub type MockBoard =
    NodeBoard<MockPanel, Thermometer<ScriptedProbe, NoDelay>, PressureSensor<FixedAdc>, MockButton>;

// ── Clock ─────────────────────────────────────────────────────

/// Manual clock; sleeping advances it.  The time cell can be shared with
/// mocks whose operations take time.
#[derive(Default)]
pub struct MockClock {
    pub ms: Rc<Cell<u64>>,
    pub slept_ms: u64,
}

impl MockClock {
    pub fn now_ms(&self) -> u64 {
        self.ms.get()
    }

    pub fn set_secs(&mut self, secs: u64) {
        self.ms.set(secs * 1000);
    }
}

impl Clock for MockClock {
    fn now_secs(&self) -> u64 {
        self.ms.get() / 1000
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.ms.set(self.ms.get() + u64::from(ms));
        self.slept_ms += u64::from(ms);
    }
}

// ── Radio ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct RadioState {
    pub in_range: bool,
    pub refuse_connect: bool,
    pub scan_fails: bool,
    /// The link comes up as soon as `connect` is called.
    pub associate_immediately: bool,
    pub linked: bool,
    /// Other access points in range, listed ahead of the target.
    pub neighbours: usize,
    pub scans: u32,
    pub connects: u32,
    pub disconnects: u32,
}

pub struct MockRadio(pub Rc<RefCell<RadioState>>);

impl WifiRadio for MockRadio {
    fn scan_for(&mut self, ssid: &str) -> Result<bool, RadioError> {
        let mut r = self.0.borrow_mut();
        r.scans += 1;
        if r.scan_fails {
            return Err(RadioError::ScanFailed);
        }
        // Stronger neighbours come first, the target last.
        let neighbours: Vec<String> = (0..r.neighbours.max(1))
            .map(|i| format!("Neighbour-{i}"))
            .collect();
        let target = r.in_range.then_some(TEST_SSID);
        Ok(neighbours
            .iter()
            .map(String::as_str)
            .chain(target)
            .any(|ap| ap == ssid))
    }

    fn connect(&mut self, _ssid: &str, _password: &str) -> Result<(), RadioError> {
        let mut r = self.0.borrow_mut();
        r.connects += 1;
        if r.refuse_connect {
            return Err(RadioError::ConnectFailed);
        }
        if r.associate_immediately && r.in_range {
            r.linked = true;
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), RadioError> {
        let mut r = self.0.borrow_mut();
        r.disconnects += 1;
        r.linked = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.0.borrow().linked
    }

    fn ip_address(&self) -> Option<Ipv4Addr> {
        self.0.borrow().linked.then_some(TEST_IP)
    }
}

// ── Transport ─────────────────────────────────────────────────

#[derive(Default)]
pub struct TransportLog {
    pub fail_open: bool,
    pub fail_send: bool,
    pub response: Vec<u8>,
    pub opens: Vec<(String, u16)>,
    pub requests: Vec<String>,
    pub closes: u32,
}

pub struct MockTransport(pub Rc<RefCell<TransportLog>>);

pub struct MockSocket {
    log: Rc<RefCell<TransportLog>>,
    remaining: VecDeque<u8>,
}

impl HttpTransport for MockTransport {
    type Socket = MockSocket;

    fn open(&mut self, host: &str, port: u16) -> Result<MockSocket, TransportError> {
        let mut log = self.0.borrow_mut();
        log.opens.push((host.to_owned(), port));
        if log.fail_open {
            return Err(TransportError::Resolve);
        }
        Ok(MockSocket {
            log: Rc::clone(&self.0),
            remaining: log.response.iter().copied().collect(),
        })
    }
}

impl HttpSocket for MockSocket {
    fn connect_and_send(&mut self, request: &[u8]) -> Result<(), TransportError> {
        let mut log = self.log.borrow_mut();
        if log.fail_send {
            return Err(TransportError::Send);
        }
        log.requests.push(String::from_utf8_lossy(request).into_owned());
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        // Dribble the response out in small pieces.
        let n = buf.len().min(self.remaining.len()).min(16);
        for b in buf.iter_mut().take(n) {
            *b = self.remaining.pop_front().unwrap_or(0);
        }
        Ok(n)
    }

    fn close(&mut self) {
        self.log.borrow_mut().closes += 1;
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn reports(&self) -> Vec<ReportData> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::ReportCompleted(r) => Some(*r),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type TestLoop = ControlLoop<'static, MockRadio, MockTransport>;

/// A control loop plus handles onto every mock behind it.
pub struct Rig {
    pub control: TestLoop,
    pub board: MockBoard,
    pub clock: MockClock,
    pub sink: RecordingSink,
    pub flow: &'static PulseAccumulator,
    pub panel: Rc<RefCell<PanelState>>,
    pub probe: Rc<RefCell<ProbeState>>,
    pub adc: Rc<Cell<Result<u16, SensorError>>>,
    pub presses: Rc<Cell<u32>>,
    pub radio: Rc<RefCell<RadioState>>,
    pub net: Rc<RefCell<TransportLog>>,
}

pub fn test_config() -> NodeConfig {
    NodeConfig::from_json(&format!(
        r#"{{
            "hostname": "tank-01",
            "ssid": "{TEST_SSID}",
            "pwd": "correcthorse",
            "api_key": "KEY123",
            "report_interval_secs": 60,
            "pre_conversion_lead_secs": 5,
            "first_report_delay_secs": 10,
            "reconnect_report_delay_secs": 3,
            "retry_delay_secs": 7,
            "scan_interval_secs": 5,
            "connect_timeout_secs": 20,
            "startup_connect_timeout_secs": 4,
            "display_timeout_secs": 30,
            "conversion_settle_ms": 750
        }}"#
    ))
    .expect("test config is valid")
}

impl Rig {
    /// Rig with the network in range and a collector that answers 200 OK.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: NodeConfig) -> Self {
        let flow: &'static PulseAccumulator =
            Box::leak(Box::new(PulseAccumulator::new(PULSES_PER_LITER)));

        let panel = Rc::new(RefCell::new(PanelState::default()));
        let probe = Rc::new(RefCell::new(ProbeState::default()));
        // 2.5 V → 50 psi
        let adc = Rc::new(Cell::new(Ok(2500)));
        let presses = Rc::new(Cell::new(0));
        let radio = Rc::new(RefCell::new(RadioState {
            in_range: true,
            associate_immediately: true,
            ..RadioState::default()
        }));
        let net = Rc::new(RefCell::new(TransportLog {
            response: OK_RESPONSE.to_vec(),
            ..TransportLog::default()
        }));

        let board = NodeBoard::new(
            MockPanel(Rc::clone(&panel)),
            Thermometer::with_settle_ms(
                ScriptedProbe(Rc::clone(&probe)),
                NoDelay,
                config.conversion_settle_ms,
            ),
            PressureSensor::new(FixedAdc(Rc::clone(&adc))),
            MockButton(Rc::clone(&presses)),
        );
        let monitor = ConnectivityMonitor::new(
            MockRadio(Rc::clone(&radio)),
            config.scan_interval_secs,
            config.connect_timeout_secs,
        );
        let reporter = Reporter::new(MockTransport(Rc::clone(&net)));
        let control = ControlLoop::new(config, flow, monitor, reporter);

        Self {
            control,
            board,
            clock: MockClock::default(),
            sink: RecordingSink::default(),
            flow,
            panel,
            probe,
            adc,
            presses,
            radio,
            net,
        }
    }

    pub fn start(&mut self) {
        self.control
            .start(&mut self.board, &mut self.clock, &mut self.sink);
    }

    /// Tick at the clock's current second, then advance it by one second.
    pub fn step(&mut self) {
        let now = self.clock.now_secs();
        self.control
            .tick(now, &mut self.board, &mut self.clock, &mut self.sink);
        // Land exactly on the next whole second, whatever the tick slept.
        self.clock.set_secs(now.max(self.clock.now_secs()) + 1);
    }

    /// One pass of the production loop body: tick, then sub-tick until the
    /// second changes.  Returns the second that was ticked.
    pub fn run_once(&mut self) -> u64 {
        let now = self.clock.now_secs();
        self.control
            .tick(now, &mut self.board, &mut self.clock, &mut self.sink);
        self.control
            .await_next_second(now, &mut self.board, &mut self.clock, &mut self.sink);
        now
    }

    /// Writes to the panel take `ms` of wall time from now on.
    pub fn slow_panel(&self, ms: u64) {
        self.panel.borrow_mut().write_cost = Some((Rc::clone(&self.clock.ms), ms));
    }

    /// Step until the clock reads `secs`.
    pub fn run_until(&mut self, secs: u64) {
        while self.clock.now_secs() < secs {
            self.step();
        }
    }

    pub fn pulse(&self, n: u32) {
        for _ in 0..n {
            self.flow.on_pulse();
        }
    }
}
