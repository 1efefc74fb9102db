use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tokio::time::{sleep_until, Duration, Instant};

use common::resistance::surface_resistance;
use common::{round_dp, MeasurementState, RigConfig, TelemetrySample};
use sensor::spring::{CompressionSource, SimulatedSpring};

use crate::error::RigError;
use crate::hardware::{
    ContactVoltmeter, Elevator, PowerSupply, SimulatedElevator, SimulatedSupply, Voltmeter,
};

/// The collaborators one run owns exclusively.
pub struct RigDevices {
    pub supply: Box<dyn PowerSupply>,
    pub elevator: Box<dyn Elevator>,
    pub spring: Box<dyn CompressionSource>,
    pub voltmeter: Box<dyn Voltmeter>,
}

/// Per-run cancellation handle. `notify_one` stores a permit, so a
/// stop that races the settle wait still wakes it; the flag is the
/// source of truth.
struct CancelToken {
    flag: AtomicBool,
    wake: Notify,
}

impl CancelToken {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            flag: AtomicBool::new(false),
            wake: Notify::new(),
        })
    }

    fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleeps until `deadline` or until cancelled, whichever comes
    /// first. Returns whether cancellation was observed.
    async fn wait_until(&self, deadline: Instant) -> bool {
        if self.is_cancelled() {
            return true;
        }
        tokio::select! {
            _ = sleep_until(deadline) => {}
            _ = self.wake.notified() => {}
        }
        self.is_cancelled()
    }
}

struct Inner {
    state: AtomicU8,
    devices: Mutex<RigDevices>,
    cancel: std::sync::Mutex<Option<Arc<CancelToken>>>,
    config: RigConfig,
}

/// Drives one approach/dwell/retract sequence at a time.
///
/// Cheap to clone (clones the `Arc`); all clones observe the same
/// single-flight state. Telemetry callbacks run synchronously inside
/// the worker task, once per sample, in emission order; marshalling
/// to a UI thread is the caller's business.
#[derive(Clone)]
pub struct MeasurementController {
    inner: Arc<Inner>,
}

impl MeasurementController {
    pub fn new(devices: RigDevices, config: RigConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(MeasurementState::Idle as u8),
                devices: Mutex::new(devices),
                cancel: std::sync::Mutex::new(None),
                config,
            }),
        }
    }

    /// Fully simulated rig, wired like the hardware one.
    pub fn simulated(config: &RigConfig) -> Self {
        let devices = RigDevices {
            supply: Box::new(SimulatedSupply::new()),
            elevator: Box::new(SimulatedElevator::new(config.approach_step_mm)),
            spring: Box::new(SimulatedSpring::new(config.contact_offset_mm)),
            voltmeter: Box::new(ContactVoltmeter::default()),
        };
        Self::new(devices, config.clone())
    }

    pub fn state(&self) -> MeasurementState {
        MeasurementState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() != MeasurementState::Idle
    }

    /// Launches a measurement run. Returns `false` without doing
    /// anything when a run is already active: the compare-and-set on
    /// the state field is what serializes concurrent starts.
    ///
    /// `on_done` receives `Ok(())` for a completed or cancelled run
    /// and `Err` when a hardware call aborted it.
    pub fn start(
        &self,
        on_sample: impl Fn(TelemetrySample) + Send + Sync + 'static,
        on_done: impl FnOnce(Result<(), RigError>) + Send + 'static,
    ) -> bool {
        let inner = Arc::clone(&self.inner);
        if inner
            .state
            .compare_exchange(
                MeasurementState::Idle as u8,
                MeasurementState::Approaching as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            log::debug!("measurement already running, start ignored");
            return false;
        }

        let token = CancelToken::new();
        *inner.cancel.lock().unwrap() = Some(Arc::clone(&token));

        tokio::spawn(async move {
            let result = run(&inner, &token, &on_sample).await;
            if let Err(err) = &result {
                log::error!("measurement aborted: {err}");
            }
            inner.cancel.lock().unwrap().take();
            inner.state.store(MeasurementState::Idle as u8, Ordering::SeqCst);
            on_done(result);
        });
        true
    }

    /// Requests cooperative cancellation. Idempotent; a no-op while
    /// idle. Observed at tick boundaries and inside the settle wait.
    pub fn stop(&self) {
        if let Some(token) = self.inner.cancel.lock().unwrap().as_ref() {
            token.cancel();
        }
    }

    /// Stops any active run and releases the sensor transport. Safe
    /// to call in any state, repeatedly.
    pub async fn shutdown(&self) {
        self.stop();
        let mut devices = self.inner.devices.lock().await;
        devices.spring.release();
    }
}

async fn run(
    inner: &Inner,
    token: &CancelToken,
    on_sample: &(impl Fn(TelemetrySample) + Send + Sync),
) -> Result<(), RigError> {
    let cfg = &inner.config;
    let tick = Duration::from_millis(cfg.tick_period_ms);
    let mut devices = inner.devices.lock().await;

    devices.supply.set_current(cfg.current_setpoint_a)?;
    devices.supply.set_output(true)?;
    devices.elevator.reset_position()?;
    devices.elevator.start_movement()?;
    log::info!("approach started, setpoint {} A", cfg.current_setpoint_a);

    // --- Approach: tick until the contact threshold is reached ---
    let mut contact = false;
    let mut position_mm = 0.0;
    let mut next_tick = Instant::now() + tick;
    while !token.is_cancelled() {
        position_mm = devices.elevator.position()?;
        let compression = devices.spring.compression_mm(position_mm);
        let voltage = devices.voltmeter.meas_voltage(compression.unwrap_or(0.0))?;
        let current = devices.supply.read_current()?;
        let resistance = surface_resistance(voltage, current, cfg.contact_area_cm2);

        on_sample(TelemetrySample {
            elevator_mm: Some(round_dp(position_mm, 3)),
            compression_mm: compression.map(|c| round_dp(c, 3)),
            voltage_v: Some(round_dp(voltage, 3)),
            current_a: Some(round_dp(current, 3)),
            resistance_mohm_cm2: resistance.map(|r| round_dp(r, 2)),
            is_final: false,
        });

        if compression.unwrap_or(0.0) >= cfg.contact_threshold_mm {
            devices.elevator.stop_movement()?;
            contact = true;
            log::info!("contact threshold reached at {position_mm:.3} mm");
            break;
        }

        if token.wait_until(next_tick).await {
            break;
        }
        next_tick += tick;
    }

    // --- Dwell: settle, then one final reading. Skipped on cancel ---
    if contact && !token.is_cancelled() {
        inner
            .state
            .store(MeasurementState::Dwelling as u8, Ordering::SeqCst);
        let settle = Instant::now() + Duration::from_millis(cfg.settle_time_ms);
        if !token.wait_until(settle).await {
            let compression = devices.spring.compression_mm(position_mm).unwrap_or(0.0);
            let voltage = devices.voltmeter.meas_voltage(compression)?;
            let current = devices.supply.read_current()?;
            let resistance = surface_resistance(voltage, current, cfg.contact_area_cm2);
            on_sample(TelemetrySample {
                elevator_mm: None,
                compression_mm: None,
                voltage_v: Some(round_dp(voltage, 3)),
                current_a: Some(round_dp(current, 3)),
                resistance_mohm_cm2: resistance.map(|r| round_dp(r, 2)),
                is_final: true,
            });
        }
    }

    // --- Retract: supply off first, regardless of cancellation ---
    inner
        .state
        .store(MeasurementState::Retracting as u8, Ordering::SeqCst);
    devices.supply.set_output(false)?;
    devices.elevator.start_movement()?;

    // Recorded position lives on the same 3-decimal grid the samples
    // carry, so the sequence ends in a single exact zero.
    let mut recorded_mm = round_dp(position_mm, 3);
    let mut next_tick = Instant::now() + tick;
    while recorded_mm > 0.0 && !token.is_cancelled() {
        recorded_mm = round_dp((recorded_mm - cfg.retract_step_mm).max(0.0), 3);
        on_sample(TelemetrySample::elevator_only(recorded_mm));
        if token.wait_until(next_tick).await {
            break;
        }
        next_tick += tick;
    }

    devices.elevator.stop_movement()?;
    log::info!("run finished, elevator back at {recorded_mm:.3} mm");
    Ok(())
}
