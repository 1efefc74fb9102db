mod menu;

use std::sync::mpsc;
use std::sync::Arc;

use common::config::{load_config, RigConfig};
use common::diagnostics::DecodeStats;
use common::TelemetrySample;
use rig::controller::{MeasurementController, RigDevices};
use rig::hardware::{ContactVoltmeter, SimulatedElevator, SimulatedSupply};
use sensor::spring::MagneticSpring;
use sensor::transport::SerialTransport;

fn main() {
    env_logger::init();

    println!("==========================================");
    println!("Through-Plane Resistance Measurement Rig");
    println!("==========================================");

    let config = load_config("configs/rig_baseline.toml").unwrap_or_else(|err| {
        println!("Using default configuration ({err})");
        RigConfig::default()
    });

    let rt = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");

    loop {
        menu::show_menu();

        match menu::get_user_choice() {
            Ok(1) => run_simulated(&config, &rt),
            Ok(2) => run_with_sensor(&config, &rt),
            Ok(3) => {
                println!("Goodbye!");
                break;
            }
            _ => println!("Invalid choice. Please select 1-3."),
        }
    }
}

fn run_simulated(config: &RigConfig, rt: &tokio::runtime::Runtime) {
    println!("\n=== Simulated measurement run ===");
    println!(
        "Configuration: {} ms tick, {:.2} A setpoint, contact at {:.2} mm",
        config.tick_period_ms, config.current_setpoint_a, config.contact_threshold_mm
    );

    let controller = MeasurementController::simulated(config);
    drive(&controller, rt);
}

fn run_with_sensor(config: &RigConfig, rt: &tokio::runtime::Runtime) {
    println!("\n=== Measurement run with magnetic spring sensor ===");

    let transport = match SerialTransport::open(config.serial_port.as_deref(), config.baud_rate) {
        Ok(transport) => transport,
        Err(err) => {
            println!("Sensor connection failed: {err}");
            return;
        }
    };

    let stats = Arc::new(DecodeStats::new());
    let devices = RigDevices {
        supply: Box::new(SimulatedSupply::new()),
        elevator: Box::new(SimulatedElevator::new(config.approach_step_mm)),
        spring: Box::new(MagneticSpring::new(
            Box::new(transport),
            Arc::clone(&stats),
        )),
        voltmeter: Box::new(ContactVoltmeter::default()),
    };
    let controller = MeasurementController::new(devices, config.clone());

    drive(&controller, rt);
    println!("Sensor link quality: {}", stats.snapshot());
    rt.block_on(controller.shutdown());
}

/// Runs one measurement, printing every telemetry sample. Enter stops
/// the run early, or returns to the menu once it has finished.
fn drive(controller: &MeasurementController, rt: &tokio::runtime::Runtime) {
    let (done_tx, done_rx) = mpsc::channel();
    let started = {
        let _guard = rt.enter();
        controller.start(print_sample, move |result| {
            let _ = done_tx.send(result);
        })
    };
    if !started {
        println!("A measurement is already running.");
        return;
    }

    println!("Press Enter to stop the run...");
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
    controller.stop();

    match done_rx.recv() {
        Ok(Ok(())) => println!("Run finished."),
        Ok(Err(err)) => println!("Run aborted: {err}"),
        Err(_) => println!("Controller went away unexpectedly."),
    }
}

fn print_sample(sample: TelemetrySample) {
    let cell = |value: Option<f64>| match value {
        Some(v) => format!("{v:8.3}"),
        None => "       -".to_string(),
    };
    let tag = if sample.is_final { "FINAL" } else { "     " };
    println!(
        "[{tag}] pos {} mm | comp {} mm | U {} V | I {} A | R {} mOhm*cm2",
        cell(sample.elevator_mm),
        cell(sample.compression_mm),
        cell(sample.voltage_v),
        cell(sample.current_a),
        cell(sample.resistance_mohm_cm2),
    );
}
