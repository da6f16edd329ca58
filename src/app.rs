//! Terminal menu for operating the cryocooler
//!
//! Presentation only: reads operator choices, calls the public session
//! operations and prints what came back. Frames and sockets never appear
//! at this layer.

use crate::error::{Error, Result};
use crate::probe;
use crate::session::DeviceSession;
use crate::transport::{Transport, STATUS_PORT};
use crate::types::{turbo_label, AutofillMode, Outcome, WorkflowOutcome};
use std::io::{self, Write};

/// Interactive menu over one device session
pub struct App<T: Transport> {
    session: DeviceSession<T>,
}

impl<T: Transport> App<T> {
    /// Wrap a session for interactive use
    pub fn new(session: DeviceSession<T>) -> Self {
        Self { session }
    }

    /// Run the menu loop until the operator exits
    pub fn run(&mut self) -> Result<()> {
        draw_logo();

        loop {
            // Refresh before every redraw so the header reflects the device,
            // not the last thing we did.
            if let Err(e) = self.session.refresh_status() {
                log::warn!("status refresh failed: {}", e);
            }
            self.draw_menu();

            let choice = prompt("Enter your choice: ")?;
            match choice.trim() {
                "0" => self.show_info(),
                "1" => println!("Updating Run Mode"),
                "2" => self.shutdown_and_get_ready(),
                "3" => self.get_ready(),
                "4" => self.set_temperature_and_go(),
                "5" => self.set_autofill_mode(),
                "6" => self.software_annealing(),
                "7" => self.set_turbo_mode(),
                "8" => return Ok(()),
                other => println!("Invalid choice {:?}. Please select a valid option [0-8].", other),
            }
        }
    }

    fn draw_menu(&self) {
        let ip = self.session.device_addr();
        let run_mode = match self.session.run_mode() {
            Ok(mode) => mode.to_string(),
            Err(_) => "Unavailable".to_string(),
        };

        println!();
        println!(
            "Cryostream 800 (IP {}:{}) [{}]:",
            ip,
            STATUS_PORT,
            probe::online_label(ip)
        );
        println!("Run Mode (Status): [{}]", run_mode);
        println!("[0] Info.");
        println!("[1] Update Run Mode (Status).");
        println!("[2] Stop (Shutdown and Get Ready).");
        println!("[3] Restart (Get Ready).");
        println!("[4] Set Temperature and Go.");
        println!("[5] Set Autofill Mode.");
        println!("[6] Software Annealing.");
        println!("[7] Set Turbo Mode [On, Off].");
        println!("[8] Exit.");
    }

    fn show_info(&mut self) {
        if let Err(e) = self.session.refresh_status() {
            println!("Could not refresh status: {}", e);
            return;
        }

        let ip = self.session.device_addr();
        println!();
        println!("Cryostream 800 [Status]:");
        match self.session.run_mode() {
            Ok(mode) => println!("Run Mode: [{}]", mode),
            Err(e) => println!("Run Mode: unavailable ({})", e),
        }
        println!("IP: {}:{} ({})", ip, STATUS_PORT, probe::online_label(ip));
        if let Ok(mode) = self.session.autofill_mode() {
            println!("Autofill Mode: {}", mode);
        }
        if let Ok(level) = self.session.autofill_ln_level() {
            println!("Autofill LN Level: {}%", level as f64 / 100.0);
        }
        if let Ok(temp) = self.session.sample_temperature() {
            println!("Sample Temperature: {} K", temp as f64 / 100.0);
        }
        if let Ok(temp) = self.session.target_temperature() {
            println!("Target Temperature: {} K", temp as f64 / 100.0);
        }
        if let Ok(temp) = self.session.min_temperature() {
            println!("Min Temperature: {} K", temp as f64 / 100.0);
        }
        if let Ok(temp) = self.session.max_temperature() {
            println!("Max Temperature: {} K", temp as f64 / 100.0);
        }
        if let Ok(raw) = self.session.turbo_mode() {
            println!("Turbo Mode: {}", turbo_label(raw));
        }
    }

    fn shutdown_and_get_ready(&mut self) {
        println!("Attempting to stop cooling and restore Ready mode...");
        match self.session.shutdown_and_ready() {
            Ok(WorkflowOutcome::Completed) => println!("Device is back in Ready Mode!"),
            Ok(WorkflowOutcome::FailedAt { step, outcome }) => {
                println!("{} step did not confirm ({:?}).", step, outcome);
                println!("Use Restart (Get Ready) to restore Ready state.");
            }
            Err(e) => println!("Operation failed: {}", e),
        }
    }

    fn get_ready(&mut self) {
        match self.session.restart_confirmed() {
            Ok(outcome) if outcome.is_confirmed() => println!("Device is back in Ready Mode!"),
            Ok(Outcome::DeviceOverride) => println!("Device refused the restart."),
            Ok(_) => {
                println!("Device still in shutdown mode!");
                println!("Please, rerun this command.");
            }
            Err(e) => println!("Operation failed: {}", e),
        }
    }

    fn set_temperature_and_go(&mut self) {
        let range = match (self.session.min_temperature(), self.session.max_temperature()) {
            (Ok(min), Ok(max)) => format!("[{},{}]", min as f64 / 100.0, max as f64 / 100.0),
            _ => "[device limits unavailable]".to_string(),
        };
        let input = match prompt(&format!("Enter a target temperature in K between {}: ", range)) {
            Ok(line) => line,
            Err(e) => {
                println!("Input error: {}", e);
                return;
            }
        };
        let kelvin = match parse_temperature(&input) {
            Ok(value) => value,
            Err(e) => {
                println!("{}", e);
                return;
            }
        };

        match self.session.ready_set_temperature_and_go(kelvin) {
            Ok(WorkflowOutcome::Completed) => {
                println!("Cooling, target temperature set to {} K.", kelvin);
                println!("Confirmed by network confirmation on device status.");
            }
            Ok(WorkflowOutcome::FailedAt { step, outcome }) => {
                println!("{} step did not confirm ({:?}).", step, outcome);
            }
            Err(e) => println!("Temperature not set: {}", e),
        }
    }

    fn set_autofill_mode(&mut self) {
        println!("Enter Auto Fill Mode:");
        println!("[0] Set to Manual.");
        println!("[1] Set to Auto.");
        let input = match prompt("Enter your Auto Fill mode: ") {
            Ok(line) => line,
            Err(e) => {
                println!("Input error: {}", e);
                return;
            }
        };
        let desired = match input.trim() {
            "0" => AutofillMode::Manual,
            "1" => AutofillMode::Auto,
            other => {
                println!(
                    "Invalid Auto Fill Mode {:?}. Please, enter [0] Manual or [1] Auto.",
                    other
                );
                return;
            }
        };

        match self.session.set_autofill_confirmed(desired) {
            Ok(outcome) if outcome.is_confirmed() => println!("Auto Fill Mode set to {}.", desired),
            Ok(Outcome::DeviceOverride) => {
                println!("Device is scheduling refills itself; mode not changed.")
            }
            Ok(_) => println!("It was not possible to set Auto Fill Mode. Try again."),
            Err(e) => println!("Operation failed: {}", e),
        }
    }

    fn software_annealing(&mut self) {
        let input = match prompt("Enter an anneal target temperature in K [default 100]: ") {
            Ok(line) => line,
            Err(e) => {
                println!("Input error: {}", e);
                return;
            }
        };
        let kelvin = if input.trim().is_empty() {
            100.0
        } else {
            match parse_temperature(&input) {
                Ok(value) => value,
                Err(e) => {
                    println!("{}", e);
                    return;
                }
            }
        };

        match self.session.software_anneal(kelvin) {
            Ok(WorkflowOutcome::Completed) => println!("Anneal cycle complete, cooling to {} K.", kelvin),
            Ok(WorkflowOutcome::FailedAt { step, outcome }) => {
                println!("Anneal stopped: {} step did not confirm ({:?}).", step, outcome)
            }
            Err(e) => println!("Operation failed: {}", e),
        }
    }

    fn set_turbo_mode(&mut self) {
        println!("Enter Turbo Mode:");
        println!("[0] Set to Off.");
        println!("[1] Set to On.");
        let input = match prompt("Enter your turbo mode choice: ") {
            Ok(line) => line,
            Err(e) => {
                println!("Input error: {}", e);
                return;
            }
        };
        let on = match input.trim() {
            "0" => false,
            "1" => true,
            other => {
                println!(
                    "Invalid Turbo Mode {:?}. Please, enter [0] Set to Off, [1] Set to On.",
                    other
                );
                return;
            }
        };

        match self.session.set_turbo_confirmed(on) {
            Ok(outcome) if outcome.is_confirmed() => {
                println!("Turbo Mode set to {}.", if on { "On" } else { "Off" })
            }
            Ok(Outcome::DeviceOverride) => {
                println!("Device is in control of turbo; settings cannot be changed.")
            }
            Ok(_) => println!("Turbo Mode not set. Try again."),
            Err(e) => println!("Operation failed: {}", e),
        }
    }
}

fn draw_logo() {
    println!();
    println!("   ______                      __");
    println!("  / ____/______  ______  _____/ /_________  ____ _____ ___");
    println!(" / /   / ___/ / / / __ \\/ ___/ __/ ___/ _ \\/ __ `/ __ `__ \\");
    println!("/ /___/ /  / /_/ / /_/ (__  ) /_/ /  /  __/ /_/ / / / / / /");
    println!("\\____/_/   \\__, /\\____/____/\\__/_/   \\___/\\__,_/_/ /_/ /_/");
    println!("          /____/                        Cryostream 800 Ed.");
    println!();
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

fn parse_temperature(input: &str) -> Result<f64> {
    input
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::NotNumeric(input.trim().to_string()))
}
