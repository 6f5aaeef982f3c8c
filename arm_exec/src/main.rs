//! Main arm executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Bus event acquisition (pressure readings, link failures)
//!         - Telecommand processing and handling
//!         - Arm control processing
//!         - Servo demand output
//!         - Archiving
//!
//! # Modules
//!
//! All modules (e.g. `arm_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use arm_lib::{
    bus_client::BusClient,
    data_store::DataStore,
    params::ArmExecParams,
    tc_processor,
};
use comms_if::{
    serial::{PortSelection, SerialPortTransport, SystemEnumerator},
    tc::Tc,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use crossbeam_channel::{unbounded, Receiver};
use log::{debug, info, warn};
use std::{
    io::{self, BufRead},
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};
use structopt::StructOpt;

// Internal
use util::{
    archive::Archived,
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTURES
// ---------------------------------------------------------------------------

/// Servo arm control executable
#[derive(Debug, StructOpt)]
#[structopt(name = "arm_exec")]
struct Args {
    /// Telecommand script to run. Without a script telecommands are read as
    /// JSON lines from stdin.
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Index of the serial device to use, overriding the parameter file
    #[structopt(short, long, allow_hyphen_values = true)]
    port: Option<i64>,

    /// List the available serial devices and exit
    #[structopt(long)]
    list_ports: bool,

    /// Run without any hardware
    #[structopt(long)]
    sim: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the telecommands incoming to the exec.
enum TcSource {
    Stdin(Receiver<Tc>),
    Script(ScriptInterpreter),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::from_args();

    // ---- DEVICE LISTING ----

    if args.list_ports {
        let ports = PortSelection::enumerate(&SystemEnumerator)
            .wrap_err("Failed to list the serial devices")?;

        for (i, name) in ports.display_names().iter().enumerate() {
            println!("{}: {}", i, name);
        }
        return Ok(());
    }

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("arm_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Servo Arm Executable\n");
    info!("Running on: {}", host::get_host_info());
    info!("Session directory: {:?}\n", session.session_root);

    debug!("CLI arguments: {:?}", args);

    // ---- LOAD PARAMETERS ----

    let exec_params: ArmExecParams =
        util::params::load("arm_exec.toml").wrap_err("Could not load exec params")?;
    exec_params
        .are_valid()
        .wrap_err("Invalid exec params")?;

    info!("Exec parameters loaded");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let cycle_frequency_hz = 1.0 / exec_params.cycle_period_s;

    // ---- INITIALISE TC SOURCE ----

    let mut tc_source = match args.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            TcSource::Script(si)
        }
        None => {
            info!("No script provided, telecommands will be read from stdin\n");
            TcSource::Stdin(spawn_stdin_reader().wrap_err("Failed to start the stdin reader")?)
        }
    };

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.arm_ctrl
        .init("arm_ctrl.toml", &session)
        .wrap_err("Failed to initialise ArmCtrl")?;
    info!("ArmCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE BUS ----

    let mut ports = match PortSelection::enumerate(&SystemEnumerator) {
        Ok(p) => p,
        Err(e) => {
            warn!("{}", e);
            PortSelection::default()
        }
    };

    let bus = if args.sim {
        info!("Simulation only, no servo bus");
        None
    } else {
        let index = args.port.unwrap_or(exec_params.serial_device_index);
        let port = ports.select(index).map(String::from);

        if port.is_none() {
            warn!(
                "No serial device at index {}, found: {:?}",
                index,
                ports.display_names()
            );
        }

        let client = BusClient::connect(
            exec_params.bus_config(),
            Box::new(SerialPortTransport::new()),
            port,
        )
        .wrap_err("Failed to initialise the BusClient")?;

        info!("BusClient initialised");
        Some(client)
    };

    ds.ports = ports;

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(cycle_frequency_hz);

        // ---- DATA INPUT ----

        if let Some(ref client) = bus {
            for event in client.events() {
                ds.handle_bus_event(event);
            }
        }

        // ---- TELECOMMAND PROCESSING ----

        let tcs: Vec<Tc> = match tc_source {
            TcSource::Stdin(ref receiver) => receiver.try_iter().collect(),
            TcSource::Script(ref mut si) => match si.get_pending_tcs() {
                PendingTcs::None => vec![],
                PendingTcs::Some(tc_vec) => tc_vec,
                // Exit if end of script reached
                PendingTcs::EndOfScript => {
                    info!("End of TC script reached, stopping");
                    break;
                }
            },
        };

        for tc in tcs.iter() {
            tc_processor::exec(&mut ds, bus.as_ref(), tc)
                .wrap_err("Could not pass a telecommand to the bus")?;
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        let arm_ctrl_input = ds.arm_ctrl_input();
        match ds.arm_ctrl.proc(&arm_ctrl_input) {
            Ok((o, r)) => {
                ds.arm_ctrl_output = o;
                ds.arm_ctrl_status_rpt = r;
            }
            Err(e) => {
                // ArmCtrl errors usually just mean you sent the wrong TC, so
                // just issue the warning and continue.
                warn!("Error during ArmCtrl processing: {}", e)
            }
        };

        // ---- DEMAND OUTPUT ----

        if let Some(ref client) = bus {
            for dem in ds.arm_ctrl_output.joint_dems.iter() {
                client
                    .send_joint(*dem)
                    .wrap_err("Could not send a joint demand")?;
            }

            if let Some(ref frame) = ds.arm_ctrl_output.frame {
                client
                    .send_frame(frame.clone())
                    .wrap_err("Could not send a move frame")?;
            }
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ds.arm_ctrl.write() {
            warn!("Could not archive ArmCtrl: {}", e);
        }

        if ds.is_1_hz_cycle {
            let ee = ds.arm_ctrl_output.end_effector;
            debug!(
                "Joints {:?} deg, end effector ({:.3}, {:.3}, {:.3})",
                ds.arm_ctrl_output.joint_angles_deg, ee[0], ee[1], ee[2]
            );
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    if let Some(client) = bus {
        client
            .shutdown()
            .wrap_err("Failed to stop the BusClient")?;
    }

    info!("End of execution");

    Ok(())
}

/// Start a thread parsing telecommands from stdin, one JSON packet per line.
fn spawn_stdin_reader() -> io::Result<Receiver<Tc>> {
    let (sender, receiver) = unbounded();

    thread::Builder::new()
        .name("stdin_tc".into())
        .spawn(move || {
            let stdin = io::stdin();

            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        warn!("Could not read stdin: {}", e);
                        break;
                    }
                };

                if line.trim().is_empty() {
                    continue;
                }

                match Tc::from_json(&line) {
                    Ok(tc) => {
                        if sender.send(tc).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Could not parse TC: {}", e),
                }
            }
        })?;

    Ok(receiver)
}
