//! Coverage planner executable entry point.
//!
//! # Architecture
//!
//! The executive replays a scenario file through the input bus and runs the
//! plan manager's step cycle at a fixed frequency:
//!
//!     - Initialise session, logging and the plan manager
//!     - Load the scenario and feed it into the input bus
//!     - Main loop:
//!         - Poll the input bus
//!         - Step the plan manager (worker results, acceptance, publication)
//!         - Save published artefacts to the session
//!
//! The loop ends a configurable number of cycles after the first
//! publication, or after a hard cycle cap if no path is ever found.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use plan_lib::{inputs::InputBus, plan_mgr::PlanMgr, scenario::Scenario};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Hard cap on the number of cycles, in case no path is ever published.
const MAX_CYCLES: u64 = 3000;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("plan_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Aerial Coverage Planner Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD SCENARIO ----

    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        return Err(eyre!(
            "Expected a single scenario file argument, found {} arguments",
            args.len() - 1
        ));
    }

    info!("Loading scenario from \"{}\"", &args[1]);

    let scenario = Scenario::load(&args[1]).wrap_err("Failed to load the scenario")?;

    if let Some(ref description) = scenario.description {
        info!("Scenario: {}", description);
    }
    info!(
        "Scenario has {} blind-spot polygon(s)\n",
        scenario.blind_spots.len()
    );

    // ---- INITIALISE MODULES ----

    info!("Initialising plan manager...");

    let mut plan_mgr = PlanMgr::new().wrap_err("Failed to initialise the plan manager")?;

    let cycle_period_s = 1.0 / plan_mgr.params().cycle_frequency_hz;
    let settle_cycles = scenario.settle_cycles;

    info!("Plan manager init complete\n");

    // ---- FEED THE INPUT BUS ----

    let (senders, bus) = InputBus::new();

    senders
        .pose
        .send(scenario.start_pose())
        .wrap_err("Failed to send the start pose")?;
    senders
        .envelope
        .send(scenario.envelope().wrap_err("Invalid flight envelope")?)
        .wrap_err("Failed to send the flight envelope")?;
    senders
        .blindspot
        .send(scenario.blind_spots().wrap_err("Invalid blind-spot polygon")?)
        .wrap_err("Failed to send the blind-spot region")?;
    senders
        .enable
        .send(true)
        .wrap_err("Failed to send the enable flag")?;

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let mut num_cycles: u64 = 0;
    let mut cycles_since_first_publication: Option<usize> = None;

    loop {
        let cycle_start_instant = Instant::now();

        // ---- DATA INPUT ----

        let updates = bus.poll();

        // ---- PLAN PROCESSING ----

        let output = plan_mgr
            .step(updates)
            .wrap_err("Plan manager processing failed")?;

        if let Some(output) = output {
            if cycles_since_first_publication.is_none() {
                info!(
                    "First publication: {} waypoints, optimality {:.3}, next target \
                    ({:.2}, {:.2})",
                    output.summary.num_nodes,
                    output.summary.optimality,
                    output.next_target.position_m.x,
                    output.next_target.position_m.y,
                );
                cycles_since_first_publication = Some(0);
            }

            session.save("outputs/plan_output.json", output);
        }

        // ---- CYCLE MANAGEMENT ----

        if let Some(ref mut cycles) = cycles_since_first_publication {
            *cycles += 1;
            if *cycles >= settle_cycles {
                info!("Scenario complete after {} cycles", num_cycles);
                break;
            }
        }

        num_cycles += 1;
        if num_cycles >= MAX_CYCLES {
            warn!("No path published within {} cycles, stopping", MAX_CYCLES);
            break;
        }

        let cycle_dur = Instant::now() - cycle_start_instant;
        match Duration::from_secs_f64(cycle_period_s).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - cycle_period_s
            ),
        }
    }

    // ---- SHUTDOWN ----

    drop(plan_mgr);
    session.exit();

    info!("End of execution");

    Ok(())
}
