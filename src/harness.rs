//! Builds schedulers from configuration and drives them for the CLI commands.

use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use looper::{CheckPoint, RunOutcome, Scheduler, Stepper};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::config::Config;

pub type Sched = Scheduler<String, String>;

const POLL: Duration = Duration::from_millis(20);

/// Build one stack per configured mode. With `echo`, every level prints its
/// start and end lines, indented by depth.
pub fn build_scheduler(config: &Config, echo: bool) -> Result<Sched> {
    let mut sched = Sched::new();
    sched.set_trace_depth(config.trace.depth);

    for sc in &config.stacks {
        let stack = sched
            .add_stack(sc.mode.clone())
            .context(format!("Failed to add stack {}", sc.mode))?;
        for lc in &sc.levels {
            stack
                .add_level_with_increment(lc.name.clone(), lc.max, lc.inc)
                .context(format!("Failed to add level {}:{}", sc.mode, lc.name))?;
            let lp = stack.level_mut(&lc.name)?;
            lp.set_step_default(lc.step_default);
            for ev in &lc.events {
                let label = format!("{}:{} {}", sc.mode, lc.name, ev.name);
                let at = ev.at;
                lp.add_event(ev.name.clone(), at, move || {
                    info!("Event {} at {}", label, at);
                    if echo {
                        println!("{} {}", "event".magenta(), label);
                    }
                })?;
            }
        }
        if echo {
            add_echo(stack)?;
        }
    }
    Ok(sched)
}

fn add_echo(stack: &mut looper::Stack<String, String>) -> Result<()> {
    let mode = stack.mode().clone();
    for (depth, lp) in stack.loops_mut().enumerate() {
        let pad = "  ".repeat(depth);
        let name = format!("{}:{}", mode, lp.level());

        let ctr = lp.counter().clone();
        let (p, n) = (pad.clone(), name.clone());
        lp.add_on_start("echo", move || println!("{}{} {} {}", p, n, "start".cyan(), ctr.cur()))?;
        let ctr = lp.counter().clone();
        lp.add_on_end("echo", move || println!("{}{} {} {}", pad, name, "end".green(), ctr.cur()))?;
    }
    Ok(())
}

/// Indented listing, or a JSON summary, of every configured stack.
pub fn doc(config: &Config, json: bool) -> Result<String> {
    let sched = build_scheduler(config, false)?;
    if json {
        return serde_json::to_string_pretty(&sched.summary()).context("Failed to serialize summary");
    }
    Ok(sched.doc_string())
}

pub fn run(config: &Config, mode: &str, echo: bool) -> Result<RunOutcome<String>> {
    let mut sched = build_scheduler(config, echo)?;
    let outcome = sched.run(mode.to_string()).context(format!("Failed to run {}", mode))?;
    info!("Run {} {}", mode, outcome);
    Ok(outcome)
}

/// Take up to `times` steps of `count` iterations at `level`, stopping early
/// once the mode completes.
pub fn step(config: &Config, mode: &str, level: &str, count: i64, times: u32, echo: bool) -> Result<Vec<RunOutcome<String>>> {
    let mut sched = build_scheduler(config, echo)?;
    let level = level.to_string();
    let mut outcomes = Vec::new();
    for i in 0..times {
        let outcome = sched
            .step(mode.to_string(), count, &level)
            .context(format!("Failed to step {} at {}", mode, level))?;
        info!("Step {} of {}: {}", i + 1, times, outcome);
        if echo {
            println!("{} {}", "step".yellow(), outcome);
        }
        let complete = outcome.is_complete();
        outcomes.push(outcome);
        if complete {
            break;
        }
    }
    Ok(outcomes)
}

#[derive(Debug, Clone)]
pub struct PaceOptions {
    pub mode: String,
    pub grain: String,
    pub steps: i64,
    pub pauses: usize,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaceReport {
    pub pauses: usize,
    pub outcome: RunOutcome<String>,
}

/// Run a mode on a worker thread with a step check point at the end of each
/// `grain` iteration. The controller resumes after every pause until
/// `pauses` have been seen, then stops the stepper, which halts the run at
/// the next `grain` boundary.
pub fn pace(config: &Config, opts: &PaceOptions, echo: bool) -> Result<PaceReport> {
    let mut sched = build_scheduler(config, echo)?;
    let halt = sched
        .stop_handle(&opts.mode, &opts.grain)
        .context(format!("Failed to pace {} at {}", opts.mode, opts.grain))?;

    let (tx, rx) = mpsc::channel();
    let stepper = Arc::new(
        Stepper::new(move || {
            let _ = tx.send(());
        })
        .with_watchdog(Duration::from_millis(config.stepper.watchdog_ms)),
    );
    {
        let stepper = stepper.clone();
        let grain = opts.grain.clone();
        sched.loop_mut(&opts.mode, &opts.grain)?.add_on_end("check point", move || {
            if stepper.check_point(&grain) == CheckPoint::Halt {
                halt.stop();
            }
        })?;
    }

    stepper.start_stepping(opts.grain.clone(), opts.steps);
    let mode = opts.mode.clone();
    let worker = thread::spawn(move || sched.run(mode));

    let mut pauses = 0;
    loop {
        match rx.recv_timeout(POLL) {
            Ok(()) => {
                pauses += 1;
                info!("Paused {} of {} at {}", pauses, opts.pauses, opts.grain);
                if echo {
                    println!("{} {}", "paused".yellow(), pauses);
                }
                thread::sleep(opts.delay);
                if pauses >= opts.pauses {
                    stepper.stop();
                    break;
                }
                stepper.start_stepping(opts.grain.clone(), 0);
            }
            Err(RecvTimeoutError::Timeout) if !worker.is_finished() => {}
            Err(_) => break,
        }
    }

    let outcome = worker
        .join()
        .map_err(|_| eyre!("Scheduler thread panicked"))?
        .context(format!("Failed to run {}", opts.mode))?;
    info!("Pace {} finished after {} pauses: {}", opts.mode, pauses, outcome);
    Ok(PaceReport { pauses, outcome })
}
