use agora_runner::statistics::{agent_bit_records, rule_records};
use agora_runner::{
    AgentBitRecord, PeriodExecutor, RuleRecord, RunSummary, RunnerError, SimulationConfig, World,
};
use log::info;
use serde::Serialize;

fn print_help() {
    eprintln!(
        r#"Agora market simulator

USAGE:
    agora-sim [CONFIG]

ARGS:
    CONFIG      JSON configuration file (default: classic preset)

ENVIRONMENT VARIABLES:
    RUST_LOG    Log level filter

Prints the run summary, the rule dump and the bit-usage dump as JSON.
"#
    );
}

#[derive(Serialize)]
struct RunOutput {
    summary: RunSummary,
    rules: Vec<RuleRecord>,
    bits: Vec<AgentBitRecord>,
}

fn main() -> Result<(), RunnerError> {
    env_logger::init();

    let config = match std::env::args().nth(1).as_deref() {
        Some("--help" | "-h") => {
            print_help();
            return Ok(());
        }
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::classic(),
    };

    let world = World::setup(config)?;
    info!("Starting run with {} agents", world.agents().len());

    let mut executor = PeriodExecutor::new(world);
    let summary = executor.run();

    let agents = executor.world().agents();
    let output = RunOutput {
        summary,
        rules: rule_records(agents),
        bits: agent_bit_records(agents),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
