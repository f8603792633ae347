use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use mdo_core::{Communicator, TopologyProvenance};
use mdo_topology::{Connection, NodeOutline, ScenarioFile};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Scenario file (YAML or JSON).
    #[arg(long)]
    pub config: PathBuf,
    /// Emit the outline, connections and provenance as JSON.
    #[arg(long)]
    pub json: bool,
    /// Label of the communicator forwarded to builders in parallel mode.
    #[arg(long, default_value = "serial")]
    pub comm: String,
}

#[derive(Debug, Serialize)]
struct PlanReport<'a> {
    scenario: &'a str,
    outline: NodeOutline,
    connections: &'a [Connection],
    provenance: &'a TopologyProvenance,
}

pub fn run(args: &PlanArgs) -> Result<(), Box<dyn Error>> {
    let file = ScenarioFile::load(&args.config)?;
    let comm = Communicator::new(args.comm.clone(), ());
    let scenario = file.build(Some(&comm))?;

    if args.json {
        let report = PlanReport {
            scenario: scenario.name(),
            outline: scenario.root().outline(),
            connections: scenario.connections(),
            provenance: scenario.provenance(),
        };
        println!("{}", mdo_topology::serde::to_json_string(&report)?);
        return Ok(());
    }

    print!("{}", scenario.root().render());
    for connection in scenario.connections() {
        println!("{} -> {}", connection.source, connection.target);
    }
    println!("topology {}", scenario.provenance().topology_hash);
    Ok(())
}
