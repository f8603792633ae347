use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use mdo_core::{DisciplineKey, ErrorInfo, MdoError};
use mdo_topology::{ScenarioFile, ScenarioKind};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Scenario file (YAML or JSON).
    #[arg(long)]
    pub config: PathBuf,
}

fn join(keys: &[DisciplineKey]) -> String {
    keys.iter()
        .map(DisciplineKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn run(args: &ValidateArgs) -> Result<(), Box<dyn Error>> {
    let file = ScenarioFile::load(&args.config)?;
    let layout = file.spec.validate()?;
    let registry = file.registry();

    let missing: Vec<_> = layout
        .kind
        .disciplines()
        .iter()
        .copied()
        .filter(|key| !registry.has_builder(*key))
        .collect();
    if !missing.is_empty() {
        return Err(Box::new(MdoError::Builder(
            ErrorInfo::new("missing-builder", "scenario file lacks builders for active disciplines")
                .with_context("discipline", join(&missing)),
        )));
    }
    if layout.geometry && layout.in_multipoint_parallel && file.geometry_builder.is_none() {
        tracing::warn!(scenario = %file.name, "geometry enabled without a geometry builder");
    }

    println!("scenario {} ({:?})", file.name, layout.kind);
    println!("pre-coupling order: {}", join(&layout.pre_coupling_order));
    println!("post-coupling order: {}", join(&layout.post_coupling_order));
    println!("coupling group: {}", layout.coupling_group_path());
    if let Some(key) = layout.schur_aware_discipline() {
        println!("schur-aware post-coupling: {key}");
    }
    if layout.kind == ScenarioKind::AeroPropulsive {
        let balance = if registry.has_balance_builder() { "yes" } else { "no" };
        println!("balance builder: {balance}");
    }
    Ok(())
}
