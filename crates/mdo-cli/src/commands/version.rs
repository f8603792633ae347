use std::collections::BTreeMap;
use std::error::Error;

use clap::Args;
use mdo_core::SchemaVersion;
use mdo_topology::to_canonical_json_bytes;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Emit crate and schema versions as JSON.
    #[arg(long)]
    pub long: bool,
}

#[derive(Debug, Serialize)]
struct VersionInfo {
    version: String,
    schema: SchemaVersion,
    crates: BTreeMap<String, String>,
}

pub fn run(args: &VersionArgs) -> Result<(), Box<dyn Error>> {
    if !args.long {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let info = VersionInfo {
        version: env!("CARGO_PKG_VERSION").into(),
        schema: SchemaVersion::default(),
        crates: BTreeMap::from([(env!("CARGO_PKG_NAME").to_string(), env!("CARGO_PKG_VERSION").to_string())]),
    };
    let json = to_canonical_json_bytes(&info)?;
    println!("{}", String::from_utf8(json)?);
    Ok(())
}
