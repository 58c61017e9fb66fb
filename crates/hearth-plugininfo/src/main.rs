//! CLI front end: metadata JSON in, constants module out.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use hearth_types::PluginMetadata;

#[derive(Debug, Parser)]
#[command(
    name = "hearth-plugininfo",
    about = "Generate typed id constants from hearth plugin metadata"
)]
struct Args {
    /// The plugin metadata JSON document.
    metadata: PathBuf,

    /// Where to write the generated module; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let text = std::fs::read_to_string(&args.metadata)
        .with_context(|| format!("reading {}", args.metadata.display()))?;
    let metadata = PluginMetadata::from_json_str(&text)
        .with_context(|| format!("parsing {}", args.metadata.display()))?;
    let generated = hearth_plugininfo::generate(&metadata);

    match args.output {
        Some(path) => {
            std::fs::write(&path, generated).with_context(|| format!("writing {}", path.display()))?;
        },
        None => print!("{generated}"),
    }
    Ok(())
}
