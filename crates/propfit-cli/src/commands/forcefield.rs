use crate::cli::ForcefieldArgs;
use crate::error::Result;
use propfit::forcefield::document::ForceFieldDocument;
use propfit::forcefield::edit;
use tracing::info;

pub fn run(args: ForcefieldArgs) -> Result<()> {
    info!("Loading forcefield from {:?}", &args.input_forcefield);
    let mut forcefield = ForceFieldDocument::read_from_path(&args.input_forcefield)?;

    info!("Loading water model from {:?}", &args.water_forcefield);
    let water = ForceFieldDocument::read_from_path(&args.water_forcefield)?;

    let summary = edit::prepare(&mut forcefield, &water)?;
    for (id, pattern) in &summary.removed {
        info!("Removed {} with pattern {}", id, pattern);
    }
    info!(
        "Merged {} water-model parameters; marked {} patterns as optimizable.",
        summary.merged_parameters, summary.annotated
    );

    forcefield.write_to_path(&args.output_forcefield)?;
    println!("Forcefield written to {}", args.output_forcefield.display());
    Ok(())
}
