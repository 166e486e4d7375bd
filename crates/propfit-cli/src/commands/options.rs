use crate::cli::OptionsArgs;
use crate::error::Result;
use propfit::options::OptionsFile;
use tracing::info;

pub fn run(args: OptionsArgs) -> Result<()> {
    let options = OptionsFile::for_training_run(args.port);
    info!(
        "Writing estimation options for port {} to {:?}",
        args.port, &args.output_file
    );

    options.write_to_path(&args.output_file)?;
    println!(
        "Estimation options written to {}",
        args.output_file.display()
    );
    Ok(())
}
