use tracing_subscriber::EnvFilter;
use wsdlgen::{Args, Error};

#[paw::main]
fn main(args: Args) -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    wsdlgen::run(&args)?;
    Ok(())
}
