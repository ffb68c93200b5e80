//! Partition catalog listing

use clap::Args;
use sagastore_store::{list_partitions, StoreConfig};

#[derive(Debug, Args)]
pub struct PartitionsArgs {
    /// Print the catalog as a JSON array
    #[arg(long)]
    pub json: bool,
}

pub fn execute(
    config: &StoreConfig,
    args: PartitionsArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = config
        .connection_source()
        .with_connection(|conn| list_partitions(conn))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    for info in catalog {
        println!(
            "{}\t{}\t{}\t{}",
            info.kind.as_str(),
            info.name,
            info.source_name,
            info.documents
        );
    }
    Ok(())
}
