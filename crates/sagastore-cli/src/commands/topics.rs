//! Topic subscription commands

use clap::{Args, Subcommand};
use sagastore_core::SubscriptionStorage;
use sagastore_store::StoreConfig;

#[derive(Debug, Args)]
pub struct TopicsArgs {
    #[command(subcommand)]
    pub command: TopicsCommand,
}

#[derive(Debug, Subcommand)]
pub enum TopicsCommand {
    /// Print every subscriber address of a topic, one per line
    List { topic: String },
    /// Add a subscriber address to a topic
    Register { topic: String, address: String },
    /// Remove every entry of an address from a topic
    Unregister { topic: String, address: String },
}

pub fn execute(config: &StoreConfig, args: TopicsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let storage = config.subscription_storage();

    match args.command {
        TopicsCommand::List { topic } => {
            for address in storage.get_subscriber_addresses(&topic)? {
                println!("{}", address);
            }
        }
        TopicsCommand::Register { topic, address } => {
            storage.register_subscriber(&topic, &address)?;
            println!("Registered {} for {}", address, topic);
        }
        TopicsCommand::Unregister { topic, address } => {
            storage.unregister_subscriber(&topic, &address)?;
            println!("Unregistered {} from {}", address, topic);
        }
    }

    Ok(())
}
