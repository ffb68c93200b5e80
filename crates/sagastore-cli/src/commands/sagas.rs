//! Saga lookup command

use clap::{Args, Subcommand};
use sagastore_core::{CorrelationValue, SagaStorage};
use sagastore_store::StoreConfig;

#[derive(Debug, Args)]
pub struct SagasArgs {
    #[command(subcommand)]
    pub command: SagasCommand,
}

#[derive(Debug, Subcommand)]
pub enum SagasCommand {
    /// Print the saga whose property equals a value, as JSON
    Find {
        /// Saga type identifier, unsanitized
        saga_type: String,
        /// Correlation property path inside the saga data
        property: String,
        /// Integer, true/false, null, or text
        value: String,
    },
}

pub fn execute(config: &StoreConfig, args: SagasArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        SagasCommand::Find {
            saga_type,
            property,
            value,
        } => {
            let value = parse_value(&value);
            let storage = config.saga_storage();
            match storage.find(&saga_type, &property, &value)? {
                Some(envelope) => {
                    println!("{}", serde_json::to_string_pretty(&envelope)?);
                    Ok(())
                }
                None => Err(format!("No {} saga where {} = {}", saga_type, property, value).into()),
            }
        }
    }
}

fn parse_value(raw: &str) -> CorrelationValue {
    if let Ok(i) = raw.parse::<i64>() {
        return CorrelationValue::Integer(i);
    }
    match raw {
        "true" => CorrelationValue::Bool(true),
        "false" => CorrelationValue::Bool(false),
        "null" => CorrelationValue::Null,
        _ => CorrelationValue::Text(raw.to_string()),
    }
}
