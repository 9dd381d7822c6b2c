//! Device subcommands

use clap::Subcommand;
use serde_json::json;

use super::print_json;
use crate::domain::Device;
use crate::Repositories;

#[derive(Subcommand)]
pub enum DeviceCommand {
    /// Register a device for a user and print its auth token
    Register {
        user_id: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        user_agent: String,
        /// Token to assign; one is generated when omitted
        #[arg(long)]
        token: Option<String>,
    },

    /// List the devices of a user
    List { user_id: String },

    /// Find the device of a user holding a token
    Auth { user_id: String, token: String },
}

pub async fn run(repositories: &Repositories, command: DeviceCommand) -> anyhow::Result<()> {
    let devices = &repositories.devices;

    match command {
        DeviceCommand::Register {
            user_id,
            address,
            user_agent,
            token,
        } => {
            let mut device = Device::new(address, user_agent);
            device.token = token;
            let token = devices.register(&user_id, Some(device)).await?;
            print_json(&json!({ "token": token }))
        }
        DeviceCommand::List { user_id } => print_json(&devices.get_all(&user_id).await?),
        DeviceCommand::Auth { user_id, token } => {
            print_json(&devices.get_by_auth(&user_id, &token).await?)
        }
    }
}
