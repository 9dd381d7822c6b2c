//! User subcommands

use clap::Subcommand;
use serde_json::json;
use tracing::info;

use super::print_json;
use crate::domain::User;
use crate::Repositories;

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a new user and print its id
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Print a user without its password
    Get {
        /// User id, or the email with --by-email
        key: String,
        #[arg(long)]
        by_email: bool,
    },

    /// Change the username of a user
    Rename {
        id: String,
        #[arg(long)]
        username: String,
    },

    /// Delete a user
    Delete { id: String },
}

pub async fn run(repositories: &Repositories, command: UserCommand) -> anyhow::Result<()> {
    let users = &repositories.users;

    match command {
        UserCommand::Register {
            username,
            email,
            password,
        } => {
            let id = users
                .register(Some(User::new(username, email, password)))
                .await?;
            print_json(&json!({ "id": id }))
        }
        UserCommand::Get { key, by_email } => {
            let user = if by_email {
                users.get_by_email(&key, true).await?
            } else {
                users.get(&key, true).await?
            };
            print_json(&user)
        }
        UserCommand::Rename { id, username } => {
            let user = users.get(&id, false).await?.with_username(username);
            users.update(&id, Some(user)).await?;
            print_json(&users.get(&id, true).await?)
        }
        UserCommand::Delete { id } => {
            users.delete(&id).await?;
            info!(user_id = %id, "User deleted");
            print_json(&json!({ "deleted": id }))
        }
    }
}
