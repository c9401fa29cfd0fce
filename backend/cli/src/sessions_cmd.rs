//! CLI Session Subcommands
//!
//! Direct access to persisted session memory, bypassing the pipeline.

use anyhow::Result;
use clap::Subcommand;

use mnemo_config::MnemoConfig;
use mnemo_memory::SessionStore;

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Print a session's persisted memory as JSON
    Show { session_id: String },
    /// Delete a session's persisted memory
    Clear { session_id: String },
}

pub async fn run(config: &MnemoConfig, cmd: SessionCommands) -> Result<()> {
    let store = SessionStore::new(&config.memory.dir)?;

    match cmd {
        SessionCommands::Show { session_id } => {
            let memory = store.load(&session_id).await;
            println!("{}", serde_json::to_string_pretty(&memory)?);
        }
        SessionCommands::Clear { session_id } => {
            store.delete(&session_id).await?;
            println!("Session {session_id} cleared");
        }
    }

    Ok(())
}
