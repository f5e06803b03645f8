use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lookout", about = "Manage the Lookout watch list")]
struct Cli {
    /// Base URL of the lookoutd server
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a face from an image file
    Add {
        /// Image containing exactly one clearly visible face
        image: PathBuf,
        /// Display name for this face
        #[arg(short, long)]
        name: String,
    },
    /// List registered faces
    List,
    /// Remove a registered face
    Remove {
        /// Face id to remove
        id: i64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = reqwest::blocking::Client::new();

    match cli.command {
        Commands::Add { image, name } => {
            let form = reqwest::blocking::multipart::Form::new()
                .file("file", &image)
                .with_context(|| format!("could not read {}", image.display()))?
                .text("name", name);

            let response = client
                .post(format!("{}/add_face", cli.server))
                .multipart(form)
                .send()
                .context("could not reach lookoutd")?;

            let body: serde_json::Value = response.json()?;
            if let Some(error) = body.get("error").and_then(|e| e.as_str()) {
                bail!("registration failed: {error}");
            }
            println!(
                "registered {}",
                body["name"].as_str().unwrap_or_default()
            );
        }
        Commands::List => {
            let body: serde_json::Value = client
                .get(format!("{}/list_faces", cli.server))
                .send()
                .context("could not reach lookoutd")?
                .json()?;

            let faces = body["faces"].as_array().cloned().unwrap_or_default();
            if faces.is_empty() {
                println!("watch list is empty");
            }
            for face in faces {
                println!(
                    "#{} {}",
                    face["id"].as_i64().unwrap_or_default(),
                    face["name"].as_str().unwrap_or_default()
                );
            }
        }
        Commands::Remove { id } => {
            let body: serde_json::Value = client
                .post(format!("{}/delete_face/{id}", cli.server))
                .send()
                .context("could not reach lookoutd")?
                .json()?;

            if let Some(error) = body.get("error").and_then(|e| e.as_str()) {
                bail!("delete failed: {error}");
            }
            println!("{}", body["message"].as_str().unwrap_or("removed"));
        }
    }

    Ok(())
}
