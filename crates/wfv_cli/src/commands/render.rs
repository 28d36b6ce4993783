//! Render command - Render a view file with its display form.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use wfv_forms::{
    FormsConfig, MissingPolicy, RenderPipeline, RenderResult, RenderStatus, TemplateRenderer,
};

use super::{open_library, update_forms};
use crate::ExitCodes;

#[derive(Args)]
pub struct RenderArgs {
    /// Winlink Express view file (XML)
    view_file: PathBuf,

    /// Write the rendered form to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the full render result as JSON
    #[arg(long)]
    json: bool,

    /// Keep `{var name}` tokens that have no value in the view
    #[arg(long)]
    leave_missing: bool,

    /// Install forms without asking when none are installed yet
    #[arg(short, long)]
    yes: bool,
}

pub fn execute(args: RenderArgs, config: &FormsConfig) -> Result<u8> {
    let bytes = fs::read(&args.view_file)
        .with_context(|| format!("Failed to read view file {:?}", args.view_file))?;
    let raw = String::from_utf8_lossy(&bytes);

    let mut library = open_library(config)?;
    if library.needs_initial_download() {
        warn!("No forms installed in {:?}", library.root());
        match update_forms::update(&mut library, args.yes) {
            Ok(outcome) => update_forms::report(&outcome),
            Err(e) => warn!("{:#}", e),
        }
    }

    let policy = if args.leave_missing {
        MissingPolicy::LeaveToken
    } else {
        MissingPolicy::default()
    };
    let pipeline = RenderPipeline::new(&library, config)
        .with_renderer(TemplateRenderer::new().with_missing_policy(policy));
    let result = pipeline.render(&raw);

    info!(
        "{:?} {} {:?} {}",
        args.view_file,
        result.display_form.as_deref().unwrap_or("-"),
        result.status,
        result.body.len()
    );

    write_result(&args, &result)?;
    Ok(exit_code(result.status))
}

fn write_result(args: &RenderArgs, result: &RenderResult) -> Result<()> {
    let content = if args.json {
        serde_json::to_string_pretty(result)?
    } else if result.is_success() {
        result.body.clone()
    } else {
        eprintln!("❌ {}", result.body);
        return Ok(());
    };

    match &args.output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
            println!("✅ Wrote {:?}", path);
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn exit_code(status: RenderStatus) -> u8 {
    match status {
        RenderStatus::Success => ExitCodes::SUCCESS,
        RenderStatus::ClientInputError => ExitCodes::CLIENT_INPUT_ERROR,
        RenderStatus::ServerError => ExitCodes::SERVER_ERROR,
    }
}
