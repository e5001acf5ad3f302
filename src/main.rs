use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};

use docx_stylemap::pipeline::config::find_default_style_map;
use docx_stylemap::pipeline::{init_default_config, ConvertConfig, ConvertPipeline};
use docx_stylemap::progress::ConsoleProgress;

#[derive(Parser, Debug)]
#[command(name = "docx-stylemap")]
#[command(about = "Convert a styled DOCX into tagged XML using a style-to-tag map", long_about = None)]
struct Args {
    /// Write a default style_map.toml, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write the style map to (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite an existing style map when used with --init-config
    #[arg(long)]
    force: bool,

    /// Input .docx
    #[arg(value_name = "DOCX")]
    input: Option<PathBuf>,

    /// Output .xml (default: <input_stem>.xml next to the input)
    #[arg(short, long, value_name = "XML")]
    output: Option<PathBuf>,

    /// Style map (.toml, or legacy .ini); default: search style_map.toml / style_map.ini upwards
    #[arg(long, value_name = "FILE")]
    style_map: Option<PathBuf>,

    /// Write run diagnostics (unmapped styles, warnings, counts) as JSON
    #[arg(long, value_name = "JSON")]
    report: Option<PathBuf>,

    /// Skip reference grouping and author-bio relocation
    #[arg(long)]
    no_restructure: bool,

    /// Print one trace line per paragraph
    #[arg(short, long)]
    verbose: bool,

    /// Only print warnings
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let progress = ConsoleProgress::new(!args.quiet).verbose(args.verbose);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote style map: {}", cfg_path.display());
        return Ok(());
    }

    let input = match args.input {
        Some(p) => p,
        None => {
            let mut cmd = Args::command();
            cmd.print_help().context("print help")?;
            eprintln!(
                "\n\nUSAGE:\n  docx-stylemap <input.docx> [-o output.xml] [--style-map style_map.toml]\n"
            );
            return Ok(());
        }
    };
    let output = args
        .output
        .unwrap_or_else(|| input.with_extension("xml"));

    let input_dir = input
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let style_map = match args.style_map {
        Some(p) => p,
        None => find_default_style_map(&input_dir).context(
            "no style map found (pass --style-map or create one with --init-config)",
        )?,
    };
    progress.info(format!("Style map: {}", style_map.display()));

    let mut cfg = ConvertConfig::load(&style_map)?;
    if args.no_restructure {
        cfg.restructure.enabled = false;
    }

    let pipeline = ConvertPipeline::new(cfg, progress);
    let diagnostics = pipeline.convert_docx(&input, &output)?;
    if let Some(report) = args.report {
        diagnostics.write_json(&report)?;
    }
    Ok(())
}
