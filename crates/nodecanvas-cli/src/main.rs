use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use nodecanvas_core::ScopeId;
use nodecanvas_graph::{
    CanvasSettings, ExportFormat, GraphCanvas, GraphModel, LayeredLayouter, MemoryGraph, Theme,
};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Svg,
    Png,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Svg => ExportFormat::Svg,
            Format::Png => ExportFormat::Png,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Canvas settings file. Defaults to the user's config directory
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a graph document to SVG or PNG
    Export(ExportArgs),
    /// Lay out a graph document and write the locations back
    Layout(LayoutArgs),
    /// Print the effective canvas settings as JSON
    Settings,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Graph document (JSON)
    #[arg(short, long)]
    graph: PathBuf,

    /// Output image
    #[arg(short, long)]
    out: PathBuf,

    /// Output format. Inferred from the output extension when omitted
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Device pixels per canvas pixel for PNG output
    #[arg(short, long, default_value_t = 1.0)]
    scale: f32,

    /// Lay out every node before rendering
    #[arg(long)]
    layout: bool,

    /// Move the content to the top-left corner before rendering
    #[arg(long)]
    crop: bool,
}

#[derive(Args, Debug)]
struct LayoutArgs {
    /// Graph document (JSON)
    #[arg(short, long)]
    graph: PathBuf,

    /// Where to write the result. Overwrites the input when omitted
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn load_settings(path: Option<&Path>) -> Result<CanvasSettings> {
    match path {
        Some(path) => CanvasSettings::load_from(path),
        None => Ok(CanvasSettings::load()),
    }
}

fn open_canvas(graph: &mut MemoryGraph, settings: CanvasSettings) -> GraphCanvas {
    let mut canvas = GraphCanvas::new(settings, Theme::default(), ScopeId::new())
        .with_layouter(Box::new(LayeredLayouter::default()));
    canvas.attach(graph);
    canvas
}

fn export(args: ExportArgs, settings: CanvasSettings) -> Result<()> {
    let format = match args.format {
        Some(format) => format.into(),
        None => ExportFormat::from_path(&args.out).with_context(|| {
            format!(
                "cannot infer output format from {}; pass --format",
                args.out.display()
            )
        })?,
    };

    let mut graph = MemoryGraph::load(&args.graph)?;
    let mut canvas = open_canvas(&mut graph, settings);
    if args.layout {
        canvas.auto_layout_all(&mut graph);
    }
    if args.crop {
        canvas.crop(&mut graph);
    }
    // Re-read the locations written by placement.
    canvas.process_notifications(&mut graph);

    canvas.export_to_file(&graph, &args.out, format, args.scale)?;
    println!(
        "Rendered {} nodes and {} edges to {}",
        canvas.views().len(),
        graph.edges().len(),
        args.out.display()
    );
    Ok(())
}

fn layout(args: LayoutArgs, settings: CanvasSettings) -> Result<()> {
    let mut graph = MemoryGraph::load(&args.graph)?;
    let mut canvas = open_canvas(&mut graph, settings);
    canvas.auto_layout_all(&mut graph);
    canvas.crop(&mut graph);

    let out = args.out.unwrap_or(args.graph);
    graph.save(&out)?;
    println!("Laid out {} nodes into {}", canvas.views().len(), out.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;
    tracing::debug!("Canvas settings: {:?}", settings);

    match cli.command {
        Command::Export(args) => export(args, settings),
        Command::Layout(args) => layout(args, settings),
        Command::Settings => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}
