use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "slicir")]
#[command(about = "Slicir - dependence graphs and security slicing over program facts")]
#[command(version = "0.1.0")]
#[command(author = "Gianluca Brigandi <gbrigand@gmail.com>")]
struct Cli {
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Check {
        facts: PathBuf,
    },

    Pdg {
        facts: PathBuf,

        #[arg(long)]
        dump: bool,

        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    Slice {
        facts: PathBuf,

        #[arg(short, long)]
        catalog: PathBuf,

        #[arg(long)]
        dump: bool,

        #[arg(long, default_value = ".")]
        out: PathBuf,

        #[arg(long, value_enum, default_value = "text")]
        format: ReportFormat,
    },

    Ipdg {
        facts: PathBuf,

        #[arg(short, long)]
        catalog: PathBuf,

        #[arg(long)]
        slice_iteration: Option<u32>,

        #[arg(long)]
        dump: bool,

        #[arg(long)]
        test: bool,

        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let verbose = cli.verbose > 0;

    match cli.command {
        Commands::Check { facts } => cmd_check(facts, verbose),
        Commands::Pdg { facts, dump, out } => cmd_pdg(facts, dump, out, verbose),
        Commands::Slice {
            facts,
            catalog,
            dump,
            out,
            format,
        } => cmd_slice(facts, catalog, dump, out, format, verbose),
        Commands::Ipdg {
            facts,
            catalog,
            slice_iteration,
            dump,
            test,
            out,
        } => cmd_ipdg(facts, catalog, slice_iteration, dump, test, out, verbose),
    }
}

fn init_tracing(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let fallback = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_check(facts: PathBuf, verbose: bool) -> Result<()> {
    use colored::*;

    if verbose {
        println!("{}", " Checking program facts".bright_cyan().bold());
        println!("{}", "=".repeat(50).bright_cyan());
        println!(" Input: {}", facts.display());
        println!();
    }

    match slicir_parser::load_path(&facts) {
        Ok(parsed) => {
            for proc in parsed.program.procs() {
                println!(
                    "  {}  {} statements, {} flow edges",
                    proc.sig,
                    proc.body.len(),
                    proc.cfg.edge_count()
                );
            }
            println!(
                "{} {} procedure(s), {} subgraph(s)",
                " VALID".bright_green().bold(),
                parsed.program.proc_count(),
                parsed.subgraphs.len()
            );
            Ok(())
        }
        Err(e) => {
            println!("{}", " INVALID".bright_red().bold());
            println!("\n{}", "Facts Error:".bright_red());
            println!("{}", e);
            Err(anyhow::anyhow!("Validation failed"))
        }
    }
}

fn cmd_pdg(facts: PathBuf, dump: bool, out: PathBuf, verbose: bool) -> Result<()> {
    use colored::*;
    use slicir_core::analysis::build_full_pdg;
    use slicir_core::catalog::ApiCatalog;
    use slicir_core::ir::ProcId;
    use slicir_emit::{dot_file_name, Emitter, PdgDotEmitter};
    use std::fs;
    use std::time::Instant;
    use tracing::warn;

    if verbose {
        println!("{}", " Building dependence graphs".bright_blue().bold());
        println!("{}", "=".repeat(50).bright_blue());
        println!(" Input: {}", facts.display());
        println!();
    }

    let start = Instant::now();
    let parsed = slicir_parser::load_path(&facts)?;
    let mut program = parsed.program;
    let catalog = ApiCatalog::default();

    if program.proc_count() == 0 {
        println!("{}", "  No procedures found in input".yellow());
        return Ok(());
    }

    let dump_dir = out.join("pdg");
    if dump {
        fs::create_dir_all(&dump_dir)?;
    }

    let procs: Vec<ProcId> = program.procs().map(|p| p.id).collect();
    let mut built = 0usize;
    for proc in procs {
        let pdg = match build_full_pdg(&mut program, proc) {
            Ok(pdg) => pdg,
            Err(e) => {
                warn!(procedure = %program.proc(proc).sig, error = %e, "skipping procedure");
                continue;
            }
        };
        println!(
            "  {}  {} nodes, {} edges",
            program.proc(proc).sig,
            pdg.node_count(),
            pdg.edge_count()
        );
        if dump {
            let text = PdgDotEmitter::new(&program, &catalog).emit_to_string(&pdg)?;
            fs::write(dump_dir.join(dot_file_name(&program.proc(proc).sig)), text)?;
        }
        built += 1;
    }

    println!(
        "\n {} Built {} graph(s) in {:.3}s",
        "SUCCESS:".bright_green().bold(),
        built,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn cmd_slice(
    facts: PathBuf,
    catalog: PathBuf,
    dump: bool,
    out: PathBuf,
    format: ReportFormat,
    verbose: bool,
) -> Result<()> {
    use colored::*;
    use slicir_core::analysis::{build_full_pdg, slice_pdg};
    use slicir_core::catalog::ApiCatalog;
    use slicir_core::ir::ProcId;
    use slicir_emit::{
        dot_file_name, EmitContext, Emitter, PdgDotEmitter, ReportEmitter, SliceEntry, SliceReport,
    };
    use std::fs;
    use tracing::warn;

    if verbose && matches!(format, ReportFormat::Text) {
        println!("{}", " Slicing sensitive statements".bright_blue().bold());
        println!("{}", "=".repeat(50).bright_blue());
        println!(" Input: {}", facts.display());
        println!(" Catalog: {}", catalog.display());
        println!();
    }

    let parsed = slicir_parser::load_path(&facts)?;
    let mut program = parsed.program;
    let api = ApiCatalog::load(&catalog)?;

    let dump_dir = out.join("slice");
    if dump {
        fs::create_dir_all(&dump_dir)?;
    }

    let mut report = SliceReport::new();
    let procs: Vec<ProcId> = program.procs().map(|p| p.id).collect();
    for proc in procs {
        let pdg = match build_full_pdg(&mut program, proc) {
            Ok(pdg) => pdg,
            Err(e) => {
                warn!(procedure = %program.proc(proc).sig, error = %e, "skipping procedure");
                continue;
            }
        };
        let slice = slice_pdg(&program, &pdg, &api);
        let procedure = program.proc(proc);
        let anchors = procedure
            .body
            .iter()
            .filter(|&&s| api.match_stmt(program.stmt(s)).is_some())
            .count();
        if dump && slice.node_count() > 0 {
            let text = PdgDotEmitter::new(&program, &api).emit_to_string(&slice)?;
            fs::write(dump_dir.join(dot_file_name(&procedure.sig)), text)?;
        }
        report.push(SliceEntry {
            name: procedure.sig.to_string(),
            anchors,
            nodes: slice.node_count(),
            edges: slice.edge_count(),
        });
    }

    match format {
        ReportFormat::Json => println!("{}", report.to_json()?),
        ReportFormat::Text => {
            let mut context = EmitContext::new();
            ReportEmitter.emit(&report, &mut std::io::stdout(), &mut context)?;
        }
    }
    Ok(())
}

fn cmd_ipdg(
    facts: PathBuf,
    catalog: PathBuf,
    slice_iteration: Option<u32>,
    dump: bool,
    test: bool,
    out: PathBuf,
    verbose: bool,
) -> Result<()> {
    use colored::*;
    use slicir_core::analysis::{SlicedIpdg, UNBOUNDED_DEPTH};
    use slicir_core::catalog::ApiCatalog;
    use slicir_emit::{slice_dot_file_name, Emitter, IpdgDotEmitter};
    use std::fs;
    use std::time::Instant;
    use tracing::info;

    if verbose {
        println!(
            "{}",
            " Building sliced interprocedural graphs".bright_blue().bold()
        );
        println!("{}", "=".repeat(50).bright_blue());
        println!(" Input: {}", facts.display());
        println!(" Catalog: {}", catalog.display());
        match slice_iteration {
            Some(n) => println!(" Slice iterations: {}", n),
            None => println!(" Slice iterations: unbounded"),
        }
        println!();
    }

    let start = Instant::now();
    let parsed = slicir_parser::load_path(&facts)?;
    let program = parsed.program;
    let api = ApiCatalog::load(&catalog)?;
    let depth = slice_iteration.unwrap_or(UNBOUNDED_DEPTH);

    if program.proc_count() == 0 {
        println!("{}", "  No procedures found in input".yellow());
        return Ok(());
    }

    let dump_dir = out.join(if test { "ipdg-test" } else { "ipdg" });
    if dump {
        fs::create_dir_all(&dump_dir)?;
    }

    let stem = facts
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("facts")
        .to_string();

    let mut emitted = 0usize;
    for (idx, subgraph) in parsed.subgraphs.iter().enumerate() {
        let ipdg = SlicedIpdg::build(&program, subgraph, &api, depth);
        if ipdg.node_count() == 0 {
            println!(
                "  {}  no sensitive call site, skipped",
                subgraph.name().dimmed()
            );
            continue;
        }
        println!(
            "  {}  {} nodes, {} edges",
            subgraph.name(),
            ipdg.node_count(),
            ipdg.edge_count()
        );
        if dump {
            let file = dump_dir.join(slice_dot_file_name(&stem, idx));
            info!(path = %file.display(), "dumping program slice");
            let text = IpdgDotEmitter::new(&api).emit_to_string(&ipdg)?;
            fs::write(&file, text)?;
        }
        emitted += 1;
    }

    println!(
        "\n {} Sliced {} of {} subgraph(s) in {:.3}s",
        "SUCCESS:".bright_green().bold(),
        emitted,
        parsed.subgraphs.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
