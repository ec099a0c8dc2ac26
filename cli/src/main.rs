mod data;
mod test_runner;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use renderer::{BufferChain, DEFAULT_MAX_DEPTH, RenderError, Renderer};
use tmpl::parser::ParseError;

const SUBCOMMANDS: &[&str] = &["render", "check", "test", "help"];

#[derive(Parser)]
#[command(name = "tmpl", version, about = "TMPL template renderer")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a template to stdout or a file
    Render(RenderArgs),

    /// Parse a template and report problems without rendering
    Check(CheckArgs),

    /// Run .test.tmpl fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Template file to render
    template: PathBuf,

    /// TOML data file with bindings. Repeatable; later files win.
    #[arg(short, long)]
    data: Vec<PathBuf>,

    /// Set a scalar binding. Repeatable; applied after data files.
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,

    /// Render this file first and bind its output for the template
    #[arg(long)]
    content: Option<PathBuf>,

    /// Variable that receives the rendered --content output
    #[arg(long, default_value = "CONTENT")]
    content_var: String,

    /// Directory includes resolve against (default: the template's directory)
    #[arg(short = 'I', long)]
    include_dir: Option<PathBuf>,

    /// Maximum block and include nesting
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Write output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Template file to check
    template: PathBuf,

    /// Dump the matched tag list
    #[arg(long)]
    tags: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.tmpl file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // Backwards compatibility: if the first positional arg is not a known
    // subcommand, inject "render" so `tmpl page.tmpl` works like `tmpl render page.tmpl`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args
        .iter()
        .skip(1)
        .position(|a| !a.starts_with('-'))
        .map(|p| p + 1)
    {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "render".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose, cli.no_color);

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match cli.command {
        Command::Render(render_args) => do_render(render_args, color_choice),
        Command::Check(check_args) => do_check(check_args, color_choice),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn init_logging(verbose: u8, no_color: bool) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .init();
}

fn do_render(args: RenderArgs, color_choice: ColorChoice) {
    let mut bindings = match data::load(&args.data, &args.vars) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let renderer_for = |file: &Path| {
        let base_dir = args
            .include_dir
            .clone()
            .or_else(|| file.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Renderer::new()
            .with_base_dir(base_dir)
            .with_max_depth(args.max_depth)
    };

    if let Some(content) = &args.content {
        match renderer_for(content).render_file(content, &bindings) {
            Ok(out) => {
                tracing::debug!(var = %args.content_var, bytes = out.len(), "bound rendered content");
                bindings.set_owned(args.content_var.clone(), out.flatten_bytes());
            }
            Err(error) => {
                report_render_error(&error, color_choice);
                process::exit(1);
            }
        }
    }

    let output = match renderer_for(&args.template).render_file(&args.template, &bindings) {
        Ok(out) => out,
        Err(error) => {
            report_render_error(&error, color_choice);
            process::exit(1);
        }
    };

    if let Err(e) = write_output(&output, args.output.as_deref()) {
        let target = args
            .output
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".to_string());
        eprintln!("error: cannot write to {}: {}", target, e);
        process::exit(1);
    }
}

fn write_output(output: &BufferChain, path: Option<&Path>) -> std::io::Result<()> {
    match path {
        Some(path) => {
            let mut file = BufWriter::new(File::create(path)?);
            output.write_to(&mut file)?;
            file.flush()
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            output.write_to(&mut stdout)?;
            stdout.flush()
        }
    }
}

fn do_check(args: CheckArgs, color_choice: ColorChoice) {
    let source = match std::fs::read(&args.template) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.template.display(), e);
            process::exit(1);
        }
    };

    let template = match tmpl::parser::Parser::new(&source).parse() {
        Ok(t) => t,
        Err(errors) => {
            emit_parse_errors(&args.template, &source, &errors, color_choice);
            process::exit(1);
        }
    };

    if args.tags {
        let mut depth = 0usize;
        for (index, tag) in template.tags.iter().enumerate() {
            if tag.close && tag.kind.is_block() {
                depth = depth.saturating_sub(1);
            }
            let pad = if tag.kind == tmpl::tag::TagKind::Else {
                "  ".repeat(depth.saturating_sub(1))
            } else {
                "  ".repeat(depth)
            };
            let mut links = String::new();
            if let Some(else_tag) = tag.else_tag {
                links.push_str(&format!(" else=#{}", else_tag));
            }
            if let Some(closing) = tag.closing_tag {
                links.push_str(&format!(" close=#{}", closing));
            }
            println!("#{:<3} {}{} @{}..{}{}", index, pad, tag, tag.start(), tag.end(), links);
            if !tag.close && tag.kind.is_block() {
                depth += 1;
            }
        }
    }

    eprintln!(
        "ok: {} parsed successfully ({} tags)",
        args.template.display(),
        template.tags.len()
    );
}

fn emit_parse_errors(path: &Path, source: &[u8], errors: &[ParseError], color_choice: ColorChoice) {
    let mut files = SimpleFiles::new();
    let file_id = files.add(
        path.display().to_string(),
        String::from_utf8_lossy(source).into_owned(),
    );
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    for error in errors {
        let diagnostic = error.to_diagnostic(file_id);
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
    }
}

/// Render errors point into whichever file they came from, which may be an
/// include rather than the top-level template.
fn report_render_error(error: &RenderError, color_choice: ColorChoice) {
    let located = error
        .path()
        .filter(|_| !matches!(error, RenderError::Io { .. }))
        .and_then(|path| std::fs::read(path).ok().map(|source| (path, source)));

    let Some((path, source)) = located else {
        eprintln!("error: {}", error);
        return;
    };

    if let RenderError::Parse { errors, .. } = error {
        emit_parse_errors(path, &source, errors, color_choice);
        return;
    }

    let Some(span) = error.span().filter(|s| s.end <= source.len()) else {
        eprintln!("error: {}: {}", path.display(), error);
        return;
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(
        path.display().to_string(),
        String::from_utf8_lossy(&source).into_owned(),
    );
    let diagnostic = Diagnostic::error()
        .with_message(error.to_string())
        .with_labels(vec![Label::primary(file_id, span)]);
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
}
