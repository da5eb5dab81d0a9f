//! xsdform CLI: Formular aus XSD erzeugen, als XML ausgeben, Dokumente roundtrippen.

use clap::{Args, Parser, Subcommand};
use std::io::{IsTerminal, Read, Write};
use std::path::Path;
use std::process;
use xsdform::xml_serializer::{form_to_pretty_xml, form_to_xml};
use xsdform::xsd::{parse_xsd, parse_xsd_file};
use xsdform::{FormOptions, FormSession, Schema};

#[derive(Parser)]
#[command(name = "xsdform", about = "XML-Schema driven forms: outline, template, roundtrip")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the generated form tree
    Outline(SchemaArgs),
    /// Write the empty form as XML skeleton
    Template(TemplateArgs),
    /// Populate the form from an XML document and serialize it again
    Roundtrip(RoundtripArgs),
}

#[derive(Args)]
struct SchemaArgs {
    /// Schema file (.xsd, - for stdin, URL with feature "remote")
    #[arg(short, long)]
    schema: String,

    /// Label language (xs:documentation/@xml:lang)
    #[arg(long)]
    lang: Option<String>,

    /// Type, group or attributeGroup name to skip (repeatable)
    #[arg(long = "ignore-type")]
    ignore_type: Vec<String>,

    /// Global element to use as form root (default: first declared)
    #[arg(long)]
    root: Option<String>,

    /// Namespace for the serialized root element (default: targetNamespace)
    #[arg(long)]
    namespace: Option<String>,

    /// Use the EAD3 preset (root `ead` in the EAD3 namespace)
    #[arg(long)]
    ead3: bool,

    /// Fail on unresolved schema references instead of skipping the branch
    #[arg(long)]
    strict: bool,

    /// Upper bound for mandatory instances created from one minOccurs
    #[arg(long = "max-instances", default_value_t = xsdform::options::DEFAULT_MAX_INSTANCES)]
    max_instances: u32,
}

impl SchemaArgs {
    fn to_options(&self) -> FormOptions {
        let mut opts = if self.ead3 { FormOptions::ead3() } else { FormOptions::default() };
        if let Some(lang) = &self.lang {
            opts.set_language(Some(lang.clone()));
        }
        if let Some(ns) = &self.namespace {
            opts.set_root_namespace(Some(ns.clone()));
        }
        opts.set_strict(self.strict);
        let opts = opts
            .with_ignored_types(self.ignore_type.clone())
            .with_max_instances(self.max_instances);
        match &self.root {
            Some(root) => opts.with_root_element(root.clone()),
            None => opts,
        }
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (- or omitted = stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Pretty-printed XML output (2-space indent)
    #[arg(long)]
    pretty: bool,

    /// POST the XML to this URL instead of writing it (feature "remote")
    #[arg(long, conflicts_with = "output")]
    post: Option<String>,
}

#[derive(Args)]
struct TemplateArgs {
    #[command(flatten)]
    schema: SchemaArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct RoundtripArgs {
    #[command(flatten)]
    schema: SchemaArgs,

    /// Input document (- for stdin, URL with feature "remote")
    #[arg(short, long)]
    input: String,

    #[command(flatten)]
    output: OutputArgs,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Fehler: {e}");
        process::exit(1);
    }
}

/// `RUST_LOG` gewinnt, sonst Level aus `-v`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Outline(args) => run_outline(args),
        Command::Template(args) => run_template(args),
        Command::Roundtrip(args) => run_roundtrip(args),
    }
}

fn run_outline(args: SchemaArgs) -> Result<(), String> {
    let schema = load_schema(&args.schema)?;
    let session = generate(&schema, &args)?;
    let mut out = session.tree().outline();
    for diag in session.diagnostics() {
        out.push_str(&format!("! {diag}\n"));
    }
    write_output(None, &out)
}

fn run_template(args: TemplateArgs) -> Result<(), String> {
    let schema = load_schema(&args.schema.schema)?;
    let session = generate(&schema, &args.schema)?;
    emit(&session, &args.output)
}

fn run_roundtrip(args: RoundtripArgs) -> Result<(), String> {
    let schema = load_schema(&args.schema.schema)?;
    let mut session = generate(&schema, &args.schema)?;
    let xml = read_text(&args.input)?;

    let report = session.populate(&xml).map_err(|e| e.to_string())?;
    for skipped in &report.skipped {
        eprintln!("übersprungen: {skipped}");
    }
    session.validate();
    emit(&session, &args.output)
}

fn generate<'s>(schema: &'s Schema, args: &SchemaArgs) -> Result<FormSession<'s>, String> {
    FormSession::generate(schema, args.to_options()).map_err(|e| e.to_string())
}

fn emit(session: &FormSession<'_>, output: &OutputArgs) -> Result<(), String> {
    let xml = if output.pretty { form_to_pretty_xml(session) } else { form_to_xml(session) }
        .map_err(|e| e.to_string())?;
    match &output.post {
        Some(url) => post(url, &xml),
        None => write_output(output.output.as_deref(), &xml),
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn load_schema(source: &str) -> Result<Schema, String> {
    if source == "-" || is_url(source) {
        let text = read_text(source)?;
        return parse_xsd(&text).map_err(|e| e.to_string());
    }
    parse_xsd_file(Path::new(source)).map_err(|e| e.to_string())
}

fn read_text(source: &str) -> Result<String, String> {
    if source == "-" {
        if std::io::stdin().is_terminal() {
            eprintln!("Lese von stdin (Ctrl+D zum Beenden)...");
        }
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("Lesefehler (stdin): {e}"))?;
        return Ok(buf);
    }
    if is_url(source) {
        return fetch(source);
    }
    std::fs::read_to_string(source).map_err(|e| format!("Lesefehler '{source}': {e}"))
}

#[cfg(feature = "remote")]
fn fetch(url: &str) -> Result<String, String> {
    xsdform::remote::fetch_text(url).map_err(|e| e.to_string())
}

#[cfg(not(feature = "remote"))]
fn fetch(url: &str) -> Result<String, String> {
    Err(format!("'{url}': ohne Feature \"remote\" gebaut"))
}

#[cfg(feature = "remote")]
fn post(url: &str, xml: &str) -> Result<(), String> {
    xsdform::remote::post_text(url, xml).map_err(|e| e.to_string())
}

#[cfg(not(feature = "remote"))]
fn post(url: &str, _xml: &str) -> Result<(), String> {
    Err(format!("--post '{url}': ohne Feature \"remote\" gebaut"))
}

fn write_output(path: Option<&str>, content: &str) -> Result<(), String> {
    match path {
        None | Some("-") => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .and_then(|_| stdout.flush())
                .map_err(|e| format!("Schreibfehler (stdout): {e}"))
        }
        Some(path) => {
            std::fs::write(path, content).map_err(|e| format!("Schreibfehler '{path}': {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("parse args")
    }

    #[test]
    fn schema_args_map_to_options() {
        let cli = parse_cli(&[
            "xsdform", "outline", "-s", "ead3.xsd",
            "--lang", "sv", "--ignore-type", "legacy", "--ignore-type", "old",
            "--root", "ead", "--strict", "--max-instances", "50",
        ]);
        let Command::Outline(args) = cli.command else {
            panic!("expected outline command");
        };
        let opts = args.to_options();
        assert_eq!(opts.language(), Some("sv"));
        assert_eq!(opts.ignored_types(), &["legacy".to_string(), "old".to_string()]);
        assert_eq!(opts.root_element(), Some("ead"));
        assert!(opts.strict());
        assert_eq!(opts.max_instances(), 50);
    }

    #[test]
    fn ead3_preset_with_override() {
        let cli = parse_cli(&["xsdform", "template", "-s", "x.xsd", "--ead3", "--namespace", "urn:other"]);
        let Command::Template(args) = cli.command else {
            panic!("expected template command");
        };
        let opts = args.schema.to_options();
        assert_eq!(opts.root_namespace(), Some("urn:other"));
    }

    #[test]
    fn roundtrip_requires_input() {
        assert!(Cli::try_parse_from(["xsdform", "roundtrip", "-s", "x.xsd"]).is_err());
    }

    #[test]
    fn post_conflicts_with_output() {
        let err = Cli::try_parse_from([
            "xsdform", "template", "-s", "x.xsd", "-o", "out.xml", "--post", "http://localhost/x",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn verbose_is_global() {
        let cli = parse_cli(&["xsdform", "outline", "-s", "x.xsd", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }
}
