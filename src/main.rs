//! Command-line interface for xmlfactory

#[cfg(feature = "cli")]
use clap::{ArgAction, Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use xmlfactory::documents::Element;
#[cfg(feature = "cli")]
use xmlfactory::handlers::CollectingErrorHandler;
#[cfg(feature = "cli")]
use xmlfactory::initializer;
#[cfg(feature = "cli")]
use xmlfactory::locations::Location;
#[cfg(feature = "cli")]
use xmlfactory::XML_SCHEMA_LANGUAGE;

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xmlfactory")]
#[command(author, version, about = "Parse and validate XML documents", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse an XML document and summarize it
    Parse {
        /// Path to the XML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Parser provider: quick-xml or roxmltree
        #[arg(short, long)]
        provider: Option<String>,

        /// Keep prefixed names verbatim instead of resolving namespaces
        #[arg(long)]
        no_namespaces: bool,

        /// Print the summary as JSON
        #[arg(short, long)]
        json: bool,

        /// Print the re-serialized document instead of a summary
        #[arg(long)]
        echo: bool,
    },

    /// Validate an XML document against an XSD schema
    Validate {
        /// Path to the XSD schema file
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Path to the XML file to validate
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Parser provider: quick-xml or roxmltree
        #[arg(short, long)]
        provider: Option<String>,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Parse {
            file,
            provider,
            no_namespaces,
            json,
            echo,
        } => cmd_parse(file, provider, !no_namespaces, json, echo),
        Commands::Validate {
            schema,
            file,
            provider,
        } => cmd_validate(schema, file, provider),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn cmd_parse(
    file: PathBuf,
    provider: Option<String>,
    namespace_aware: bool,
    json_output: bool,
    echo: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let builder = initializer::new_builder_factory(
        None,
        None,
        provider.as_deref(),
        namespace_aware,
        false,
    )?
    .new_document_builder()?;
    let doc = builder.parse_file(&file)?;

    if echo {
        println!("{}", doc.to_xml_string()?);
        return Ok(());
    }

    let root = doc.root();
    let (elements, depth) = count_elements(root, 1);
    if json_output {
        let summary = serde_json::json!({
            "file": file.to_string_lossy(),
            "provider": builder.provider_name(),
            "namespace_aware": doc.namespace_aware,
            "root": root.tag_name(),
            "namespace": root.namespace(),
            "elements": elements,
            "depth": depth,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("File:       {}", file.display());
        println!("Provider:   {}", builder.provider_name());
        println!("Root:       {}", root.tag_name());
        if let Some(ns) = root.namespace() {
            println!("Namespace:  {}", ns);
        }
        println!("Elements:   {}", elements);
        println!("Max depth:  {}", depth);
    }
    Ok(())
}

/// Number of elements in the subtree and its depth
#[cfg(feature = "cli")]
fn count_elements(element: &Element, depth: usize) -> (usize, usize) {
    element
        .child_elements()
        .map(|child| count_elements(child, depth + 1))
        .fold((1, depth), |(count, max), (c, d)| (count + c, max.max(d)))
}

#[cfg(feature = "cli")]
fn cmd_validate(
    schema_path: PathBuf,
    file: PathBuf,
    provider: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let builder = match provider {
        Some(name) => initializer::new_builder_factory(
            Some(Location::from(schema_path)),
            Some(XML_SCHEMA_LANGUAGE),
            Some(&name),
            true,
            true,
        )?
        .new_document_builder()?,
        None => initializer::new_document_builder_for_schema(schema_path)?,
    };

    let mut handler = CollectingErrorHandler::new();
    let result = builder.parse_file_with_handler(&file, &mut handler);
    let (warnings, errors) = handler.into_report();

    for warning in &warnings {
        println!("warning: {}", warning);
    }
    if let Err(e) = result {
        if errors.is_empty() {
            return Err(e.into());
        }
    }

    if errors.is_empty() {
        println!("{} is valid", file.display());
        Ok(())
    } else {
        println!("{} is invalid:", file.display());
        for error in &errors {
            println!("  - {}", error);
        }
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
