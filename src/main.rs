//! Command-line interface for xsdgate

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use xsdgate::{
    validate_document, Document, NamespacePolicy, QName, SchemaModel, ValidationError, ValidationOptions,
};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xsdgate")]
#[command(author, version, about = "XML Schema validation of request bodies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile an XSD schema and print a summary
    Check {
        /// Path to the XSD schema file
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,
    },

    /// Validate XML documents against an XSD schema
    Validate {
        /// Path to the XSD schema file
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Expected document element, in Clark notation or as a local name
        #[arg(short, long, value_name = "QNAME")]
        root: Option<String>,

        /// Pass through names in namespaces the schema does not cover
        #[arg(long)]
        lax: bool,

        /// Print the findings as a JSON array
        #[arg(short, long)]
        json: bool,

        /// XML files to validate
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
}

#[cfg(feature = "cli")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { schema } => cmd_check(schema),
        Commands::Validate {
            schema,
            root,
            lax,
            json,
            files,
        } => cmd_validate(schema, root, lax, json, files),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

#[cfg(feature = "cli")]
fn cmd_check(schema_path: PathBuf) -> Result<bool, Box<dyn std::error::Error>> {
    let schema = SchemaModel::from_file(&schema_path)?;

    println!("Schema: {}", schema_path.display());
    println!(
        "Target namespace: {}",
        schema.target_namespace().unwrap_or("(none)")
    );
    println!("Global elements: {}", schema.global_elements().count());
    println!("Global types: {}", schema.global_types().count());
    println!("Global attributes: {}", schema.global_attributes().count());

    for (name, decl) in schema.global_elements() {
        println!(
            "  {} : {}",
            name,
            schema.type_definition(decl.type_id).display_name()
        );
    }
    Ok(true)
}

#[cfg(feature = "cli")]
fn cmd_validate(
    schema_path: PathBuf,
    root: Option<String>,
    lax: bool,
    json: bool,
    files: Vec<PathBuf>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let schema = SchemaModel::from_file(&schema_path)?;

    let root = match root {
        Some(text) => Some(
            QName::from_clark(&text).ok_or_else(|| format!("invalid root element name: {}", text))?,
        ),
        None => None,
    };
    let policy = if lax {
        NamespacePolicy::Lax
    } else {
        NamespacePolicy::Strict
    };
    let options = ValidationOptions::new().with_namespace_policy(policy);

    let mut all_valid = true;
    let mut report = Vec::new();

    for file in &files {
        let outcome = fs::read(file)
            .map_err(|e| e.to_string())
            .and_then(|bytes| Document::parse(&bytes).map_err(|e| e.to_string()))
            .map(|doc| validate_document(&doc, &schema, root.as_ref(), &options));

        match outcome {
            Ok(errors) if errors.is_empty() => {
                if !json {
                    println!("✓ {} is valid", file.display());
                }
                report.push(file_report(file, &errors, None));
            }
            Ok(errors) => {
                all_valid = false;
                if !json {
                    println!("✗ {} is invalid", file.display());
                    for error in &errors {
                        println!("  - {}", error);
                    }
                }
                report.push(file_report(file, &errors, None));
            }
            Err(reason) => {
                all_valid = false;
                if !json {
                    println!("✗ {} is not well-formed: {}", file.display(), reason);
                }
                report.push(file_report(file, &[], Some(reason)));
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(all_valid)
}

#[cfg(feature = "cli")]
fn file_report(file: &std::path::Path, errors: &[ValidationError], failure: Option<String>) -> serde_json::Value {
    serde_json::json!({
        "file": file.display().to_string(),
        "valid": errors.is_empty() && failure.is_none(),
        "failure": failure,
        "errors": errors,
    })
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
