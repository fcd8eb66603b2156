//! `reflect-inspect`: load a reflection database file and run one query

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use reflect_db::{Database, DatabaseConfig, MemoryImage, PrimitiveRef, Ref, TypeRef};
use reflect_model::{hash_name, Field, Function, Namespace, Operator};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("reflect-inspect")
        .version(reflect_db::VERSION)
        .about("Inspect a reflection database file")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("file")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Database file to load"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("TOML file with load settings"),
        )
        .subcommand(
            Command::new("stats").about("Record counts and sizes").arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue)
                    .help("Output as JSON"),
            ),
        )
        .subcommand(
            Command::new("name")
                .about("Resolve a name through the name table")
                .arg(Arg::new("text").required(true).help("Name text")),
        )
        .subcommand(
            Command::new("type")
                .about("Look up a type, enum, class or template instance")
                .arg(Arg::new("name").required(true).help("Type name")),
        )
        .subcommand(
            Command::new("function")
                .about("Look up a function")
                .arg(Arg::new("name").required(true).help("Function name")),
        )
        .subcommand(
            Command::new("namespace")
                .about("Look up a namespace")
                .arg(Arg::new("name").required(true).help("Namespace name")),
        )
        .subcommand(
            Command::new("hash")
                .about("Print the name hash of a text")
                .arg(Arg::new("text").required(true).help("Text to hash")),
        )
}

/// Whether the queried item was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Found,
    Absent,
}

fn load(matches: &ArgMatches) -> Result<Database> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => DatabaseConfig::from_toml_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => DatabaseConfig::default(),
    };

    let file = matches
        .get_one::<PathBuf>("file")
        .context("missing database file")?;
    tracing::debug!(file = %file.display(), reload = ?config.reload, "loading database");
    let mut db = Database::with_config(config);
    db.load_file(file, None)
        .with_context(|| format!("failed to load {}", file.display()))?;
    Ok(db)
}

fn arg<'m>(args: &'m ArgMatches, id: &str) -> &'m str {
    args.get_one::<String>(id).map_or("", String::as_str)
}

fn run(matches: &ArgMatches, out: &mut dyn Write) -> Result<Outcome> {
    let Some((command, args)) = matches.subcommand() else {
        anyhow::bail!("no subcommand given");
    };

    if command == "hash" {
        let hash = hash_name(arg(args, "text"));
        writeln!(out, "0x{hash:08x} {hash}")?;
        return Ok(Outcome::Found);
    }

    let db = load(matches)?;
    let image = db.image();
    match command {
        "stats" => {
            let stats = db.stats();
            if args.get_flag("json") {
                writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
            } else {
                writeln!(out, "{stats}")?;
            }
            Ok(Outcome::Found)
        }
        "name" => {
            let name = db.get_name_by_text(arg(args, "text"));
            if name.is_empty() {
                return Ok(Outcome::Absent);
            }
            writeln!(out, "0x{:08x} {}", name.hash, name.as_str())?;
            Ok(Outcome::Found)
        }
        "type" => match db.get_type(hash_name(arg(args, "name"))) {
            Some(ty) => {
                describe_type(image, ty, out)?;
                Ok(Outcome::Found)
            }
            None => Ok(Outcome::Absent),
        },
        "function" => match db.get_function(hash_name(arg(args, "name"))) {
            Some(function) => {
                describe_function(image, function, out)?;
                Ok(Outcome::Found)
            }
            None => Ok(Outcome::Absent),
        },
        "namespace" => match db.get_namespace(hash_name(arg(args, "name"))) {
            Some(namespace) => {
                describe_namespace(image, namespace, out)?;
                Ok(Outcome::Found)
            }
            None => Ok(Outcome::Absent),
        },
        other => anyhow::bail!("unknown subcommand {other}"),
    }
}

/// `outer::inner::name`, omitting the root namespace
fn qualified_name(record: PrimitiveRef<'_>) -> String {
    let mut parts = vec![record.name().as_str().to_string()];
    let mut parent = record.parent();
    while let Some(p) = parent {
        if p.to_namespace().is_some_and(|ns| ns.is_root()) {
            break;
        }
        parts.push(p.name().as_str().to_string());
        parent = p.parent();
    }
    parts.reverse();
    parts.join("::")
}

fn type_spelling(image: &MemoryImage, field: &Field) -> String {
    let base = field
        .ty
        .map_or_else(|| "?".to_string(), |ty| qualified_name(image.resolve(ty.into())));
    let constness = if field.qualifier.is_const { "const " } else { "" };
    let op = match field.qualifier.op {
        Operator::Value => "",
        Operator::Pointer => "*",
        Operator::Reference => "&",
    };
    format!("{constness}{base}{op}")
}

fn describe_type(image: &MemoryImage, ty: TypeRef<'_>, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{} {}", ty.kind(), qualified_name(image.resolve(ty.id().into())))?;
    writeln!(out, "  hash: 0x{:08x}", ty.name().hash)?;
    writeln!(out, "  size: {}", ty.size())?;

    if let Some(class) = ty.to_class() {
        for base in class.bases() {
            writeln!(out, "  base: {}", base.name())?;
        }
        let mut fields: Vec<_> = class.fields().iter().collect();
        fields.sort_by_key(|f| f.offset);
        for field in fields {
            writeln!(
                out,
                "  field +{}: {} {}",
                field.offset,
                type_spelling(image, field.record()),
                field.name()
            )?;
        }
        for method in class.methods().iter() {
            writeln!(out, "  method: {}", method.name())?;
        }
    }
    if let Some(e) = ty.to_enum() {
        let mut constants: Vec<_> = e.constants().iter().collect();
        constants.sort_by_key(|c| c.value);
        for constant in constants {
            writeln!(out, "  {} = {}", constant.name(), constant.value)?;
        }
    }
    if let Some(instance) = ty.to_template_type() {
        for (arg, is_ptr) in instance.arguments() {
            writeln!(out, "  argument: {}{}", arg.name(), if is_ptr { "*" } else { "" })?;
        }
    }
    Ok(())
}

fn describe_function(image: &MemoryImage, function: Ref<'_, Function>, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "function {}", qualified_name(image.resolve(function.id().into())))?;
    writeln!(out, "  hash:      0x{:08x}", function.name().hash)?;
    writeln!(out, "  address:   0x{:08x}", function.address)?;
    writeln!(out, "  unique id: {}", function.unique_id)?;
    if let Some(ret) = function.return_parameter() {
        writeln!(out, "  returns:   {}", type_spelling(image, ret.record()))?;
    }

    let mut parameters: Vec<_> = function.parameters().iter().collect();
    parameters.sort_by_key(|p| p.offset);
    for parameter in parameters {
        writeln!(
            out,
            "  param {}:   {} {}",
            parameter.offset,
            type_spelling(image, parameter.record()),
            parameter.name()
        )?;
    }
    Ok(())
}

fn describe_namespace(image: &MemoryImage, namespace: Ref<'_, Namespace>, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "namespace {}", qualified_name(image.resolve(namespace.id().into())))?;
    writeln!(out, "  namespaces: {}", namespace.namespaces().len())?;
    writeln!(out, "  types:      {}", namespace.types().len())?;
    writeln!(out, "  enums:      {}", namespace.enums().len())?;
    writeln!(out, "  classes:    {}", namespace.classes().len())?;
    writeln!(out, "  functions:  {}", namespace.functions().len())?;
    writeln!(out, "  templates:  {}", namespace.templates().len())?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let matches = cli().get_matches();
    let mut stdout = io::stdout().lock();

    match run(&matches, &mut stdout) {
        Ok(Outcome::Found) => ExitCode::SUCCESS,
        Ok(Outcome::Absent) => {
            eprintln!("not found");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}
