use anyhow::{Context, Result};
use docmark_config::Config;
use docmark_engine::parsing::snapshot;
use docmark_engine::{Pipeline, parse_file};
use std::path::PathBuf;
use std::{env, fs, process};

mod resolver;

use resolver::{FsIncludeResolver, document_location};

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} [--raw] <markdown-file>");
    eprintln!("  --raw  print the parsed tree without running the rewriters");
    process::exit(1);
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("docmark");

    let mut raw = false;
    let mut document = None;
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--raw" => raw = true,
            flag if flag.starts_with("--") => usage(program),
            path if document.is_none() => document = Some(PathBuf::from(path)),
            _ => usage(program),
        }
    }
    let Some(document) = document else {
        usage(program);
    };

    let config_path = Config::config_path();
    let config = match Config::load() {
        Ok(Some(config)) => {
            log::info!("Loaded config from {}", config_path.display());
            config
        }
        Ok(None) => Config::default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let text = fs::read_to_string(&document)
        .with_context(|| format!("reading {}", document.display()))?;
    let (root, name) = document_location(&document, &config.include_root);
    log::debug!("include root {}, document {name}", root.display());

    let parsed = parse_file(&text, Some(name.as_str()), &config.parser)?;
    let tree = if raw {
        parsed.root
    } else {
        Pipeline::for_document(&parsed)
            .with_include_resolver(FsIncludeResolver::new(root))
            .with_xref_resolver(config.xref_resolver())
            .with_tab_conditions(config.tab_conditions())
            .run(&parsed.root)?
    };

    print!("{}", snapshot::dump(&tree));
    Ok(())
}
