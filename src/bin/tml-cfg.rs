//! Command-line front end for the TML toolkit.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tml_cfg::include::{load_and_include, IncludeOptions, TmlFileLoader};
use tml_cfg::template::{add_templates, use_templates, TemplateMap};
use tml_cfg::translation::{
    apply_translations, apply_variables, collect_translations, collect_variables, LanguageMap,
};
use tml_cfg::{btml, expr, json, parse_file, parse_file_with_options, ParseOptions, Value};

#[derive(Parser)]
#[command(
    name = "tml-cfg",
    version,
    about = "Parse, convert and transform TML configuration files"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the parsed tree of a TML file
    Print { file: PathBuf },
    /// Print the parsed tree without empty lines and comments
    PrintValues { file: PathBuf },
    /// Print a TML file in TML format
    PrintTml { file: PathBuf },
    /// Print a TML file in TML format without empty lines and comments
    PrintTmlValues { file: PathBuf },
    /// Load and print the templates of a TML file, then the expanded tree
    Templates { file: PathBuf },
    /// Load and print the translations of a TML file
    Translations {
        file: PathBuf,
        /// Apply this language and print the substituted tree
        #[arg(long)]
        language: Option<String>,
    },
    /// Load and print the variables of a TML file
    Variables { file: PathBuf },
    /// Load a TML file and expand all includes
    Include {
        file: PathBuf,
        /// Expand each file only once
        #[arg(long)]
        once: bool,
        /// Buffer parsed files per absolute name
        #[arg(long)]
        buffered: bool,
    },
    /// Convert a TML file to a BTML file
    Tml2btml {
        mode: ConvertMode,
        input: PathBuf,
        output: PathBuf,
    },
    /// Convert a BTML file to a TML file
    Btml2tml { input: PathBuf, output: PathBuf },
    /// Evaluate the embedded expressions of a TML file
    Interpret { file: PathBuf },
    /// Run the whole pipeline: includes, templates, translations,
    /// profiles, variables, expressions
    AllFeatures {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    /// Print a TML file as JSON
    Json { file: PathBuf },
}

/// Feature selection for tml2btml.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum ConvertMode {
    /// Keep everything, no string table
    All,
    /// Keep everything, use the string table
    Shrink,
    /// Drop empty lines and comments
    Strip,
    /// Drop empty lines and comments, use the string table
    StripShrink,
    /// Run all transform passes, then strip and shrink
    Afss,
}

fn print_value(value: &Value) -> Result<()> {
    print!("{}", tml_cfg::to_string(value)?);
    Ok(())
}

fn run_pipeline(input: &Path) -> Result<Value> {
    let filename = input.display().to_string();
    let mut loader = TmlFileLoader::new();
    let (mut value, _included) =
        load_and_include(&filename, &mut loader, &IncludeOptions::new())
            .with_context(|| format!("include expansion of {} failed", filename))?;

    let mut templates = TemplateMap::new();
    add_templates(&mut templates, &mut value, true, "template")?;
    use_templates(&templates, &mut value, "use-template")?;

    apply_translations(&mut value, "translations", "tr(", "")?;
    apply_translations(&mut value, "profiles", "pr(", "")?;
    apply_variables(&mut value, "variables", "$(")?;

    expr::interpret_and_replace(&mut value, false, true, true)?;
    Ok(value)
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Print { file } => {
            let value = parse_file(&file)?;
            print!("{}", tml_cfg::dump::value_to_string(0, &value, ""));
        }
        Command::PrintValues { file } => {
            let value = parse_file_with_options(&file, &ParseOptions::values_only())?;
            print!("{}", tml_cfg::dump::value_to_string(0, &value, ""));
        }
        Command::PrintTml { file } => {
            let value = parse_file(&file)?;
            print_value(&value)?;
        }
        Command::PrintTmlValues { file } => {
            let value = parse_file_with_options(&file, &ParseOptions::values_only())?;
            print_value(&value)?;
        }
        Command::Templates { file } => {
            let mut value = parse_file(&file)?;
            let mut templates = TemplateMap::new();
            add_templates(&mut templates, &mut value, true, "template")?;
            println!("templates: {}", templates.len());
            for template in templates.values() {
                print!("{}", template);
            }
            use_templates(&templates, &mut value, "use-template")?;
            print_value(&value)?;
        }
        Command::Translations { file, language } => {
            let mut value = parse_file(&file)?;
            let mut languages = LanguageMap::new();
            collect_translations(&mut languages, &mut value, true, "translations")?;
            for (language_id, translations) in &languages {
                println!("language: {}", language_id);
                for translation in translations.values() {
                    println!("\t{} = {}", translation.id, translation.value);
                }
            }
            if let Some(language) = language {
                tml_cfg::translation::use_language(&languages, &language, "tr(", &mut value)?;
                print_value(&value)?;
            }
        }
        Command::Variables { file } => {
            let mut value = parse_file(&file)?;
            let mut languages = LanguageMap::new();
            collect_variables(&mut languages, &mut value, true, "variables")?;
            if let Some(variables) = languages.get("") {
                println!("variables: {}", variables.len());
                for variable in variables.values() {
                    println!("\t{} = {}", variable.id, variable.value);
                }
            } else {
                println!("no variables exist");
            }
        }
        Command::Include {
            file,
            once,
            buffered,
        } => {
            let filename = file.display().to_string();
            let mut loader = TmlFileLoader::new();
            let options = IncludeOptions::new()
                .with_include_once(once)
                .with_file_buffering(buffered);
            let (value, included) = load_and_include(&filename, &mut loader, &options)
                .with_context(|| format!("include expansion of {} failed", filename))?;
            print_value(&value)?;
            eprintln!("included files:");
            for (name, count) in &included {
                eprintln!("\t{} ({}x)", name, count);
            }
        }
        Command::Tml2btml {
            mode,
            input,
            output,
        } => {
            let strip = matches!(
                mode,
                ConvertMode::Strip | ConvertMode::StripShrink | ConvertMode::Afss
            );
            let shrink = matches!(
                mode,
                ConvertMode::Shrink | ConvertMode::StripShrink | ConvertMode::Afss
            );
            let value = if matches!(mode, ConvertMode::Afss) {
                let mut value = run_pipeline(&input)?;
                strip_records(&mut value);
                value
            } else if strip {
                parse_file_with_options(&input, &ParseOptions::values_only())?
            } else {
                parse_file(&input)?
            };
            let bytes = btml::encode_with_header(&value, shrink)?;
            std::fs::write(&output, bytes)
                .with_context(|| format!("writing {} failed", output.display()))?;
        }
        Command::Btml2tml { input, output } => {
            let bytes = std::fs::read(&input)
                .with_context(|| format!("reading {} failed", input.display()))?;
            let decoded = btml::decode_auto(&bytes)?;
            for warning in &decoded.warnings {
                eprintln!("warning: {}", warning);
            }
            let text = tml_cfg::to_string(&decoded.value)?;
            std::fs::write(&output, text)
                .with_context(|| format!("writing {} failed", output.display()))?;
        }
        Command::Interpret { file } => {
            let mut value = parse_file(&file)?;
            let count = expr::interpret_and_replace(&mut value, false, true, true)?;
            eprintln!("evaluated expressions: {}", count);
            print_value(&value)?;
        }
        Command::AllFeatures { input, output } => {
            let value = run_pipeline(&input)?;
            match output {
                Some(path) => {
                    let text = tml_cfg::to_string(&value)?;
                    std::fs::write(&path, text)
                        .with_context(|| format!("writing {} failed", path.display()))?;
                }
                None => print_value(&value)?,
            }
        }
        Command::Json { file } => {
            let value = parse_file(&file)?;
            println!("{}", json::to_json_string_pretty(&value)?);
        }
    }
    Ok(())
}

/// Removes empty-line and comment records from a tree.
fn strip_records(value: &mut Value) {
    if let tml_cfg::ValueKind::Object(pairs) = &mut value.kind {
        pairs.retain(|pair| !pair.is_empty_or_comment());
        for pair in pairs {
            strip_records(&mut pair.value);
        }
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {:#}", error);
        std::process::exit(1);
    }
}
