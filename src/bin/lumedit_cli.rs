use anyhow::{anyhow, Context, Result};
use lumedit::batch::{Batch, NamingPolicy};
use lumedit::calculated::CalculatedProperties;
use lumedit::codec;
use lumedit::document::Document;
use lumedit::photometric::Dimension;
use lumedit::reconcile::ReconcilePolicy;
use lumedit::scaling;
use serde::Serialize;
use std::{env, fs, path::Path};

fn usage() {
    eprintln!(
        "Usage:\n  \
  lumedit_cli --version\n  \
  lumedit_cli inspect FILE.ies\n  \
  lumedit_cli regen FILE.ies\n  \
  lumedit_cli scale-wattage FILE.ies WATTS [-o OUT.ies]\n  \
  lumedit_cli scale-lumens FILE.ies LUMENS [--adjust-wattage] [-o OUT.ies]\n  \
  lumedit_cli scale-dimension FILE.ies length|width|height VALUE [-o OUT.ies]\n  \
  lumedit_cli swap-dimensions FILE.ies [-o OUT.ies]\n  \
  lumedit_cli apply-csv CSV DIR OUT_DIR [--suffix S] [--use-original-names] [--auto-adjust-wattage]"
    );
}

#[derive(Serialize)]
struct Inspection {
    document: Document,
    properties: CalculatedProperties,
    linear_fixture: bool,
}

#[derive(Serialize)]
struct BatchSummary {
    loaded: usize,
    updated: usize,
    skipped: usize,
    written: Vec<String>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("could not serialize JSON output")?;
    println!("{text}");
    Ok(())
}

fn load_document(path: &str) -> Result<Document> {
    let text = fs::read_to_string(path).with_context(|| format!("could not read '{path}'"))?;
    let file_name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());
    Ok(codec::parse(&text, &file_name, text.len() as u64)?)
}

fn write_output(document: &Document, out: Option<&str>) -> Result<()> {
    let text = codec::generate(document);
    match out {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("could not write '{path}'"))?
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// Splits off a trailing `-o OUT` pair, returning the remaining positional
/// arguments and the output path.
fn split_output_flag(args: &[String]) -> Result<(Vec<&String>, Option<&str>)> {
    let mut positional = Vec::new();
    let mut out = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-o" {
            out = Some(
                iter.next()
                    .ok_or_else(|| anyhow!("-o needs a path"))?
                    .as_str(),
            );
        } else {
            positional.push(arg);
        }
    }
    Ok((positional, out))
}

fn parse_value(text: &str, what: &str) -> Result<f64> {
    text.parse()
        .map_err(|_| anyhow!("'{text}' is not a valid {what}"))
}

fn cmd_inspect(args: &[String]) -> Result<()> {
    let [path] = args else {
        usage();
        return Err(anyhow!("inspect needs exactly one file"));
    };
    let document = load_document(path)?;
    if let Err(error) = document.photometric.integrity() {
        log::warn!("'{}': {error}", document.file_name);
    }
    let properties = CalculatedProperties::from_data(&document.photometric);
    let linear_fixture = scaling::is_linear_fixture(&document.photometric);
    print_json(&Inspection {
        document,
        properties,
        linear_fixture,
    })
}

fn cmd_regen(args: &[String]) -> Result<()> {
    let [path] = args else {
        usage();
        return Err(anyhow!("regen needs exactly one file"));
    };
    let document = load_document(path)?;
    print!("{}", codec::generate(&document));
    Ok(())
}

fn cmd_scale_wattage(args: &[String]) -> Result<()> {
    let (positional, out) = split_output_flag(args)?;
    let [path, watts] = positional.as_slice() else {
        usage();
        return Err(anyhow!("scale-wattage needs FILE and WATTS"));
    };
    let document = load_document(path.as_str())?;
    let target = parse_value(watts.as_str(), "wattage")?;
    let scaled = scaling::scale_by_wattage(&document.photometric, target)?;
    log::info!("scaled '{}' by factor {}", document.file_name, scaled.factor);
    write_output(&document.with_photometric(scaled.data), out)
}

fn cmd_scale_lumens(args: &[String]) -> Result<()> {
    let adjust_wattage = args.iter().any(|arg| arg == "--adjust-wattage");
    let args: Vec<String> = args
        .iter()
        .filter(|arg| *arg != "--adjust-wattage")
        .cloned()
        .collect();
    let (positional, out) = split_output_flag(&args)?;
    let [path, lumens] = positional.as_slice() else {
        usage();
        return Err(anyhow!("scale-lumens needs FILE and LUMENS"));
    };
    let document = load_document(path.as_str())?;
    let target = parse_value(lumens.as_str(), "lumen value")?;
    let scaled = scaling::scale_by_lumens(&document.photometric, target, adjust_wattage)?;
    log::info!("scaled '{}' by factor {}", document.file_name, scaled.factor);
    write_output(&document.with_photometric(scaled.data), out)
}

fn cmd_scale_dimension(args: &[String]) -> Result<()> {
    let (positional, out) = split_output_flag(args)?;
    let [path, dimension, value] = positional.as_slice() else {
        usage();
        return Err(anyhow!("scale-dimension needs FILE, DIMENSION and VALUE"));
    };
    let dimension = Dimension::parse(dimension.as_str())
        .ok_or_else(|| anyhow!("dimension must be length, width or height"))?;
    let document = load_document(path.as_str())?;
    let target = parse_value(value.as_str(), "dimension value")?;
    let scaled = scaling::scale_by_dimension(&document.photometric, target, dimension)?;
    log::info!("scaled '{}' by factor {}", document.file_name, scaled.factor);
    write_output(&document.with_photometric(scaled.data), out)
}

fn cmd_swap_dimensions(args: &[String]) -> Result<()> {
    let (positional, out) = split_output_flag(args)?;
    let [path] = positional.as_slice() else {
        usage();
        return Err(anyhow!("swap-dimensions needs exactly one file"));
    };
    let document = load_document(path.as_str())?;
    let swapped = scaling::swap_dimensions(&document.photometric);
    write_output(&document.with_photometric(swapped.data), out)
}

fn cmd_apply_csv(args: &[String]) -> Result<()> {
    let mut positional: Vec<&String> = Vec::new();
    let mut naming = NamingPolicy::default();
    let mut policy = ReconcilePolicy::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--suffix" => {
                naming.suffix = iter
                    .next()
                    .ok_or_else(|| anyhow!("--suffix needs a value"))?
                    .clone();
            }
            "--use-original-names" => naming.use_original_file_name = true,
            "--auto-adjust-wattage" => policy.auto_adjust_wattage = true,
            _ => positional.push(arg),
        }
    }
    let [csv_path, dir, out_dir] = positional.as_slice() else {
        usage();
        return Err(anyhow!("apply-csv needs CSV, DIR and OUT_DIR"));
    };

    let mut batch = Batch::new();
    let loaded = batch.load_dir(Path::new(dir.as_str()))?;
    let csv_text = fs::read_to_string(csv_path.as_str())
        .with_context(|| format!("could not read '{csv_path}'"))?;
    let outcome = batch.apply_csv(&csv_text, policy)?;

    fs::create_dir_all(out_dir.as_str())?;
    let mut written = Vec::new();
    for exported in batch.export(&naming) {
        let path = Path::new(out_dir.as_str()).join(&exported.file_name);
        fs::write(&path, exported.text)
            .with_context(|| format!("could not write '{}'", path.display()))?;
        written.push(exported.file_name);
    }
    print_json(&BatchSummary {
        loaded: loaded.loaded.len(),
        updated: outcome.updated.len(),
        skipped: outcome.skipped.len() + loaded.failures.len(),
        written,
    })
}

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
        std::process::exit(1);
    }
    let result = match args[1].as_str() {
        "--version" => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "inspect" => cmd_inspect(&args[2..]),
        "regen" => cmd_regen(&args[2..]),
        "scale-wattage" => cmd_scale_wattage(&args[2..]),
        "scale-lumens" => cmd_scale_lumens(&args[2..]),
        "scale-dimension" => cmd_scale_dimension(&args[2..]),
        "swap-dimensions" => cmd_swap_dimensions(&args[2..]),
        "apply-csv" => cmd_apply_csv(&args[2..]),
        other => {
            usage();
            Err(anyhow!("unknown command '{other}'"))
        }
    };
    if let Err(error) = result {
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}
