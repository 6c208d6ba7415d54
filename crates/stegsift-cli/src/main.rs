use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use memmap2::Mmap;

use stegsift_codecs::{DecodeLimits, StandardDecoder};
use stegsift_core::{AnalyzerOptions, DetectionMode, ImageFormat};

#[derive(Parser)]
#[command(name = "stegsift", version, about = "Find data hidden inside image files")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Scan {
        image: String,
        #[arg(long, value_parser = ["conservative", "balanced", "aggressive"])]
        mode: Option<String>,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        no_context_validation: bool,
        #[arg(long)]
        no_lsb: bool,
        #[arg(long)]
        no_stats: bool,
        #[arg(long)]
        max_pixels: Option<u64>,
        #[arg(long)]
        max_decode_bytes: Option<u64>,
        #[arg(long)]
        decode_timeout_ms: Option<u64>,
        #[arg(long, value_parser = ["png", "jpg", "jpeg", "gif", "bmp"])]
        format: Option<String>,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        jsonl: bool,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        profile: Option<String>,
    },
    Report {
        image: String,
        #[arg(long, value_parser = ["conservative", "balanced", "aggressive"])]
        mode: Option<String>,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        no_context_validation: bool,
        #[arg(long)]
        no_lsb: bool,
        #[arg(long)]
        no_stats: bool,
        #[arg(long)]
        max_pixels: Option<u64>,
        #[arg(long)]
        max_decode_bytes: Option<u64>,
        #[arg(long)]
        decode_timeout_ms: Option<u64>,
        #[arg(long, value_parser = ["png", "jpg", "jpeg", "gif", "bmp"])]
        format: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        profile: Option<String>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    Signatures {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    match args.command {
        Command::Scan {
            image,
            mode,
            threshold,
            no_context_validation,
            no_lsb,
            no_stats,
            max_pixels,
            max_decode_bytes,
            decode_timeout_ms,
            format,
            json,
            jsonl,
            config,
            profile,
        } => run_scan(
            &image,
            mode.as_deref(),
            threshold,
            no_context_validation,
            no_lsb,
            no_stats,
            max_pixels,
            max_decode_bytes,
            decode_timeout_ms,
            format.as_deref(),
            json,
            jsonl,
            config.as_deref(),
            profile.as_deref(),
        ),
        Command::Report {
            image,
            mode,
            threshold,
            no_context_validation,
            no_lsb,
            no_stats,
            max_pixels,
            max_decode_bytes,
            decode_timeout_ms,
            format,
            config,
            profile,
            out,
        } => run_report(
            &image,
            mode.as_deref(),
            threshold,
            no_context_validation,
            no_lsb,
            no_stats,
            max_pixels,
            max_decode_bytes,
            decode_timeout_ms,
            format.as_deref(),
            config.as_deref(),
            profile.as_deref(),
            out.as_deref(),
        ),
        Command::Signatures { json } => run_signatures(json),
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter =
        EnvFilter::try_from_env("STEGSIFT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn mmap_file(path: &str) -> Result<Mmap> {
    let f = fs::File::open(path)?;
    let map = unsafe { Mmap::map(&f).map_err(|e| anyhow!(e))? };
    tracing::debug!(path, len = map.len(), "input mapped");
    Ok(map)
}

/// The declared format hint comes from `--format` when given, otherwise from
/// the file extension. Content sniffing in the engine still wins over it.
fn declared_format(image: &str, flag: Option<&str>) -> Option<ImageFormat> {
    if let Some(name) = flag {
        return ImageFormat::from_extension(name);
    }
    Path::new(image)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(ImageFormat::from_extension)
}

#[allow(clippy::too_many_arguments)]
fn build_options(
    mode: Option<&str>,
    threshold: Option<f64>,
    no_context_validation: bool,
    no_lsb: bool,
    no_stats: bool,
    max_pixels: Option<u64>,
    max_decode_bytes: Option<u64>,
    decode_timeout_ms: Option<u64>,
    config: Option<&Path>,
    profile: Option<&str>,
) -> Result<(AnalyzerOptions, DecodeLimits)> {
    let mut options = AnalyzerOptions::default();
    let mut limits = DecodeLimits::default();
    if let Some(path) = config {
        let cfg = stegsift_core::config::Config::load(path)?;
        cfg.apply(profile, &mut options)?;
        if let Some(v) = cfg.decode.max_pixels {
            limits.max_pixels = v;
        }
        if let Some(v) = cfg.decode.max_input_bytes {
            limits.max_input_bytes = v;
        }
        if let Some(v) = cfg.decode.timeout_ms {
            limits.timeout_ms = v;
        }
    }
    // Explicit flags override whatever the config file set.
    if let Some(mode) = mode {
        options.mode =
            DetectionMode::parse(mode).ok_or_else(|| anyhow!("unknown mode: {}", mode))?;
    }
    if let Some(threshold) = threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!("threshold must be between 0 and 1"));
        }
        options.confidence_threshold = Some(threshold);
    }
    if no_context_validation {
        options.context_validation = Some(false);
    }
    if no_lsb {
        options.lsb_enabled = false;
    }
    if no_stats {
        options.stats_enabled = false;
    }
    if let Some(v) = max_pixels {
        limits.max_pixels = v;
    }
    if let Some(v) = max_decode_bytes {
        limits.max_input_bytes = v;
    }
    if let Some(v) = decode_timeout_ms {
        limits.timeout_ms = v;
    }
    Ok((options, limits))
}

#[allow(clippy::too_many_arguments)]
fn run_scan(
    image: &str,
    mode: Option<&str>,
    threshold: Option<f64>,
    no_context_validation: bool,
    no_lsb: bool,
    no_stats: bool,
    max_pixels: Option<u64>,
    max_decode_bytes: Option<u64>,
    decode_timeout_ms: Option<u64>,
    format: Option<&str>,
    json: bool,
    jsonl: bool,
    config: Option<&Path>,
    profile: Option<&str>,
) -> Result<()> {
    let mmap = mmap_file(image)?;
    let (options, limits) = build_options(
        mode,
        threshold,
        no_context_validation,
        no_lsb,
        no_stats,
        max_pixels,
        max_decode_bytes,
        decode_timeout_ms,
        config,
        profile,
    )?;
    let declared = declared_format(image, format);
    let decoder = StandardDecoder::new(limits);
    let mut result = stegsift_core::analyze(&mmap, declared, Some(&decoder), &options);
    result.meta.path = Some(image.to_string());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        stegsift_core::report::print_json(&result, &mut out)?;
    } else if jsonl {
        stegsift_core::report::print_jsonl(&result, &mut out)?;
    } else {
        stegsift_core::report::print_human(&result, &mut out)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_report(
    image: &str,
    mode: Option<&str>,
    threshold: Option<f64>,
    no_context_validation: bool,
    no_lsb: bool,
    no_stats: bool,
    max_pixels: Option<u64>,
    max_decode_bytes: Option<u64>,
    decode_timeout_ms: Option<u64>,
    format: Option<&str>,
    config: Option<&Path>,
    profile: Option<&str>,
    out: Option<&Path>,
) -> Result<()> {
    let mmap = mmap_file(image)?;
    let (options, limits) = build_options(
        mode,
        threshold,
        no_context_validation,
        no_lsb,
        no_stats,
        max_pixels,
        max_decode_bytes,
        decode_timeout_ms,
        config,
        profile,
    )?;
    let declared = declared_format(image, format);
    let decoder = StandardDecoder::new(limits);
    let mut result = stegsift_core::analyze(&mmap, declared, Some(&decoder), &options);
    result.meta.path = Some(image.to_string());

    let rendered = serde_json::to_string_pretty(&result)?;
    if let Some(path) = out {
        fs::write(path, rendered)?;
    } else {
        println!("{}", rendered);
    }
    Ok(())
}

fn run_signatures(json: bool) -> Result<()> {
    let signatures = stegsift_core::signatures::ByteSignatureIndex::builtin().signatures();
    if json {
        let list: Vec<serde_json::Value> = signatures
            .iter()
            .map(|sig| {
                serde_json::json!({
                    "name": sig.name,
                    "class": sig.class.as_str(),
                    "magic": sig.magic.iter().map(|b| format!("{:02x}", b)).collect::<String>(),
                    "extensions": sig.extensions,
                    "min_plausible_size": sig.min_plausible_size,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }
    println!(
        "{:<8} {:<12} {:<24} {:<18} {:>9}",
        "name", "class", "magic", "extensions", "min bytes"
    );
    for sig in signatures {
        let magic: Vec<String> = sig.magic.iter().map(|b| format!("{:02x}", b)).collect();
        println!(
            "{:<8} {:<12} {:<24} {:<18} {:>9}",
            sig.name,
            sig.class.as_str(),
            magic.join(" "),
            sig.extensions.join(", "),
            sig.min_plausible_size
        );
    }
    Ok(())
}
