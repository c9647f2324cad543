use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sha2::Digest;

#[derive(Parser, Debug)]
#[command(name = "filmlab", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a photo through an adjustment stack and write the encoded result.
    Render(RenderArgs),
    /// List built-in film presets.
    Presets(PresetsArgs),
    /// Convert a v1 film profile JSON into the v2 schema.
    Migrate(MigrateArgs),
    /// Write a built-in stock HaldCLUT as PNG.
    Lut(LutArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Source image (PNG, JPEG, WebP, ...).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output file. The format follows `--mime`, else the extension.
    #[arg(long)]
    out: PathBuf,

    /// Adjustments JSON. Defaults are used when omitted.
    #[arg(long)]
    adjustments: Option<PathBuf>,

    /// Film profile JSON (v1 or v2).
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Built-in preset id; overrides `--profile`.
    #[arg(long)]
    preset: Option<String>,

    /// Output MIME type, e.g. `image/jpeg`.
    #[arg(long)]
    mime: Option<String>,

    /// JPEG quality 1..=100.
    #[arg(long)]
    quality: Option<u8>,

    /// Longest output edge; source size when omitted.
    #[arg(long)]
    max_dimension: Option<u32>,

    /// Seed for per-export film modules.
    #[arg(long)]
    export_seed: Option<u64>,

    /// Renderer options JSON; `$FILMLAB_CONFIG` or `./filmlab.json` otherwise.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    backend: Option<BackendArg>,
}

#[derive(Parser, Debug)]
struct PresetsArgs {
    /// Print full profiles as JSON instead of `id  name` lines.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct MigrateArgs {
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct LutArgs {
    /// Stock id, e.g. `portra400`.
    stock: String,

    #[arg(long)]
    out: PathBuf,

    /// HaldCLUT level; the image is `level^3` pixels square.
    #[arg(long, default_value_t = 8)]
    level: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Auto,
    Cpu,
    Gpu,
}

impl From<BackendArg> for filmlab::BackendChoice {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Auto => Self::Auto,
            BackendArg::Cpu => Self::Cpu,
            BackendArg::Gpu => Self::Gpu,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Presets(args) => cmd_presets(args),
        Command::Migrate(args) => cmd_migrate(args),
        Command::Lut(args) => cmd_lut(args),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    let r = BufReader::new(f);
    let v = serde_json::from_reader(r).with_context(|| format!("parse {what} JSON"))?;
    Ok(v)
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))
}

fn mime_for(path: &Path, explicit: Option<&str>) -> anyhow::Result<String> {
    if let Some(m) = explicit {
        return Ok(m.to_string());
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        other => anyhow::bail!("cannot infer output type from extension '{other}'; pass --mime"),
    };
    Ok(mime.to_string())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let handle = filmlab::load_opts(args.config.as_deref());
    for w in &handle.warnings {
        tracing::warn!("{w}");
    }
    let mut opts = handle.opts;
    if let Some(b) = args.backend {
        opts.backend = b.into();
    }

    let adjustments: filmlab::EditingAdjustments = match &args.adjustments {
        Some(p) => read_json(p, "adjustments")?,
        None => filmlab::EditingAdjustments::default(),
    };
    let film_profile: Option<filmlab::FilmProfileInput> = match &args.profile {
        Some(p) => Some(read_json(p, "film profile")?),
        None => None,
    };

    let mime = mime_for(&args.out, args.mime.as_deref())?;
    filmlab::OutputFormat::from_mime(&mime)?;

    let mut render =
        filmlab::RenderRequest::new(filmlab::SourceInput::path(&args.in_path), adjustments);
    render.film_profile = film_profile;
    render.preset_id = args.preset;
    render.mode = filmlab::RenderMode::Export;
    render.quality = filmlab::QualityProfile::Full;
    if let Some(max) = args.max_dimension.filter(|m| *m > 0) {
        render.target_size = filmlab::TargetSize::MaxDimension { max };
    }
    render.export_seed = args.export_seed;

    let ctx = filmlab::RendererContext::new(opts);
    let blob = ctx
        .render_image_to_blob(&filmlab::ExportRequest {
            render,
            mime,
            quality: args.quality,
        })
        .with_context(|| format!("render '{}'", args.in_path.display()))?;

    write_output(&args.out, &blob)?;
    eprintln!("wrote {} (sha256 {})", args.out.display(), sha256_hex(&blob));
    Ok(())
}

fn cmd_presets(args: PresetsArgs) -> anyhow::Result<()> {
    let presets = filmlab::builtin_presets();
    if args.json {
        let s = serde_json::to_string_pretty(&presets).context("serialize presets")?;
        println!("{s}");
        return Ok(());
    }
    for p in &presets {
        println!("{:<16} {}", p.id, p.name);
    }
    Ok(())
}

fn cmd_migrate(args: MigrateArgs) -> anyhow::Result<()> {
    let v1: filmlab::FilmProfile = read_json(&args.in_path, "v1 film profile")?;
    let v2 = filmlab::migrate_film_profile_v1_to_v2(&v1);
    let s = serde_json::to_string_pretty(&v2).context("serialize v2 profile")?;
    match &args.out {
        Some(out) => {
            write_output(out, s.as_bytes())?;
            eprintln!("wrote {}", out.display());
        }
        None => println!("{s}"),
    }
    Ok(())
}

fn cmd_lut(args: LutArgs) -> anyhow::Result<()> {
    let lut = filmlab::generate_stock_lut(&args.stock, args.level)
        .with_context(|| {
            format!(
                "unknown stock '{}'; known: {}",
                args.stock,
                filmlab::STOCK_IDS.join(", ")
            )
        })?
        .context("generate lut")?;
    let png = lut.encode_png()?;
    write_output(&args.out, &png)?;
    eprintln!("wrote {} (sha256 {})", args.out.display(), sha256_hex(&png));
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
