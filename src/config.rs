use std::fs;
use std::path::{Path, PathBuf};

/// File name searched for in the working directory when no explicit path is given.
const CONFIG_FILENAME: &str = "filmlab.json";
/// Environment variable that may point at a config file.
const CONFIG_ENV: &str = "FILMLAB_CONFIG";

/// Which backend the renderer context should construct.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum BackendChoice {
    /// GPU when compiled in and available, otherwise CPU.
    #[default]
    Auto,
    /// CPU pixel backend only.
    Cpu,
    /// GPU backend; lenient renders fall back when it is unavailable.
    Gpu,
}

/// Renderer context options.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererOpts {
    /// Backend selection policy.
    pub backend: BackendChoice,
    /// Upper bound on either surface dimension accepted by the backend.
    pub max_texture_size: u32,
    /// Maximum number of decoded bitmaps kept in the source cache.
    pub source_cache_entries: usize,
    /// Maximum decoded bytes kept in the source cache.
    pub source_cache_bytes: usize,
    /// Longest edge used for preview renders that do not request a size.
    pub preview_max_dimension: u32,
    /// Longest edge used for exports that do not request a size. `0` keeps source size.
    pub export_max_dimension: u32,
    /// Collapse identical consecutive lenient-mode errors into a repeat counter.
    pub dedupe_errors: bool,
    /// JPEG quality used when an export does not specify one.
    pub default_jpeg_quality: u8,
}

impl Default for RendererOpts {
    fn default() -> Self {
        Self {
            backend: BackendChoice::Auto,
            max_texture_size: 8192,
            source_cache_entries: 8,
            source_cache_bytes: 512 * 1024 * 1024,
            preview_max_dimension: 2048,
            export_max_dimension: 0,
            dedupe_errors: true,
            default_jpeg_quality: 92,
        }
    }
}

impl RendererOpts {
    /// Clamp out-of-range values to usable ones. Returns one warning per adjusted field.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !(256..=32768).contains(&self.max_texture_size) {
            let fixed = self.max_texture_size.clamp(256, 32768);
            warnings.push(format!(
                "maxTextureSize {} out of range; using {fixed}",
                self.max_texture_size
            ));
            self.max_texture_size = fixed;
        }
        if self.source_cache_entries == 0 {
            warnings.push("sourceCacheEntries must be >= 1; using 1".to_string());
            self.source_cache_entries = 1;
        }
        if self.preview_max_dimension == 0 || self.preview_max_dimension > self.max_texture_size
        {
            let fixed = self.max_texture_size.min(2048);
            warnings.push(format!(
                "previewMaxDimension {} out of range; using {fixed}",
                self.preview_max_dimension
            ));
            self.preview_max_dimension = fixed;
        }
        if self.export_max_dimension > self.max_texture_size {
            warnings.push(format!(
                "exportMaxDimension {} exceeds maxTextureSize; using {}",
                self.export_max_dimension, self.max_texture_size
            ));
            self.export_max_dimension = self.max_texture_size;
        }
        if !(1..=100).contains(&self.default_jpeg_quality) {
            let fixed = self.default_jpeg_quality.clamp(1, 100);
            warnings.push(format!(
                "defaultJpegQuality {} out of range; using {fixed}",
                self.default_jpeg_quality
            ));
            self.default_jpeg_quality = fixed;
        }
        warnings
    }
}

/// Loaded options, where they came from, and anything that had to be fixed up.
#[derive(Clone, Debug)]
pub struct RendererOptsHandle {
    /// Sanitized options.
    pub opts: RendererOpts,
    /// File the options were read from, if any.
    pub source: Option<PathBuf>,
    /// Parse failures and sanitize adjustments, in discovery order.
    pub warnings: Vec<String>,
}

/// Load options from `custom_path`, then `$FILMLAB_CONFIG`, then `./filmlab.json`.
///
/// Never fails: unreadable or invalid candidates are recorded as warnings and the next one is
/// tried; when nothing loads, defaults are returned.
pub fn load_opts(custom_path: Option<&Path>) -> RendererOptsHandle {
    let mut warnings = Vec::new();

    for candidate in config_candidates(custom_path) {
        if !candidate.is_file() {
            if custom_path.is_some() {
                warnings.push(format!("renderer options {} not found", candidate.display()));
            }
            continue;
        }
        match fs::read_to_string(&candidate) {
            Ok(contents) => match serde_json::from_str::<RendererOpts>(&contents) {
                Ok(mut opts) => {
                    warnings.extend(opts.sanitize());
                    let source = fs::canonicalize(&candidate).unwrap_or(candidate);
                    tracing::debug!(source = %source.display(), "loaded renderer options");
                    return RendererOptsHandle {
                        opts,
                        source: Some(source),
                        warnings,
                    };
                }
                Err(err) => warnings.push(format!(
                    "failed to parse renderer options {}: {err}",
                    candidate.display()
                )),
            },
            Err(err) => warnings.push(format!(
                "failed to read renderer options {}: {err}",
                candidate.display()
            )),
        }
    }

    RendererOptsHandle {
        opts: RendererOpts::default(),
        source: None,
        warnings,
    }
}

fn config_candidates(custom_path: Option<&Path>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(p) = custom_path {
        out.push(p.to_path_buf());
        return out;
    }
    if let Ok(p) = std::env::var(CONFIG_ENV)
        && !p.is_empty()
    {
        out.push(PathBuf::from(p));
    }
    out.push(PathBuf::from(CONFIG_FILENAME));
    out
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
