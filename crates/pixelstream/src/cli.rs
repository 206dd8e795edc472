use std::path::PathBuf;

use clap::Parser;
use renderer::FilterMode;

#[derive(Parser, Debug)]
#[command(
    name = "pixelstream",
    author,
    version,
    about = "Streams frames from an opaque compute module onto a GPU-backed window"
)]
pub struct Cli {
    /// Path to the compute module artifact (`.wasm`).
    #[arg(value_name = "MODULE")]
    pub module: Option<PathBuf>,

    /// Logical render resolution of the streamed buffer (e.g. `1024x1024`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_extent)]
    pub size: Option<(u32, u32)>,

    /// Window size in physical pixels (e.g. `768x768`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_extent)]
    pub window: Option<(u32, u32)>,

    /// Target stream rate in frames per second.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Sampling filter for the streamed image: `linear` or `nearest`.
    #[arg(long, value_name = "MODE", value_parser = parse_filter)]
    pub filter: Option<FilterMode>,

    /// Disable pointer input relay to the compute module.
    #[arg(long)]
    pub no_pointer: bool,

    /// Stream a fixed solid colour instead of running a module.
    #[arg(long, value_name = "RRGGBBAA", value_parser = parse_rgba, conflicts_with = "module")]
    pub still_color: Option<[u8; 4]>,

    /// TOML session manifest; command-line flags override its values.
    #[arg(long, value_name = "FILE", env = "PIXELSTREAM_MANIFEST")]
    pub manifest: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_extent(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{value}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{value}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("extent must be non-zero, got '{value}'"));
    }
    Ok((width, height))
}

pub fn parse_filter(value: &str) -> Result<FilterMode, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "linear" => Ok(FilterMode::Linear),
        "nearest" => Ok(FilterMode::Nearest),
        other => Err(format!("unknown filter '{other}' (expected linear or nearest)")),
    }
}

pub fn parse_rgba(value: &str) -> Result<[u8; 4], String> {
    let trimmed = value.trim().trim_start_matches('#');
    if trimmed.len() != 8 || !trimmed.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(format!("expected 8 hex digits (RRGGBBAA), got '{value}'"));
    }
    let mut rgba = [0u8; 4];
    for (index, slot) in rgba.iter_mut().enumerate() {
        let byte = &trimmed[index * 2..index * 2 + 2];
        *slot = u8::from_str_radix(byte, 16).map_err(|_| format!("invalid hex in '{value}'"))?;
    }
    Ok(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_extents() {
        assert_eq!(parse_extent("1024x768").unwrap(), (1024, 768));
        assert_eq!(parse_extent("256X256").unwrap(), (256, 256));
        assert!(parse_extent("1024").is_err());
        assert!(parse_extent("0x768").is_err());
        assert!(parse_extent("axb").is_err());
    }

    #[test]
    fn parses_filters() {
        assert_eq!(parse_filter("linear").unwrap(), FilterMode::Linear);
        assert_eq!(parse_filter("NEAREST").unwrap(), FilterMode::Nearest);
        assert!(parse_filter("bicubic").is_err());
    }

    #[test]
    fn parses_rgba_colours() {
        assert_eq!(parse_rgba("ff8000ff").unwrap(), [0xff, 0x80, 0x00, 0xff]);
        assert_eq!(parse_rgba("#00000000").unwrap(), [0, 0, 0, 0]);
        assert!(parse_rgba("ff8000").is_err());
        assert!(parse_rgba("gg8000ff").is_err());
    }

    #[test]
    fn still_colour_conflicts_with_module() {
        let result = Cli::try_parse_from([
            "pixelstream",
            "module.wasm",
            "--still-color",
            "ff0000ff",
        ]);
        assert!(result.is_err());
    }
}
