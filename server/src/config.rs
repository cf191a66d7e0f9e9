use clap::Parser;
use system::Palette;
use thiserror::Error;

#[derive(Debug, Clone, Parser)]
#[command(name = "shared-canvas-server", about = "Shared drawing surface session server")]
pub struct ServerConfig {
    #[arg(long, env = "CANVAS_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "CANVAS_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Comma-separated participant colors, assigned round-robin.
    #[arg(long, env = "CANVAS_PALETTE", value_delimiter = ',')]
    pub palette: Vec<String>,

    /// Largest websocket frame accepted from a client, in bytes.
    #[arg(long, env = "CANVAS_MAX_FRAME_BYTES", default_value_t = 100 * 1024 * 1024)]
    pub max_frame_bytes: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("palette must contain at least one color")]
    EmptyPalette,
    #[error("max frame size must be greater than zero")]
    ZeroFrameSize,
}

impl ServerConfig {
    /// Checks the settings and builds the palette every session starts from.
    pub fn validate(&self) -> Result<Palette, ConfigError> {
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::ZeroFrameSize);
        }
        if self.palette.is_empty() {
            return Ok(Palette::default());
        }
        let colors = self
            .palette
            .iter()
            .map(|color| color.trim())
            .filter(|color| !color.is_empty())
            .map(str::to_owned)
            .collect();
        Palette::new(colors).ok_or(ConfigError::EmptyPalette)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}
