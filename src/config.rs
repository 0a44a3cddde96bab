use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 55000;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Port the WebSocket listener binds on all interfaces.
    pub port: u16,
    /// Optional job file ingested before the first worker connects.
    pub txtfile: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            txtfile: None,
        }
    }
}

impl CoordinatorConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    pub fn with_txtfile(mut self, path: PathBuf) -> Self {
        self.txtfile = Some(path);
        self
    }
}
