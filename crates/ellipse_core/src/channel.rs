//! Canal de transporte: porta serial, arquivo de captura ou link genérico.
//!
//! O canal é fechado no `Drop`, então qualquer caminho de saída libera o
//! dispositivo.

use crate::config::{ChannelConfig, ChannelKind};
use crate::error::ChannelError;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Qualquer transporte bidirecional de bytes.
pub trait Link: Read + Write + Send {}

impl<T: Read + Write + Send + ?Sized> Link for T {}

/// Canal aberto e exclusivo do cliente.
pub struct Channel {
    name: String,
    writable: bool,
    link: Box<dyn Link>,
}

impl Channel {
    /// Abre o canal descrito na configuração.
    pub fn open(config: &ChannelConfig) -> Result<Self, ChannelError> {
        match config.kind {
            ChannelKind::Serial => Self::open_serial(
                &config.path,
                config.baud_rate,
                Duration::from_millis(config.read_timeout_ms),
            ),
            ChannelKind::File => Self::open_file(Path::new(&config.path)),
        }
    }

    /// Abre uma porta serial. O timeout de leitura define quanto um
    /// `read` bloqueia antes de devolver `TimedOut`.
    pub fn open_serial(
        path: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Self, ChannelError> {
        if baud_rate == 0 {
            return Err(ChannelError::InvalidBaud(baud_rate));
        }

        let port = serialport::new(path, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|source| ChannelError::Open {
                path: path.to_string(),
                source,
            })?;

        info!("Serial {path} aberta @ {baud_rate} baud");
        Ok(Self {
            name: path.to_string(),
            writable: true,
            link: Box::new(port),
        })
    }

    /// Abre uma captura para replay. O canal é somente leitura.
    pub fn open_file(path: &Path) -> Result<Self, ChannelError> {
        let file = File::open(path).map_err(|source| ChannelError::File {
            path: path.display().to_string(),
            source,
        })?;

        info!("Captura {} aberta para replay", path.display());
        Ok(Self {
            name: path.display().to_string(),
            writable: false,
            link: Box::new(file),
        })
    }

    /// Cria (ou trunca) um arquivo de captura para escrita.
    pub fn create_file(path: &Path) -> Result<Self, ChannelError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| ChannelError::File {
                path: path.display().to_string(),
                source,
            })?;

        info!("Captura {} criada", path.display());
        Ok(Self {
            name: path.display().to_string(),
            writable: true,
            link: Box::new(file),
        })
    }

    /// Envolve um link já aberto (bridges, testes).
    pub fn from_link(name: impl Into<String>, link: impl Link + 'static, writable: bool) -> Self {
        Self {
            name: name.into(),
            writable,
            link: Box::new(link),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }
}

impl Read for Channel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.link.read(buf)
    }
}

impl Write for Channel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "canal somente leitura",
            ));
        }
        self.link.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.writable {
            return Ok(());
        }
        self.link.flush()
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        debug!("Canal {} fechado", self.name);
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("writable", &self.writable)
            .finish_non_exhaustive()
    }
}
