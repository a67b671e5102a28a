//! # Ellipse Core
//!
//! Crate compartilhada pelo cliente mínimo e pelo simulador: tipos dos
//! logs inerciais, canal de transporte, protocolo de link (bincode com
//! magic byte), sessão, configuração TOML e o ciclo de vida do cliente.
//!
//! ## Módulos
//! - [`types`] – Identificação do dispositivo, saídas e registros de log
//! - [`channel`] – Canal serial ou arquivo de captura
//! - [`protocol`] – Frames com magic byte, versão e tamanho
//! - [`session`] – Trait da sessão, callback e resultado do polling
//! - [`link`] – Sessão concreta sobre o protocolo de link
//! - [`client`] – Inicialização, configuração, polling e encerramento
//! - [`format`] – Linhas de console por tipo de log
//! - [`config`] – Configuração unificada via TOML
//! - [`error`] – Erros de cada camada

pub mod types;
pub mod error;
pub mod protocol;
pub mod channel;
pub mod session;
pub mod link;
pub mod config;
pub mod format;
pub mod client;

#[cfg(test)]
mod test_support;

// Re-exports convenientes
pub use channel::Channel;
pub use client::{ClientState, ConfigureReport, RunSummary, TelemetryClient};
pub use config::AppConfig;
pub use error::{ChannelError, ClientError, ConfigError, ProtocolError, StartupError};
pub use link::LinkSession;
pub use protocol::{Message, PROTOCOL_VERSION, encode_frame};
pub use session::{EcomSession, LogHandler, PollOutcome};
pub use types::{DeviceInfo, LogId, LogRecord};
