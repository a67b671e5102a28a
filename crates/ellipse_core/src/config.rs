//! Configuração unificada via TOML.
//!
//! Um único `config.toml` serve o cliente e o simulador. Flags de linha de
//! comando sobrescrevem os valores do arquivo.

use crate::error::ConfigError;
use crate::protocol::MAX_BODY_SIZE;
use crate::types::{LogClass, LogId, OutputConfig, OutputMode, OutputPort};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Tipo de canal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Porta serial em tempo real
    Serial,
    /// Replay de uma captura gravada
    File,
}

/// Configuração do canal de transporte.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub kind: ChannelKind,
    /// Dispositivo serial ou caminho da captura
    pub path: String,
    pub baud_rate: u32,
    /// Quanto uma leitura serial bloqueia sem dados (ms)
    pub read_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            kind: ChannelKind::Serial,
            path: "/dev/ttyUSB0".into(),
            baud_rate: 115_200,
            read_timeout_ms: 10,
        }
    }
}

/// Parâmetros da sessão de protocolo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Tempo máximo de espera por resposta a um comando (ms)
    pub command_timeout_ms: u64,
    /// Maior payload de frame aceito (bytes)
    pub max_frame_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 500,
            max_frame_size: 512,
        }
    }
}

/// Parâmetros do loop de polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Pausa quando não há frame completo (ms)
    pub idle_sleep_ms: u64,
    /// Erros consecutivos que encerram o loop (0 = nunca)
    pub max_consecutive_poll_errors: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            idle_sleep_ms: 1,
            max_consecutive_poll_errors: 0,
        }
    }
}

/// Identidade e comportamento do dispositivo simulado.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub product_code: String,
    pub serial_number: u32,
    pub firmware_version: String,
    /// Duração padrão de uma captura (s)
    pub record_seconds: u32,
    /// Logs cuja configuração o simulador recusa
    pub reject_logs: Vec<LogId>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            product_code: "ELLIPSE2-N-G4A2-B1".into(),
            serial_number: 123_456_789,
            firmware_version: "2.6.0".into(),
            record_seconds: 10,
            reject_logs: Vec::new(),
        }
    }
}

/// Saídas habilitadas na inicialização: IMU e Euler a 25 Hz na porta A.
pub fn default_outputs() -> Vec<OutputConfig> {
    vec![
        OutputConfig::new(OutputPort::A, LogClass::Ecom0, LogId::ImuData, OutputMode::Div8),
        OutputConfig::new(OutputPort::A, LogClass::Ecom0, LogId::EkfEuler, OutputMode::Div8),
    ]
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub channel: ChannelConfig,
    pub session: SessionConfig,
    pub client: ClientConfig,
    pub sim: SimConfig,
    pub outputs: Vec<OutputConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            session: SessionConfig::default(),
            client: ClientConfig::default(),
            sim: SimConfig::default(),
            outputs: default_outputs(),
        }
    }
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML, com padrão em caso de erro.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match Self::try_load(path) {
                Ok(config) => return config,
                Err(e) => warn!("{e}"),
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Carrega configuração de um arquivo TOML, propagando erros.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = toml::from_str::<AppConfig>(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        info!("Configuração carregada de {}", path.display());
        Ok(config)
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.channel.path.trim().is_empty() {
            errors.push("Caminho do canal não pode ser vazio".into());
        }
        if self.channel.kind == ChannelKind::Serial && self.channel.baud_rate == 0 {
            errors.push("Baud rate não pode ser 0".into());
        }
        if self.session.max_frame_size == 0 || self.session.max_frame_size > MAX_BODY_SIZE {
            errors.push(format!(
                "max_frame_size inválido: {} (1–{MAX_BODY_SIZE})",
                self.session.max_frame_size
            ));
        }
        if self.session.command_timeout_ms == 0 {
            errors.push("command_timeout_ms não pode ser 0".into());
        }
        if self.client.idle_sleep_ms > 1_000 {
            errors.push(format!(
                "idle_sleep_ms inválido: {} (0–1000)",
                self.client.idle_sleep_ms
            ));
        }

        let mut seen = HashSet::new();
        for output in &self.outputs {
            if !seen.insert((output.port, output.log)) {
                errors.push(format!(
                    "Saída duplicada: {} na porta {:?}",
                    output.log, output.port
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
    }

    #[test]
    fn defaults_match_reference_setup() {
        let config = AppConfig::default();
        assert_eq!(config.channel.path, "/dev/ttyUSB0");
        assert_eq!(config.channel.baud_rate, 115_200);
        assert_eq!(config.outputs.len(), 2);
        assert!(config.outputs.iter().all(|o| o.mode == OutputMode::Div8));
        assert_eq!(config.client.max_consecutive_poll_errors, 0);
    }

    #[test]
    fn roundtrip_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config.channel.baud_rate = 921_600;
        config.sim.reject_logs = vec![LogId::EkfNav];
        config.save(&path).unwrap();

        let parsed = AppConfig::try_load(&path).unwrap();
        assert_eq!(parsed.channel.baud_rate, 921_600);
        assert_eq!(parsed.outputs, config.outputs);
        assert_eq!(parsed.sim.reject_logs, vec![LogId::EkfNav]);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
[channel]
kind = "file"
path = "captura.bin"

[[outputs]]
port = "B"
class = "ecom0"
log = "ekf_quat"
mode = "div4"
"#;
        let config: AppConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.channel.kind, ChannelKind::File);
        // Outros campos devem ter valor padrão
        assert_eq!(config.channel.baud_rate, 115_200);
        assert_eq!(config.session.command_timeout_ms, 500);
        assert_eq!(
            config.outputs,
            vec![OutputConfig::new(
                OutputPort::B,
                LogClass::Ecom0,
                LogId::EkfQuat,
                OutputMode::Div4
            )]
        );
    }

    #[test]
    fn invalid_toml_is_reported_by_try_load_and_defaulted_by_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[channel\nbaud_rate = ").unwrap();

        assert!(matches!(
            AppConfig::try_load(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert_eq!(AppConfig::load(&path).channel.baud_rate, 115_200);
    }

    #[test]
    fn validate_collects_every_problem() {
        let mut config = AppConfig::default();
        config.channel.baud_rate = 0;
        config.session.max_frame_size = 0;
        config.outputs.push(config.outputs[0]);

        let errors = config.validate();
        assert_eq!(errors.len(), 3, "Erros: {:?}", errors);
    }

    #[test]
    fn zero_baud_is_fine_for_replay() {
        let mut config = AppConfig::default();
        config.channel.kind = ChannelKind::File;
        config.channel.baud_rate = 0;
        assert!(config.validate().is_empty());
    }
}
