//! Erros do cliente, separados por camada.

use crate::protocol::FrameError;

/// Falha ao abrir ou usar o canal de transporte.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Baud rate inválido: {0}")]
    InvalidBaud(u32),

    #[error("Não foi possível abrir {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Não foi possível abrir {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Falha da sessão de protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Argumento inválido: {0}")]
    InvalidArgument(String),

    #[error("Erro de I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame inválido: {0}")]
    Frame(#[from] FrameError),

    #[error("Sem resposta do dispositivo em {0} ms")]
    Timeout(u64),

    #[error("Comando recusado pelo dispositivo (código {0})")]
    Rejected(u16),

    #[error("Canal somente leitura")]
    ReadOnly,
}

/// Falha de inicialização: canal ou sessão.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Unable to create the interface: {0}")]
    Channel(#[from] ChannelError),

    #[error("Unable to initialize the sbgECom library: {0}")]
    Session(#[from] ProtocolError),
}

/// Falha do loop de polling.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0} erros consecutivos de polling")]
    PollErrors(u32),
}

/// Falha ao carregar ou salvar configuração.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro ao ler {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Erro ao parsear {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Erro ao serializar configuração: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Erro ao salvar {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuração inválida: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_error_keeps_vendor_wording() {
        let err = StartupError::from(ChannelError::InvalidBaud(0));
        assert_eq!(
            err.to_string(),
            "Unable to create the interface: Baud rate inválido: 0"
        );
    }

    #[test]
    fn invalid_config_lists_all_messages() {
        let err = ConfigError::Invalid(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Configuração inválida: a; b");
    }
}
