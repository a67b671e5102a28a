//! Superfície da sessão de protocolo.
//!
//! O cliente só conhece este trait; a pilha de protocolo (sbgECom, bridge
//! de link, ou um fake em testes) fica atrás dele.

use crate::channel::Channel;
use crate::error::ProtocolError;
use crate::types::{DeviceInfo, LogClass, LogId, LogRecord, OutputMode, OutputPort};

/// Recebe cada log decodificado, na mesma thread que faz o polling.
pub trait LogHandler {
    fn on_log(&mut self, record: &LogRecord);
}

impl<F: FnMut(&LogRecord)> LogHandler for F {
    fn on_log(&mut self, record: &LogRecord) {
        self(record)
    }
}

/// Resultado de uma unidade de processamento de recepção.
#[derive(Debug)]
pub enum PollOutcome {
    /// Um frame foi consumido (e entregue ao callback, se for log)
    Consumed,
    /// Nenhum frame completo disponível; o chamador deve ceder a CPU
    NotReady,
    Error(ProtocolError),
}

impl PollOutcome {
    pub fn is_not_ready(&self) -> bool {
        matches!(self, PollOutcome::NotReady)
    }
}

/// Sessão de protocolo vinculada 1:1 a um [`Channel`].
///
/// A sessão é dona do canal enquanto existir; [`EcomSession::close`]
/// devolve o canal, que então pode ser fechado.
pub trait EcomSession {
    /// Pede a identificação do dispositivo (request/response síncrono).
    fn device_info(&mut self) -> Result<DeviceInfo, ProtocolError>;

    /// Configura a emissão periódica de um log.
    fn set_output_conf(
        &mut self,
        port: OutputPort,
        class: LogClass,
        log: LogId,
        mode: OutputMode,
    ) -> Result<(), ProtocolError>;

    /// Instala o callback de recepção, substituindo o anterior.
    fn set_receive_callback(&mut self, handler: Box<dyn LogHandler>);

    /// Processa no máximo um frame.
    fn handle_once(&mut self) -> PollOutcome;

    /// Encerra a sessão e devolve o canal.
    fn close(self) -> Channel
    where
        Self: Sized;
}
