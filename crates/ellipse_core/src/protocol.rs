//! Protocolo de link binário.
//!
//! Encapsulamento próprio usado entre o cliente e uma bridge (ou uma
//! captura gravada pelo simulador). Não é o formato do sbgECom.
//! Formato do frame:
//!
//! ```text
//! ┌──────────┬─────────┬────────────┬──────────────┐
//! │ Magic(1) │ Ver.(1) │ Len(2, LE) │ Payload (N)  │
//! └──────────┴─────────┴────────────┴──────────────┘
//! ```
//!
//! - Magic byte `0x45` ('E') marca o início do frame
//! - Versão do protocolo (1 byte)
//! - Tamanho do payload em little endian
//! - Payload é uma [`Message`] serializada com bincode

use crate::types::{DeviceInfo, LogId, LogRecord, OutputConfig};
use serde::{Deserialize, Serialize};

/// Magic byte que identifica o início de um frame.
pub const MAGIC_BYTE: u8 = 0x45; // 'E'

/// Versão atual do protocolo.
pub const PROTOCOL_VERSION: u8 = 1;

/// Tamanho do header (magic + version + len).
pub const HEADER_SIZE: usize = 4;

/// Maior payload representável no campo de tamanho.
pub const MAX_BODY_SIZE: usize = u16::MAX as usize;

/// Mensagens trocadas no link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Message {
    /// Host → dispositivo: pede identificação
    GetInfo,
    /// Dispositivo → host
    Info(DeviceInfo),
    /// Host → dispositivo: configura uma saída
    SetOutputConf(OutputConfig),
    /// Saída configurada; ecoa o log do comando
    Ack(LogId),
    /// Comando recusado, com código de erro do dispositivo. `log` ecoa o
    /// `SetOutputConf` recusado e é `None` para `GetInfo`.
    Nack { log: Option<LogId>, code: u16 },
    /// Dispositivo → host: log periódico
    Log(LogRecord),
}

/// Erros do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Versão incompatível: {0} (suportada: {PROTOCOL_VERSION})")]
    VersionMismatch(u8),

    #[error("Frame muito grande ({0} bytes, máximo {1})")]
    TooLarge(usize, usize),

    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("Erro de deserialização: {0}")]
    Deserialize(String),
}

/// Codifica uma [`Message`] para transmissão.
///
/// Retorna bytes no formato: `[MAGIC][VERSION][LEN_LO][LEN_HI][bincode...]`
pub fn encode_frame(message: &Message) -> Result<Vec<u8>, FrameError> {
    let body = bincode::serialize(message).map_err(|e| FrameError::Serialize(e.to_string()))?;
    if body.len() > MAX_BODY_SIZE {
        return Err(FrameError::TooLarge(body.len(), MAX_BODY_SIZE));
    }

    let mut frame = Vec::with_capacity(HEADER_SIZE + body.len());
    frame.push(MAGIC_BYTE);
    frame.push(PROTOCOL_VERSION);
    frame.extend_from_slice(&(body.len() as u16).to_le_bytes());
    frame.extend_from_slice(&body);

    Ok(frame)
}

/// Remonta frames a partir de um fluxo de bytes.
///
/// Bytes fora de frame são descartados até o próximo magic byte.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    max_body: usize,
    discarded: u64,
}

impl FrameDecoder {
    pub fn new(max_body: usize) -> Self {
        let max_body = max_body.min(MAX_BODY_SIZE);
        Self {
            buf: Vec::with_capacity(HEADER_SIZE + max_body),
            max_body,
            discarded: 0,
        }
    }

    /// Acrescenta bytes recebidos ao buffer.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Extrai o próximo frame completo, se houver.
    ///
    /// Em erro o byte de início é descartado, de forma que a próxima
    /// chamada continua a partir do frame seguinte.
    pub fn next_frame(&mut self) -> Result<Option<Message>, FrameError> {
        match self.buf.iter().position(|&b| b == MAGIC_BYTE) {
            Some(0) => {}
            Some(n) => self.discard(n),
            None => {
                let n = self.buf.len();
                self.discard(n);
                return Ok(None);
            }
        }

        if self.buf.len() < HEADER_SIZE {
            return Ok(None);
        }

        let version = self.buf[1];
        if version != PROTOCOL_VERSION {
            self.discard(1);
            return Err(FrameError::VersionMismatch(version));
        }

        let len = u16::from_le_bytes([self.buf[2], self.buf[3]]) as usize;
        if len > self.max_body {
            self.discard(1);
            return Err(FrameError::TooLarge(len, self.max_body));
        }

        if self.buf.len() < HEADER_SIZE + len {
            return Ok(None);
        }

        let frame: Vec<u8> = self.buf.drain(..HEADER_SIZE + len).collect();
        bincode::deserialize(&frame[HEADER_SIZE..])
            .map(Some)
            .map_err(|e| FrameError::Deserialize(e.to_string()))
    }

    /// Total de bytes descartados na ressincronização.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Bytes aguardando um frame completo.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    fn discard(&mut self, n: usize) {
        self.buf.drain(..n);
        self.discarded += n as u64;
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;

    fn euler_message() -> Message {
        Message::Log(LogRecord::EkfEuler(EulerLog {
            time_stamp: 1_000,
            euler: [0.1, -0.2, 3.0],
            euler_std_dev: [0.01, 0.01, 0.05],
            status: 0x0F,
        }))
    }

    #[test]
    fn header_is_correct() {
        let frame = encode_frame(&Message::GetInfo).unwrap();
        assert_eq!(frame[0], MAGIC_BYTE);
        assert_eq!(frame[1], PROTOCOL_VERSION);
        let len = u16::from_le_bytes([frame[2], frame[3]]) as usize;
        assert_eq!(frame.len(), HEADER_SIZE + len);
    }

    #[test]
    fn decodes_frame_split_across_reads() {
        let frame = encode_frame(&euler_message()).unwrap();
        let (head, tail) = frame.split_at(3);

        let mut decoder = FrameDecoder::new(512);
        decoder.push(head);
        assert!(decoder.next_frame().unwrap().is_none());
        decoder.push(tail);
        assert_eq!(decoder.next_frame().unwrap(), Some(euler_message()));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn resyncs_over_garbage() {
        let mut decoder = FrameDecoder::new(512);
        decoder.push(&[0x00, 0xFF, 0x13]);
        decoder.push(&encode_frame(&Message::Ack(LogId::EkfEuler)).unwrap());

        assert_eq!(decoder.next_frame().unwrap(), Some(Message::Ack(LogId::EkfEuler)));
        assert_eq!(decoder.discarded(), 3);
    }

    #[test]
    fn rejects_wrong_version_then_recovers() {
        let mut bad = encode_frame(&Message::Ack(LogId::EkfEuler)).unwrap();
        bad[1] = 99;
        let mut decoder = FrameDecoder::new(512);
        decoder.push(&bad);
        decoder.push(&encode_frame(&Message::GetInfo).unwrap());

        assert!(matches!(
            decoder.next_frame(),
            Err(FrameError::VersionMismatch(99))
        ));
        assert_eq!(decoder.next_frame().unwrap(), Some(Message::GetInfo));
    }

    #[test]
    fn rejects_oversized_length() {
        let mut decoder = FrameDecoder::new(16);
        decoder.push(&[MAGIC_BYTE, PROTOCOL_VERSION, 0xFF, 0x00]);
        assert!(matches!(
            decoder.next_frame(),
            Err(FrameError::TooLarge(255, 16))
        ));
    }

    #[test]
    fn malformed_body_is_consumed() {
        let mut decoder = FrameDecoder::new(512);
        decoder.push(&[MAGIC_BYTE, PROTOCOL_VERSION, 0x01, 0x00, 0xEE]);
        decoder.push(&encode_frame(&Message::Ack(LogId::EkfEuler)).unwrap());

        assert!(matches!(
            decoder.next_frame(),
            Err(FrameError::Deserialize(_))
        ));
        assert_eq!(decoder.next_frame().unwrap(), Some(Message::Ack(LogId::EkfEuler)));
    }

    #[test]
    fn oversized_limit_is_clamped_to_length_field() {
        let mut decoder = FrameDecoder::new(usize::MAX);
        decoder.push(&[MAGIC_BYTE, PROTOCOL_VERSION, 0xFF, 0xFF]);
        assert!(decoder.next_frame().unwrap().is_none());
        assert_eq!(decoder.buffered(), HEADER_SIZE);
    }

    #[test]
    fn replies_carry_the_configured_log() {
        let nack = Message::Nack {
            log: Some(LogId::ImuData),
            code: 4,
        };
        let mut decoder = FrameDecoder::new(512);
        decoder.push(&encode_frame(&nack).unwrap());
        assert_eq!(decoder.next_frame().unwrap(), Some(nack));
    }

    #[test]
    fn log_frame_is_compact() {
        let frame = encode_frame(&euler_message()).unwrap();
        assert!(frame.len() < 64, "frame Euler com {} bytes", frame.len());
    }
}
