//! Sessão sobre o protocolo de link (bridge ou replay de captura).

use crate::channel::Channel;
use crate::config::SessionConfig;
use crate::error::ProtocolError;
use crate::protocol::{FrameDecoder, MAX_BODY_SIZE, Message, encode_frame};
use crate::session::{EcomSession, LogHandler, PollOutcome};
use crate::types::{DeviceInfo, LogClass, LogId, LogRecord, OutputConfig, OutputMode, OutputPort};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Tamanho de cada leitura do canal.
const READ_CHUNK: usize = 1024;

/// Espera entre leituras vazias enquanto aguarda resposta.
const REPLY_POLL: Duration = Duration::from_millis(1);

/// Máximo de logs retidos enquanto um comando aguarda resposta.
pub const MAX_PENDING: usize = 256;

pub struct LinkSession {
    channel: Channel,
    decoder: FrameDecoder,
    /// Logs que chegaram enquanto um comando aguardava resposta
    pending: VecDeque<LogRecord>,
    handler: Option<Box<dyn LogHandler>>,
    command_timeout: Duration,
    read_buf: Vec<u8>,
}

impl LinkSession {
    /// Vincula uma sessão ao canal. Em erro o canal é liberado.
    pub fn init(channel: Channel, config: &SessionConfig) -> Result<Self, ProtocolError> {
        if config.max_frame_size == 0 || config.max_frame_size > MAX_BODY_SIZE {
            return Err(ProtocolError::InvalidArgument(format!(
                "max_frame_size {} fora de 1–{MAX_BODY_SIZE}",
                config.max_frame_size
            )));
        }

        debug!(
            "Sessão de link em {} (timeout {} ms, frame máx. {} bytes)",
            channel.name(),
            config.command_timeout_ms,
            config.max_frame_size
        );

        Ok(Self {
            channel,
            decoder: FrameDecoder::new(config.max_frame_size),
            pending: VecDeque::new(),
            handler: None,
            command_timeout: Duration::from_millis(config.command_timeout_ms),
            read_buf: vec![0u8; READ_CHUNK],
        })
    }

    /// Bytes descartados pela ressincronização até agora.
    pub fn discarded_bytes(&self) -> u64 {
        self.decoder.discarded()
    }

    fn send(&mut self, message: &Message) -> Result<(), ProtocolError> {
        let frame = encode_frame(message)?;
        self.channel.write_all(&frame)?;
        self.channel.flush()?;
        Ok(())
    }

    /// Uma leitura do canal. `false` quando nada chegou (timeout ou EOF).
    fn fill(&mut self) -> Result<bool, ProtocolError> {
        match self.channel.read(&mut self.read_buf) {
            Ok(0) => Ok(false),
            Ok(n) => {
                self.decoder.push(&self.read_buf[..n]);
                Ok(true)
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Aguarda a resposta reconhecida por `extract`. Logs recebidos no
    /// meio do caminho vão para a fila de pendentes.
    ///
    /// O prazo vale mesmo com o dispositivo transmitindo sem parar.
    fn await_reply<T>(
        &mut self,
        mut extract: impl FnMut(&Message) -> Option<Result<T, ProtocolError>>,
    ) -> Result<T, ProtocolError> {
        let deadline = Instant::now() + self.command_timeout;

        loop {
            match self.decoder.next_frame() {
                Ok(Some(Message::Log(record))) => self.enqueue(record),
                Ok(Some(message)) => match extract(&message) {
                    Some(reply) => return reply,
                    None => debug!("Resposta atrasada ou inesperada ignorada: {message:?}"),
                },
                Ok(None) => {
                    if !self.fill()? {
                        std::thread::sleep(REPLY_POLL);
                    }
                }
                Err(e) => warn!("Frame inválido aguardando resposta: {e}"),
            }

            if Instant::now() >= deadline {
                return Err(ProtocolError::Timeout(
                    self.command_timeout.as_millis() as u64,
                ));
            }
        }
    }

    /// Guarda um log para o próximo `handle_once`, descartando o mais
    /// antigo quando a fila está cheia.
    fn enqueue(&mut self, record: LogRecord) {
        if self.pending.len() >= MAX_PENDING {
            if let Some(dropped) = self.pending.pop_front() {
                warn!(
                    "Fila de pendentes cheia ({MAX_PENDING}), {} descartado",
                    dropped.log_id()
                );
            }
        }
        self.pending.push_back(record);
    }

    /// Logs aguardando entrega.
    pub fn pending_logs(&self) -> usize {
        self.pending.len()
    }

    fn dispatch(&mut self, record: &LogRecord) {
        match self.handler.as_mut() {
            Some(handler) => handler.on_log(record),
            None => debug!("{} recebido sem callback", record.log_id()),
        }
    }

    fn consume(&mut self, message: Message) -> PollOutcome {
        match message {
            Message::Log(record) => self.dispatch(&record),
            other => debug!("Frame não solicitado ignorado: {other:?}"),
        }
        PollOutcome::Consumed
    }
}

impl EcomSession for LinkSession {
    fn device_info(&mut self) -> Result<DeviceInfo, ProtocolError> {
        // Numa captura a identificação já vem gravada no fluxo
        if self.channel.is_writable() {
            self.send(&Message::GetInfo)?;
        }

        self.await_reply(|message| match message {
            Message::Info(info) => Some(Ok(info.clone())),
            Message::Nack { log: None, code } => Some(Err(ProtocolError::Rejected(*code))),
            _ => None,
        })
    }

    fn set_output_conf(
        &mut self,
        port: OutputPort,
        class: LogClass,
        log: LogId,
        mode: OutputMode,
    ) -> Result<(), ProtocolError> {
        if !self.channel.is_writable() {
            return Err(ProtocolError::ReadOnly);
        }

        let conf = OutputConfig::new(port, class, log, mode);
        self.send(&Message::SetOutputConf(conf))?;

        // Respostas de comandos anteriores que expiraram não contam
        self.await_reply(|message| match message {
            Message::Ack(id) if *id == log => Some(Ok(())),
            Message::Nack { log: Some(id), code } if *id == log => {
                Some(Err(ProtocolError::Rejected(*code)))
            }
            _ => None,
        })
    }

    fn set_receive_callback(&mut self, handler: Box<dyn LogHandler>) {
        self.handler = Some(handler);
    }

    fn handle_once(&mut self) -> PollOutcome {
        if let Some(record) = self.pending.pop_front() {
            self.dispatch(&record);
            return PollOutcome::Consumed;
        }

        match self.decoder.next_frame() {
            Ok(Some(message)) => return self.consume(message),
            Ok(None) => {}
            Err(e) => return PollOutcome::Error(e.into()),
        }

        match self.fill() {
            Ok(false) => PollOutcome::NotReady,
            Ok(true) => match self.decoder.next_frame() {
                Ok(Some(message)) => self.consume(message),
                Ok(None) => PollOutcome::NotReady,
                Err(e) => PollOutcome::Error(e.into()),
            },
            Err(e) => PollOutcome::Error(e),
        }
    }

    fn close(self) -> Channel {
        debug!(
            "Sessão encerrada ({} logs pendentes descartados)",
            self.pending.len()
        );
        self.channel
    }
}
