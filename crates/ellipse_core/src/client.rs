//! Ciclo de vida do cliente de telemetria.
//!
//! ```text
//! Closed → ChannelOpen → SessionReady → Polling → ShuttingDown → Closed
//!              │
//!              └─ falha na sessão → ShuttingDown (canal liberado) → Closed
//! ```
//!
//! A sessão é dona do canal, então a ordem de liberação (sessão antes do
//! canal) vale tanto no [`TelemetryClient::shutdown`] quanto no `Drop`.

use crate::channel::Channel;
use crate::config::ClientConfig;
use crate::error::{ChannelError, ClientError, ProtocolError, StartupError};
use crate::session::{EcomSession, LogHandler, PollOutcome};
use crate::types::{DeviceInfo, LogId, OutputConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Estado do cliente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Closed,
    ChannelOpen,
    SessionReady,
    Polling,
    ShuttingDown,
}

/// Contadores de uma execução do loop de polling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub consumed: u64,
    pub idle: u64,
    pub errors: u64,
}

/// Resultado da configuração das saídas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigureReport {
    pub applied: Vec<LogId>,
    pub failed: Vec<LogId>,
}

impl ConfigureReport {
    pub fn attempted(&self) -> usize {
        self.applied.len() + self.failed.len()
    }
}

pub struct TelemetryClient<S: EcomSession> {
    session: S,
    state: ClientState,
    idle_sleep: Duration,
    max_consecutive_errors: u32,
}

impl<S: EcomSession> TelemetryClient<S> {
    /// Abre o canal e vincula a sessão.
    ///
    /// Se `open` falhar nenhuma sessão é criada. Se `init` falhar o canal
    /// já foi consumido e liberado por ela.
    pub fn start<O, I>(open: O, init: I, config: &ClientConfig) -> Result<Self, StartupError>
    where
        O: FnOnce() -> Result<Channel, ChannelError>,
        I: FnOnce(Channel) -> Result<S, ProtocolError>,
    {
        let channel = open()?;
        let name = channel.name().to_string();
        debug!("{:?}: {name}", ClientState::ChannelOpen);

        let session = match init(channel) {
            Ok(session) => session,
            Err(e) => {
                debug!("{:?}: canal {name} liberado", ClientState::ShuttingDown);
                return Err(e.into());
            }
        };

        info!("Sessão pronta em {name}");
        Ok(Self {
            session,
            state: ClientState::SessionReady,
            idle_sleep: Duration::from_millis(config.idle_sleep_ms),
            max_consecutive_errors: config.max_consecutive_poll_errors,
        })
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Pede a identificação do dispositivo. Falha não é fatal.
    pub fn query_device_info(&mut self) -> Result<DeviceInfo, ProtocolError> {
        let result = self.session.device_info();
        match &result {
            Ok(info) => debug!(
                "Dispositivo {} (firmware {}), série {}",
                info.product_code, info.firmware_version, info.serial_number
            ),
            Err(e) => warn!("Unable to get device information: {e}"),
        }
        result
    }

    /// Configura uma saída. Falha não é fatal.
    pub fn configure_output(&mut self, output: &OutputConfig) -> Result<(), ProtocolError> {
        let result =
            self.session
                .set_output_conf(output.port, output.class, output.log, output.mode);
        match &result {
            Ok(()) => info!(
                "{} habilitado na porta {:?} ({:?})",
                output.log, output.port, output.mode
            ),
            Err(e) => warn!("Unable to configure output log {}: {e}", output.log),
        }
        result
    }

    /// Tenta todas as saídas, independentemente de falhas individuais.
    pub fn configure_outputs(&mut self, outputs: &[OutputConfig]) -> ConfigureReport {
        let mut report = ConfigureReport::default();
        for output in outputs {
            match self.configure_output(output) {
                Ok(()) => report.applied.push(output.log),
                Err(_) => report.failed.push(output.log),
            }
        }
        report
    }

    /// Instala o handler chamado a cada log decodificado.
    pub fn register_callback(&mut self, handler: impl LogHandler + 'static) {
        self.session.set_receive_callback(Box::new(handler));
    }

    /// Uma unidade de processamento de recepção.
    pub fn poll_once(&mut self) -> PollOutcome {
        self.state = ClientState::Polling;
        self.session.handle_once()
    }

    /// Faz polling até `stop` ser sinalizado.
    ///
    /// `NotReady` cede a CPU por `idle_sleep`. Erros são registrados e só
    /// encerram o loop quando `max_consecutive_poll_errors` > 0.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<RunSummary, ClientError> {
        let mut summary = RunSummary::default();
        let mut consecutive = 0u32;

        while !stop.load(Ordering::SeqCst) {
            match self.poll_once() {
                PollOutcome::Consumed => {
                    summary.consumed += 1;
                    consecutive = 0;
                }
                PollOutcome::NotReady => {
                    summary.idle += 1;
                    consecutive = 0;
                    std::thread::sleep(self.idle_sleep);
                }
                PollOutcome::Error(e) => {
                    summary.errors += 1;
                    consecutive += 1;
                    error!("Erro de polling: {e}");

                    if self.max_consecutive_errors > 0 && consecutive >= self.max_consecutive_errors
                    {
                        self.state = ClientState::SessionReady;
                        return Err(ClientError::PollErrors(consecutive));
                    }
                }
            }
        }

        self.state = ClientState::SessionReady;
        info!(
            "Polling encerrado: {} frames, {} ociosos, {} erros",
            summary.consumed, summary.idle, summary.errors
        );
        Ok(summary)
    }

    /// Libera a sessão e depois o canal.
    pub fn shutdown(self) {
        debug!("{:?}", ClientState::ShuttingDown);
        let channel = self.session.close();
        let name = channel.name().to_string();
        drop(channel);
        info!("{:?}: {name} liberado", ClientState::Closed);
    }
}
