//! Estado do dispositivo emulado: identificação, saídas habilitadas e
//! relógio do loop principal.

use crate::motion::Motion;
use ellipse_core::config::SimConfig;
use ellipse_core::types::{DeviceInfo, LogId, LogRecord, OutputConfig, OutputMode};
use ellipse_core::Message;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Código devolvido no `Nack` de uma saída recusada.
pub const NACK_REJECTED: u16 = 0x0004;

pub struct SimDevice {
    info: DeviceInfo,
    outputs: HashMap<LogId, OutputMode>,
    reject: Vec<LogId>,
    motion: Motion,
    tick: u64,
}

impl SimDevice {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            info: DeviceInfo {
                product_code: config.product_code.clone(),
                serial_number: config.serial_number,
                firmware_version: config.firmware_version.clone(),
            },
            outputs: HashMap::new(),
            reject: config.reject_logs.clone(),
            motion: Motion,
            tick: 0,
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Aplica uma configuração de saída. `false` se o log é recusado.
    pub fn configure(&mut self, output: &OutputConfig) -> bool {
        if self.reject.contains(&output.log) {
            warn!("Configuração de {} recusada", output.log);
            return false;
        }

        match output.mode {
            OutputMode::Disabled => {
                self.outputs.remove(&output.log);
                info!("{} desabilitado", output.log);
            }
            mode => {
                self.outputs.insert(output.log, mode);
                info!("{} habilitado ({mode:?})", output.log);
            }
        }
        true
    }

    /// Responde a um comando do host. `None` para mensagens que não são
    /// comandos.
    pub fn handle(&mut self, message: Message) -> Option<Message> {
        match message {
            Message::GetInfo => Some(Message::Info(self.info.clone())),
            Message::SetOutputConf(output) => Some(if self.configure(&output) {
                Message::Ack(output.log)
            } else {
                Message::Nack {
                    log: Some(output.log),
                    code: NACK_REJECTED,
                }
            }),
            other => {
                debug!("Mensagem ignorada: {other:?}");
                None
            }
        }
    }

    /// Avança um ciclo do loop principal e devolve os logs devidos nele.
    pub fn step(&mut self) -> Vec<LogRecord> {
        let tick = self.tick;
        let records = LogId::ALL
            .into_iter()
            .filter(|log| match self.outputs.get(log) {
                Some(OutputMode::NewData) => true,
                Some(mode) => mode.divider().is_some_and(|d| tick % d as u64 == 0),
                None => false,
            })
            .map(|log| self.motion.record(log, tick))
            .collect();

        self.tick += 1;
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ellipse_core::config::default_outputs;
    use ellipse_core::types::{LogClass, OutputPort};

    fn output(log: LogId, mode: OutputMode) -> OutputConfig {
        OutputConfig::new(OutputPort::A, LogClass::Ecom0, log, mode)
    }

    #[test]
    fn answers_get_info_with_configured_identity() {
        let mut device = SimDevice::new(&SimConfig::default());
        let Some(Message::Info(info)) = device.handle(Message::GetInfo) else {
            panic!("esperado Info");
        };
        assert_eq!(info.serial_number, 123_456_789);
        assert_eq!(&info, device.info());
    }

    #[test]
    fn rejected_log_is_nacked_and_others_acked() {
        let config = SimConfig {
            reject_logs: vec![LogId::ImuData],
            ..SimConfig::default()
        };
        let mut device = SimDevice::new(&config);

        let replies: Vec<_> = default_outputs()
            .into_iter()
            .map(|o| device.handle(Message::SetOutputConf(o)))
            .collect();
        assert_eq!(
            replies,
            vec![
                Some(Message::Nack {
                    log: Some(LogId::ImuData),
                    code: NACK_REJECTED
                }),
                Some(Message::Ack(LogId::EkfEuler))
            ]
        );
    }

    #[test]
    fn nothing_is_emitted_until_configured() {
        let mut device = SimDevice::new(&SimConfig::default());
        assert!((0..50).all(|_| device.step().is_empty()));
        assert_eq!(device.tick(), 50);
    }

    #[test]
    fn dividers_set_emission_rate() {
        let mut device = SimDevice::new(&SimConfig::default());
        device.configure(&output(LogId::EkfEuler, OutputMode::Div8));
        device.configure(&output(LogId::ImuData, OutputMode::MainLoop));

        let mut counts = HashMap::new();
        for _ in 0..200 {
            for record in device.step() {
                *counts.entry(record.log_id()).or_insert(0) += 1;
            }
        }
        assert_eq!(counts[&LogId::EkfEuler], 25);
        assert_eq!(counts[&LogId::ImuData], 200);
        assert!(!counts.contains_key(&LogId::EkfNav));
    }

    #[test]
    fn disabling_stops_emission() {
        let mut device = SimDevice::new(&SimConfig::default());
        device.configure(&output(LogId::EkfQuat, OutputMode::NewData));
        assert_eq!(device.step().len(), 1);

        device.configure(&output(LogId::EkfQuat, OutputMode::Disabled));
        assert!(device.step().is_empty());
    }

    #[test]
    fn non_commands_get_no_reply() {
        let mut device = SimDevice::new(&SimConfig::default());
        assert_eq!(device.handle(Message::Ack(LogId::ImuData)), None);
    }
}
