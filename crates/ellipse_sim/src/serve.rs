//! Dispositivo emulado respondendo em tempo real sobre um canal.

use crate::device::SimDevice;
use ellipse_core::protocol::FrameDecoder;
use ellipse_core::types::MAIN_LOOP_HZ;
use ellipse_core::{Channel, Message, ProtocolError, encode_frame};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const READ_CHUNK: usize = 512;

/// Contadores de uma sessão de serviço.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    pub ticks: u64,
    pub replies: u64,
    pub logs: u64,
}

pub struct Responder {
    device: SimDevice,
    decoder: FrameDecoder,
    read_buf: Vec<u8>,
}

impl Responder {
    pub fn new(device: SimDevice, max_frame_size: usize) -> Self {
        Self {
            device,
            decoder: FrameDecoder::new(max_frame_size),
            read_buf: vec![0u8; READ_CHUNK],
        }
    }

    pub fn device(&self) -> &SimDevice {
        &self.device
    }

    /// Lê o que chegou do host e responde cada comando completo.
    pub fn pump(&mut self, channel: &mut Channel) -> Result<u64, ProtocolError> {
        match channel.read(&mut self.read_buf) {
            Ok(n) => self.decoder.push(&self.read_buf[..n]),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => return Err(e.into()),
        }

        let mut replies = 0;
        loop {
            match self.decoder.next_frame() {
                Ok(Some(message)) => {
                    debug!("← {message:?}");
                    if let Some(reply) = self.device.handle(message) {
                        channel.write_all(&encode_frame(&reply)?)?;
                        replies += 1;
                    }
                }
                Ok(None) => break,
                Err(e) => warn!("Frame inválido do host: {e}"),
            }
        }

        if replies > 0 {
            channel.flush()?;
        }
        Ok(replies)
    }

    /// Avança um ciclo e envia os logs devidos.
    pub fn emit(&mut self, channel: &mut Channel) -> Result<u64, ProtocolError> {
        let mut sent = 0;
        for record in self.device.step() {
            channel.write_all(&encode_frame(&Message::Log(record))?)?;
            sent += 1;
        }
        if sent > 0 {
            channel.flush()?;
        }
        Ok(sent)
    }
}

/// Atende o host até `stop`, no ritmo do loop principal.
pub fn serve(
    mut channel: Channel,
    mut responder: Responder,
    stop: &AtomicBool,
) -> Result<ServeSummary, ProtocolError> {
    let interval = Duration::from_secs(1) / MAIN_LOOP_HZ;
    let mut summary = ServeSummary::default();
    info!(
        "{} atendendo em {} @ {MAIN_LOOP_HZ} Hz",
        responder.device().info().product_code,
        channel.name()
    );

    while !stop.load(Ordering::SeqCst) {
        let cycle_start = Instant::now();

        summary.replies += responder.pump(&mut channel)?;
        summary.logs += responder.emit(&mut channel)?;
        summary.ticks += 1;

        // Dormir pelo tempo restante do ciclo
        let elapsed = cycle_start.elapsed();
        if elapsed < interval {
            std::thread::sleep(interval - elapsed);
        }
    }

    info!(
        "Simulação encerrada: {} ciclos, {} respostas, {} logs",
        summary.ticks, summary.replies, summary.logs
    );
    Ok(summary)
}
