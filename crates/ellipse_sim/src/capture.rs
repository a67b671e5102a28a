//! Gravação de capturas para replay.

use crate::device::SimDevice;
use ellipse_core::{Message, ProtocolError, encode_frame};
use std::io::Write;

/// Escreve o `Info` e `ticks` ciclos do loop principal, sem esperar o
/// tempo real. Retorna quantos logs foram gravados.
pub fn write_capture<W: Write>(
    out: &mut W,
    device: &mut SimDevice,
    ticks: u64,
) -> Result<u64, ProtocolError> {
    out.write_all(&encode_frame(&Message::Info(device.info().clone()))?)?;

    let mut written = 0;
    for _ in 0..ticks {
        for record in device.step() {
            out.write_all(&encode_frame(&Message::Log(record))?)?;
            written += 1;
        }
    }

    out.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ellipse_core::config::{SimConfig, default_outputs};
    use ellipse_core::protocol::FrameDecoder;
    use ellipse_core::types::MAIN_LOOP_HZ;

    fn configured_device() -> SimDevice {
        let mut device = SimDevice::new(&SimConfig::default());
        for output in default_outputs() {
            device.configure(&output);
        }
        device
    }

    #[test]
    fn one_second_of_defaults_holds_fifty_logs() {
        let mut device = configured_device();
        let mut bytes = Vec::new();
        let written = write_capture(&mut bytes, &mut device, MAIN_LOOP_HZ as u64).unwrap();
        // IMU e Euler a 25 Hz cada
        assert_eq!(written, 50);

        let mut decoder = FrameDecoder::new(512);
        decoder.push(&bytes);
        let Some(Message::Info(info)) = decoder.next_frame().unwrap() else {
            panic!("captura deve começar com Info");
        };
        assert_eq!(info.serial_number, 123_456_789);

        let mut logs = 0;
        while let Some(message) = decoder.next_frame().unwrap() {
            assert!(matches!(message, Message::Log(_)));
            logs += 1;
        }
        assert_eq!(logs, 50);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn capture_file_replays_through_link_session() {
        use ellipse_core::config::{ClientConfig, SessionConfig};
        use ellipse_core::{Channel, LinkSession, LogRecord, TelemetryClient};
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.bin");
        let mut channel = Channel::create_file(&path).unwrap();
        write_capture(&mut channel, &mut configured_device(), 40).unwrap();
        drop(channel);

        let mut client = TelemetryClient::start(
            || Channel::open_file(&path),
            |ch| LinkSession::init(ch, &SessionConfig::default()),
            &ClientConfig {
                idle_sleep_ms: 0,
                ..ClientConfig::default()
            },
        )
        .unwrap();
        assert_eq!(client.query_device_info().unwrap().serial_number, 123_456_789);

        // 40 ticks com divisor 8: 5 IMU + 5 Euler
        let stop = Arc::new(AtomicBool::new(false));
        let count = Arc::new(AtomicU32::new(0));
        let (flag, counter) = (Arc::clone(&stop), Arc::clone(&count));
        client.register_callback(move |_: &LogRecord| {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 == 10 {
                flag.store(true, Ordering::SeqCst);
            }
        });

        let summary = client.run(&stop).unwrap();
        assert_eq!(summary.consumed, 10);
        client.shutdown();
    }
}
