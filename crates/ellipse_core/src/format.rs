//! Formatação dos logs para o console.
//!
//! Cada tipo de log tem uma linha de formato fixo: um rótulo, quebra de
//! linha e os campos. Ângulos de Euler (e seus desvios) saem em graus.

use crate::session::LogHandler;
use crate::types::{DeviceInfo, EulerLog, ImuLog, LogRecord, NavLog, QuatLog};
use std::f64::consts::PI;
use std::io::Write;
use tracing::debug;

/// Cabeçalho impresso depois da configuração das saídas.
pub const READY_BANNER: &str =
    "sbgECom properly Initialized.\n\nEuler Angles display with estimated standard deviation.";

pub fn to_degrees(radians: f32) -> f64 {
    radians as f64 * 180.0 / PI
}

pub fn device_line(info: &DeviceInfo) -> String {
    format!("Device : {:09} found", info.serial_number)
}

pub fn euler_line(log: &EulerLog) -> String {
    let [roll, pitch, yaw] = log.euler.map(to_degrees);
    let [sr, sp, sy] = log.euler_std_dev.map(to_degrees);
    format!(
        "Euler Angles:\n      {roll:3.1}\t{pitch:3.1}\t{yaw:3.1}\tStd Dev:{sr:3.1}\t{sp:3.1}\t{sy:3.1}"
    )
}

pub fn nav_line(log: &NavLog) -> String {
    let v = log.velocity;
    let vs = log.velocity_std_dev;
    let p = log.position;
    let ps = log.position_std_dev;
    format!(
        "Nav:\n      {},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{}",
        log.time_stamp,
        v[0],
        v[1],
        v[2],
        vs[0],
        vs[1],
        vs[2],
        p[0],
        p[1],
        p[2],
        log.undulation,
        ps[0],
        ps[1],
        ps[2],
        log.status
    )
}

pub fn quat_line(log: &QuatLog) -> String {
    let q = log.quaternion;
    format!(
        "Quat:\n       {},{:.6},{:.6},{:.6},{:.6},{}",
        log.time_stamp, q[0], q[1], q[2], q[3], log.status
    )
}

pub fn imu_line(log: &ImuLog) -> String {
    let a = log.accelerometers;
    let g = log.gyroscopes;
    let dv = log.delta_velocity;
    let da = log.delta_angle;
    format!(
        "IMU:\n       {},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
        log.time_stamp,
        log.status,
        a[0],
        a[1],
        a[2],
        g[0],
        g[1],
        g[2],
        log.temperature,
        dv[0],
        dv[1],
        dv[2],
        da[0],
        da[1],
        da[2]
    )
}

pub fn record_line(record: &LogRecord) -> String {
    match record {
        LogRecord::EkfEuler(log) => euler_line(log),
        LogRecord::EkfNav(log) => nav_line(log),
        LogRecord::EkfQuat(log) => quat_line(log),
        LogRecord::ImuData(log) => imu_line(log),
    }
}

/// Handler que escreve cada log recebido em `out` (normalmente stdout).
pub struct ConsolePrinter<W: Write> {
    out: W,
}

impl<W: Write> ConsolePrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> LogHandler for ConsolePrinter<W> {
    fn on_log(&mut self, record: &LogRecord) {
        if let Err(e) = writeln!(self.out, "{}", record_line(record)) {
            debug!("Falha ao escrever {}: {e}", record.log_id());
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
