//! Movimento sintético do dispositivo simulado.
//!
//! Guinada lenta e contínua, rolagem e arfagem oscilando poucos graus. O
//! quaternion e a gravidade medida pelo IMU derivam dos mesmos ângulos.

use ellipse_core::types::{EulerLog, ImuLog, LogId, LogRecord, MAIN_LOOP_HZ, NavLog, QuatLog};
use std::f64::consts::{PI, TAU};

const GRAVITY: f64 = 9.81;

/// Velocidade de guinada (rad/s).
const YAW_RATE: f64 = 0.1;
const ROLL_AMPLITUDE: f64 = 0.05;
const ROLL_FREQ: f64 = 0.2;
const PITCH_AMPLITUDE: f64 = 0.03;
const PITCH_FREQ: f64 = 0.13;

/// Ponto de partida da trajetória (lat, lon em graus; alt em m).
const ORIGIN: [f64; 3] = [48.8566, 2.3522, 35.0];
const GROUND_SPEED: f64 = 1.5;
const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Status "solução válida" usado em todos os logs do EKF.
const EKF_STATUS: u32 = 0x0000_0037;
const IMU_STATUS: u16 = 0x00FF;

#[derive(Debug, Clone, Copy, Default)]
pub struct Motion;

impl Motion {
    /// Segundos desde o início para um tick do loop principal.
    pub fn seconds(tick: u64) -> f64 {
        tick as f64 / MAIN_LOOP_HZ as f64
    }

    /// Timestamp do dispositivo (µs), com wrap como no contador de 32 bits.
    pub fn time_stamp(tick: u64) -> u32 {
        (tick.wrapping_mul(1_000_000 / MAIN_LOOP_HZ as u64)) as u32
    }

    /// Roll, pitch, yaw (rad); yaw em [-π, π).
    pub fn euler(t: f64) -> [f64; 3] {
        let roll = ROLL_AMPLITUDE * (TAU * ROLL_FREQ * t).sin();
        let pitch = PITCH_AMPLITUDE * (TAU * PITCH_FREQ * t).sin();
        let yaw = (YAW_RATE * t + PI).rem_euclid(TAU) - PI;
        [roll, pitch, yaw]
    }

    /// Derivada dos ângulos, usada como leitura do giroscópio.
    fn rates(t: f64) -> [f64; 3] {
        let roll = ROLL_AMPLITUDE * TAU * ROLL_FREQ * (TAU * ROLL_FREQ * t).cos();
        let pitch = PITCH_AMPLITUDE * TAU * PITCH_FREQ * (TAU * PITCH_FREQ * t).cos();
        [roll, pitch, YAW_RATE]
    }

    /// Quaternion (w, x, y, z) da sequência ZYX.
    pub fn quaternion(euler: [f64; 3]) -> [f64; 4] {
        let [roll, pitch, yaw] = euler.map(|a| a / 2.0);
        let (sr, cr) = roll.sin_cos();
        let (sp, cp) = pitch.sin_cos();
        let (sy, cy) = yaw.sin_cos();
        [
            cr * cp * cy + sr * sp * sy,
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
        ]
    }

    /// Gravidade no referencial do corpo (NED, Z para baixo).
    fn gravity(euler: [f64; 3]) -> [f64; 3] {
        let [roll, pitch, _] = euler;
        [
            GRAVITY * pitch.sin(),
            -GRAVITY * roll.sin() * pitch.cos(),
            -GRAVITY * roll.cos() * pitch.cos(),
        ]
    }

    /// Gera o registro de `log` para o tick dado.
    pub fn record(&self, log: LogId, tick: u64) -> LogRecord {
        let t = Self::seconds(tick);
        let time_stamp = Self::time_stamp(tick);
        let euler = Self::euler(t);

        match log {
            LogId::EkfEuler => LogRecord::EkfEuler(EulerLog {
                time_stamp,
                euler: euler.map(|a| a as f32),
                euler_std_dev: [0.002, 0.002, 0.008],
                status: EKF_STATUS,
            }),
            LogId::EkfQuat => LogRecord::EkfQuat(QuatLog {
                time_stamp,
                quaternion: Self::quaternion(euler).map(|q| q as f32),
                euler_std_dev: [0.002, 0.002, 0.008],
                status: EKF_STATUS,
            }),
            LogId::ImuData => {
                let accelerometers = Self::gravity(euler).map(|a| a as f32);
                let gyroscopes = Self::rates(t).map(|w| w as f32);
                LogRecord::ImuData(ImuLog {
                    time_stamp,
                    status: IMU_STATUS,
                    accelerometers,
                    gyroscopes,
                    temperature: 25.0 + (t / 60.0).min(10.0) as f32,
                    delta_velocity: accelerometers,
                    delta_angle: gyroscopes,
                })
            }
            LogId::EkfNav => LogRecord::EkfNav(self.nav(t, time_stamp, euler[2])),
        }
    }

    /// Deslocamento em linha reta na direção da guinada.
    fn nav(&self, t: f64, time_stamp: u32, yaw: f64) -> NavLog {
        let north = GROUND_SPEED * yaw.cos();
        let east = GROUND_SPEED * yaw.sin();
        let distance = GROUND_SPEED * t;
        let lat = ORIGIN[0] + distance * yaw.cos() / METERS_PER_DEG_LAT;
        let lon = ORIGIN[1]
            + distance * yaw.sin() / (METERS_PER_DEG_LAT * ORIGIN[0].to_radians().cos());

        NavLog {
            time_stamp,
            velocity: [north as f32, east as f32, 0.0],
            velocity_std_dev: [0.05, 0.05, 0.1],
            position: [lat, lon, ORIGIN[2]],
            undulation: 44.5,
            position_std_dev: [1.2, 1.2, 2.5],
            status: EKF_STATUS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_advance_five_ms_per_tick() {
        assert_eq!(Motion::time_stamp(0), 0);
        assert_eq!(Motion::time_stamp(1), 5_000);
        assert_eq!(Motion::time_stamp(200), 1_000_000);
    }

    #[test]
    fn yaw_stays_wrapped() {
        for tick in (0..200 * 600).step_by(997) {
            let [_, _, yaw] = Motion::euler(Motion::seconds(tick));
            assert!((-PI..PI).contains(&yaw), "yaw {yaw}");
        }
    }

    #[test]
    fn quaternion_is_unit_and_matches_yaw() {
        let euler = [0.0, 0.0, 1.0];
        let q = Motion::quaternion(euler);
        let norm: f64 = q.iter().map(|c| c * c).sum();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!((q[0] - 0.5f64.cos()).abs() < 1e-12);
        assert!((q[3] - 0.5f64.sin()).abs() < 1e-12);

        let q = Motion::quaternion(Motion::euler(12.3));
        let norm: f64 = q.iter().map(|c| c * c).sum();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn level_imu_measures_gravity_on_z() {
        let LogRecord::ImuData(imu) = Motion.record(LogId::ImuData, 0) else {
            panic!("esperado IMU");
        };
        assert_eq!(imu.accelerometers[0], 0.0);
        assert!((imu.accelerometers[2] + GRAVITY as f32).abs() < 1e-4);
        assert_eq!(imu.gyroscopes[2], YAW_RATE as f32);
    }

    #[test]
    fn record_matches_requested_log() {
        for log in LogId::ALL {
            let record = Motion.record(log, 400);
            assert_eq!(record.log_id(), log);
            assert_eq!(record.time_stamp(), 2_000_000);
        }
    }

    #[test]
    fn nav_starts_at_origin() {
        let LogRecord::EkfNav(nav) = Motion.record(LogId::EkfNav, 0) else {
            panic!("esperado Nav");
        };
        assert_eq!(nav.position, ORIGIN);
        assert!((nav.velocity[0] - GROUND_SPEED as f32).abs() < 1e-6);
    }
}
