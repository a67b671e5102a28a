//! Definição de tipos para telemetria do Ellipse.
//!
//! Os campos seguem as estruturas de log binário do sbgECom (EKF Euler,
//! EKF Nav, EKF Quat e IMU Data). Ângulos ficam em radianos; a conversão
//! para graus é responsabilidade de [`crate::format`].

use serde::{Deserialize, Serialize};
use std::fmt;

// ──────────────────────────────────────────────
// Identificação do dispositivo
// ──────────────────────────────────────────────

/// Informações retornadas pelo comando de identificação.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Código do produto (ex: "ELLIPSE2-N-G4A2-B1")
    pub product_code: String,
    /// Número de série
    pub serial_number: u32,
    /// Versão do firmware (ex: "2.6.0")
    pub firmware_version: String,
}

// ──────────────────────────────────────────────
// Configuração de saída
// ──────────────────────────────────────────────

/// Porta de saída do dispositivo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputPort {
    A,
    B,
    C,
    D,
    E,
}

impl OutputPort {
    pub fn to_u8(self) -> u8 {
        match self {
            OutputPort::A => 0,
            OutputPort::B => 1,
            OutputPort::C => 2,
            OutputPort::D => 3,
            OutputPort::E => 4,
        }
    }
}

/// Classe de mensagens de log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogClass {
    Ecom0,
    Ecom1,
}

/// Identificador de log binário suportado por este cliente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogId {
    ImuData,
    EkfEuler,
    EkfQuat,
    EkfNav,
}

impl LogId {
    pub const ALL: [LogId; 4] = [LogId::ImuData, LogId::EkfEuler, LogId::EkfQuat, LogId::EkfNav];

    pub fn to_u8(self) -> u8 {
        match self {
            LogId::ImuData => 3,
            LogId::EkfEuler => 6,
            LogId::EkfQuat => 7,
            LogId::EkfNav => 8,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            3 => Some(LogId::ImuData),
            6 => Some(LogId::EkfEuler),
            7 => Some(LogId::EkfQuat),
            8 => Some(LogId::EkfNav),
            _ => None,
        }
    }

    /// Nome usado pelo fabricante, para mensagens de log.
    pub fn vendor_name(self) -> &'static str {
        match self {
            LogId::ImuData => "SBG_ECOM_LOG_IMU_DATA",
            LogId::EkfEuler => "SBG_ECOM_LOG_EKF_EULER",
            LogId::EkfQuat => "SBG_ECOM_LOG_EKF_QUAT",
            LogId::EkfNav => "SBG_ECOM_LOG_EKF_NAV",
        }
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.vendor_name())
    }
}

/// Frequência do loop principal do dispositivo (Hz).
pub const MAIN_LOOP_HZ: u32 = 200;

/// Modo de saída: divisor aplicado ao loop principal de 200 Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Disabled,
    MainLoop,
    Div2,
    Div4,
    Div5,
    Div8,
    Div10,
    Div20,
    Div40,
    Div200,
    /// Emite sempre que houver dado novo
    NewData,
}

impl OutputMode {
    /// Divisor do loop principal, `None` para modos sem taxa fixa.
    pub fn divider(self) -> Option<u32> {
        match self {
            OutputMode::MainLoop => Some(1),
            OutputMode::Div2 => Some(2),
            OutputMode::Div4 => Some(4),
            OutputMode::Div5 => Some(5),
            OutputMode::Div8 => Some(8),
            OutputMode::Div10 => Some(10),
            OutputMode::Div20 => Some(20),
            OutputMode::Div40 => Some(40),
            OutputMode::Div200 => Some(200),
            OutputMode::Disabled | OutputMode::NewData => None,
        }
    }

    /// Taxa de saída resultante (Hz).
    pub fn rate_hz(self) -> Option<f32> {
        self.divider().map(|d| MAIN_LOOP_HZ as f32 / d as f32)
    }
}

/// Uma entrada de configuração de saída (porta, classe, log, modo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub port: OutputPort,
    pub class: LogClass,
    pub log: LogId,
    pub mode: OutputMode,
}

impl OutputConfig {
    pub fn new(port: OutputPort, class: LogClass, log: LogId, mode: OutputMode) -> Self {
        Self {
            port,
            class,
            log,
            mode,
        }
    }
}

// ──────────────────────────────────────────────
// Logs
// ──────────────────────────────────────────────

/// Ângulos de Euler estimados pelo EKF.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct EulerLog {
    /// Tempo desde o boot (µs)
    pub time_stamp: u32,
    /// Roll, pitch, yaw (rad)
    pub euler: [f32; 3],
    /// Desvio padrão de roll, pitch, yaw (rad)
    pub euler_std_dev: [f32; 3],
    pub status: u32,
}

/// Solução de navegação do EKF.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct NavLog {
    pub time_stamp: u32,
    /// Velocidade norte, leste, baixo (m/s)
    pub velocity: [f32; 3],
    pub velocity_std_dev: [f32; 3],
    /// Latitude (°), longitude (°), altitude (m)
    pub position: [f64; 3],
    /// Ondulação do geoide (m)
    pub undulation: f32,
    /// Desvio padrão de latitude, longitude, altitude (m)
    pub position_std_dev: [f32; 3],
    pub status: u32,
}

/// Orientação do EKF como quatérnio (W, X, Y, Z).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct QuatLog {
    pub time_stamp: u32,
    pub quaternion: [f32; 4],
    pub euler_std_dev: [f32; 3],
    pub status: u32,
}

/// Amostra bruta da IMU.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ImuLog {
    pub time_stamp: u32,
    pub status: u16,
    /// Aceleração X, Y, Z (m/s²)
    pub accelerometers: [f32; 3],
    /// Velocidade angular X, Y, Z (rad/s)
    pub gyroscopes: [f32; 3],
    /// Temperatura interna (°C)
    pub temperature: f32,
    pub delta_velocity: [f32; 3],
    pub delta_angle: [f32; 3],
}

/// Um log decodificado entregue ao callback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum LogRecord {
    EkfEuler(EulerLog),
    EkfNav(NavLog),
    EkfQuat(QuatLog),
    ImuData(ImuLog),
}

impl LogRecord {
    pub fn log_id(&self) -> LogId {
        match self {
            LogRecord::EkfEuler(_) => LogId::EkfEuler,
            LogRecord::EkfNav(_) => LogId::EkfNav,
            LogRecord::EkfQuat(_) => LogId::EkfQuat,
            LogRecord::ImuData(_) => LogId::ImuData,
        }
    }

    pub fn time_stamp(&self) -> u32 {
        match self {
            LogRecord::EkfEuler(log) => log.time_stamp,
            LogRecord::EkfNav(log) => log.time_stamp,
            LogRecord::EkfQuat(log) => log.time_stamp,
            LogRecord::ImuData(log) => log.time_stamp,
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
