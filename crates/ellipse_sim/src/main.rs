//! # Ellipse Sim
//!
//! Dispositivo simulado para o protocolo de link. Gera capturas para
//! replay ou responde a um cliente pela serial.
//!
//! ## Uso
//! ```bash
//! ellipse_sim record captura.bin --seconds 30
//! ellipse_sim serve -d /dev/ttyUSB1 -b 115200
//! ellipse_sim serve --preconfigured      # Já emite as saídas do config
//! ```

mod capture;
mod device;
mod motion;
mod serve;

use clap::{Parser, Subcommand};
use device::SimDevice;
use ellipse_core::{Channel, ConfigError};
use ellipse_core::config::AppConfig;
use ellipse_core::types::MAIN_LOOP_HZ;
use serve::Responder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(version, about = "Simulador de sensor Ellipse para o protocolo de link")]
struct Args {
    /// Arquivo de configuração (padrão: config.toml ao lado do executável)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Grava uma captura com as saídas do config
    Record {
        output: PathBuf,
        /// Duração simulada (s)
        #[arg(short, long)]
        seconds: Option<u32>,
    },
    /// Responde comandos e transmite logs pela serial
    Serve {
        #[arg(short, long)]
        device: Option<String>,
        #[arg(short, long)]
        baud_rate: Option<u32>,
        /// Habilita as saídas do config sem esperar comandos
        #[arg(long)]
        preconfigured: bool,
    },
}

/// Timeout curto para não atrasar o ciclo de 5 ms.
const SERVE_READ_TIMEOUT: Duration = Duration::from_millis(1);

fn main() {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    std::process::exit(run(args));
}

/// Carrega e valida a configuração. Um arquivo explícito precisa existir
/// e ser válido; sem `--config` vale o padrão ao lado do executável.
fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config = match path {
        Some(path) => AppConfig::try_load(path)?,
        None => AppConfig::load(&AppConfig::default_path()),
    };

    let problems = config.validate();
    if !problems.is_empty() {
        return Err(ConfigError::Invalid(problems));
    }
    Ok(config)
}

fn run(args: Args) -> i32 {
    // ── Carregar config ──
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return 1;
        }
    };

    let mut device = SimDevice::new(&config.sim);

    match args.mode {
        Mode::Record { output, seconds } => {
            for conf in &config.outputs {
                device.configure(conf);
            }
            let seconds = seconds.unwrap_or(config.sim.record_seconds);

            let mut channel = match Channel::create_file(&output) {
                Ok(channel) => channel,
                Err(e) => {
                    error!("{e}");
                    return -1;
                }
            };

            let ticks = seconds as u64 * MAIN_LOOP_HZ as u64;
            match capture::write_capture(&mut channel, &mut device, ticks) {
                Ok(logs) => {
                    info!("{logs} logs ({seconds} s) gravados em {}", output.display());
                    0
                }
                Err(e) => {
                    error!("Falha ao gravar captura: {e}");
                    1
                }
            }
        }

        Mode::Serve {
            device: path,
            baud_rate,
            preconfigured,
        } => {
            if preconfigured {
                for conf in &config.outputs {
                    device.configure(conf);
                }
            }

            let path = path.unwrap_or_else(|| config.channel.path.clone());
            let baud_rate = baud_rate.unwrap_or(config.channel.baud_rate);
            let channel = match Channel::open_serial(&path, baud_rate, SERVE_READ_TIMEOUT) {
                Ok(channel) => channel,
                Err(e) => {
                    error!("{e}");
                    return -1;
                }
            };

            // ── Ctrl+C ──
            let stop = Arc::new(AtomicBool::new(false));
            let stop_handler = Arc::clone(&stop);
            if let Err(e) = ctrlc::set_handler(move || {
                info!("Sinal de parada recebido");
                stop_handler.store(true, Ordering::SeqCst);
            }) {
                warn!("Não foi possível instalar handler de Ctrl+C: {e}");
            }

            let responder = Responder::new(device, config.session.max_frame_size);
            match serve::serve(channel, responder, &stop) {
                Ok(_) => 0,
                Err(e) => {
                    error!("Falha na serial: {e}");
                    1
                }
            }
        }
    }
}
