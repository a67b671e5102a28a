//! # Ellipse Minimal
//!
//! Abre a interface com o sensor, pede a identificação, habilita os logs
//! configurados e imprime a telemetria decodificada até Ctrl+C.
//!
//! ## Uso
//! ```bash
//! ellipse_minimal                                   # /dev/ttyUSB0 @ 115200
//! ellipse_minimal -d /dev/ttyACM0 -b 921600
//! ellipse_minimal --replay captura.bin              # Replay de captura
//! ellipse_minimal --config ellipse.toml --save-config
//! ```
//!
//! Códigos de saída: `0` parada limpa, `1` erro de configuração ou de
//! polling, `-1` falha ao abrir a interface ou a sessão.

use clap::Parser;
use ellipse_core::config::{AppConfig, ChannelKind};
use ellipse_core::format::{ConsolePrinter, READY_BANNER, device_line};
use ellipse_core::{Channel, ConfigError, LinkSession, TelemetryClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(version, about = "Cliente mínimo de telemetria para sensores Ellipse")]
struct Args {
    /// Arquivo de configuração (padrão: config.toml ao lado do executável)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Dispositivo serial
    #[arg(short, long)]
    device: Option<String>,
    #[arg(short, long)]
    baud_rate: Option<u32>,
    /// Lê de uma captura gravada em vez da serial
    #[arg(long, conflicts_with = "device")]
    replay: Option<PathBuf>,
    /// Grava a configuração efetiva e sai
    #[arg(long)]
    save_config: bool,
}

const EXIT_OK: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_STARTUP: i32 = -1;

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

/// Carrega a configuração do disco. Sem arquivo, grava o padrão antes de
/// qualquer flag ser aplicada.
fn load_config(path: &Path, explicit: bool) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        let config = AppConfig::default();
        // Salva config padrão se não existir
        if let Err(e) = config.save(path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
        return Ok(config);
    }

    if explicit {
        AppConfig::try_load(path)
    } else {
        Ok(AppConfig::load(path))
    }
}

/// Flags sobrescrevem o arquivo.
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(device) = &args.device {
        config.channel.kind = ChannelKind::Serial;
        config.channel.path = device.clone();
    }
    if let Some(baud_rate) = args.baud_rate {
        config.channel.baud_rate = baud_rate;
    }
    if let Some(capture) = &args.replay {
        config.channel.kind = ChannelKind::File;
        config.channel.path = capture.display().to_string();
    }
}

/// Corpo do programa. Tudo que foi aberto é liberado antes de retornar.
fn run(args: Args) -> i32 {
    // ── Carregar config ──
    let config_path = args.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = match load_config(&config_path, args.config.is_some()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return EXIT_ERROR;
        }
    };
    apply_overrides(&mut config, &args);

    let problems = config.validate();
    if !problems.is_empty() {
        error!("{}", ConfigError::Invalid(problems));
        return EXIT_ERROR;
    }

    if args.save_config {
        return match config.save(&config_path) {
            Ok(()) => EXIT_OK,
            Err(e) => {
                error!("{e}");
                EXIT_ERROR
            }
        };
    }

    // ── Ctrl+C ──
    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Sinal de parada recebido");
        stop_handler.store(true, Ordering::SeqCst);
    }) {
        warn!("Não foi possível instalar handler de Ctrl+C: {e}");
    }

    // ── Interface e sessão ──
    let mut client = match TelemetryClient::start(
        || Channel::open(&config.channel),
        |channel| LinkSession::init(channel, &config.session),
        &config.client,
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("{e}");
            return EXIT_STARTUP;
        }
    };

    if let Ok(info) = client.query_device_info() {
        println!("{}", device_line(&info));
    }

    let report = client.configure_outputs(&config.outputs);
    if !report.failed.is_empty() {
        warn!(
            "{} de {} saídas não configuradas",
            report.failed.len(),
            report.attempted()
        );
    }

    println!("{READY_BANNER}");

    client.register_callback(ConsolePrinter::new(std::io::stdout()));

    // ── Loop principal ──
    let code = match client.run(&stop) {
        Ok(_) => EXIT_OK,
        Err(e) => {
            error!("{e}");
            EXIT_ERROR
        }
    };

    client.shutdown();
    code
}
