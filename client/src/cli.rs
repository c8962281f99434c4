use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use msa_client::{HttpTransport, JobOrchestrator, MsaTransport, PoolController};
use msa_common::ClientConfig;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "msa-client")]
#[command(about = "CLI para generar MSAs contra el servidor de gpu servers")]
struct Cli {
    /// URL del servidor (default: MSA_SERVER_URL o http://localhost:8000)
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,

    /// Token de acceso (default: MSA_TOKEN)
    #[arg(long, global = true, value_name = "TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Genera el MSA de uno o más FASTA, de a uno por vez
    Run {
        #[arg(value_name = "FASTA", required = true)]
        inputs: Vec<PathBuf>,

        /// Directorio de salida (se crea si no existe)
        #[arg(long, default_value = "msa_output")]
        output: PathBuf,
    },
    /// Muestra el estado de los gpu servers
    Status,
    /// Arranca los gpu servers si hace falta
    Start,
    /// Reinicia los gpu servers y verifica que queden listos
    Restart,
    /// Consulta el estado de una tarea
    Task {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },
    /// Descarga y descomprime un resultado ya terminado
    Download {
        #[arg(value_name = "RESULT_ID")]
        id: String,

        #[arg(long, default_value = "msa_output")]
        output: PathBuf,
    },
}

fn build_config(cli: &Cli) -> ClientConfig {
    let mut config = ClientConfig::from_env();
    if let Some(ref server) = cli.server {
        config.server_url = server.clone();
    }
    if let Some(ref token) = cli.token {
        config.token = token.clone();
    }
    config
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);

    let transport = Arc::new(HttpTransport::new(&config).context("configuración del cliente")?);
    let pool = Arc::new(PoolController::new(transport.clone(), config));

    match cli.command {
        Commands::Run { inputs, output } => {
            // un orquestador por job, todos con el mismo pool
            for input in inputs {
                let orchestrator = JobOrchestrator::new(pool.clone());
                let handle = orchestrator
                    .run(&input, &output)
                    .await
                    .with_context(|| format!("procesando {}", input.display()))?;

                println!("Resultado para {}:", input.display());
                println!("  result_id: {}", handle.result_id);
                if let Some(ref task_id) = handle.task_id {
                    println!("  task_id  : {}", task_id);
                }
                println!("  archivo  : {}", handle.archive.display());
                println!("  salida   : {}", handle.output_dir.display());
                if handle.resumed {
                    println!("  (reutilizado, no se reenvió)");
                } else {
                    println!("  envíos   : {}", handle.attempts);
                }
            }
        }

        Commands::Status => {
            let workers = pool.status().await?;
            if workers.is_empty() {
                println!("No hay gpu servers configurados.");
            } else {
                println!("gpu servers:");
                for (name, running) in workers.iter() {
                    println!("  {:<12}: {}", name, if running { "corriendo" } else { "detenido" });
                }
            }
        }

        Commands::Start => {
            let workers = pool.ensure_ready().await?;
            println!("gpu servers listos: {}", workers);
        }

        Commands::Restart => {
            pool.restart().await?;
            let workers = pool.ensure_ready().await?;
            println!("gpu servers reiniciados: {}", workers);
        }

        Commands::Task { id } => {
            let report = transport.task_status(&id).await?;
            println!("Tarea {}:", id);
            println!("  estado: {:?}", report.status);
            if let Some(ref result_id) = report.result_id {
                println!("  result_id: {}", result_id);
            }
            if let Some(ref error) = report.error {
                println!("  error: {}", error);
            }
        }

        Commands::Download { id, output } => {
            let archive = msa_client::retrieval::retrieve(transport.as_ref(), &id, &output).await?;
            println!("Descargado: {}", archive.display());
            println!("Descomprimido en: {}", output.display());
        }
    }

    Ok(())
}
