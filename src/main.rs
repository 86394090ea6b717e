use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use form_intake::web::EdgeService;
use form_intake::{
    init_tracing, server, FormKind, IntakeConfig, IntakeHandler, ServerConfig, SheetConfig,
    SheetLogger, TransitBroker, TransitConfig,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one edge service
    Serve {
        #[command(subcommand)]
        service: Service,
    },
}

#[derive(Subcommand, Debug)]
enum Service {
    /// Intake handler for one form
    Intake {
        /// Form served at /ingress/<form>
        #[arg(long, value_enum)]
        form: Form,
    },
    /// Transit broker at /core
    Transit,
    /// Authenticated spreadsheet logger at /log
    SheetLogger,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Form {
    Contact,
    Join,
}

impl From<Form> for FormKind {
    fn from(form: Form) -> Self {
        match form {
            Form::Contact => FormKind::Contact,
            Form::Join => FormKind::Join,
        }
    }
}

fn build(service: Service) -> anyhow::Result<Arc<dyn EdgeService>> {
    Ok(match service {
        Service::Intake { form } => {
            let config = IntakeConfig::load().context("loading intake configuration")?;
            info!(downstream = ?config.downstream, "intake configured");
            Arc::new(IntakeHandler::from_config(form.into(), config)?)
        }
        Service::Transit => {
            let config = TransitConfig::load().context("loading transit configuration")?;
            Arc::new(TransitBroker::new(config))
        }
        Service::SheetLogger => {
            let config = SheetConfig::load().context("loading sheet logger configuration")?;
            Arc::new(SheetLogger::from_config(config)?)
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let Command::Serve { service } = args.command;
    let server_config = ServerConfig::load().context("loading server configuration")?;
    let service = build(service)?;

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, server_config.port));
    server::serve(service, addr)
        .await
        .with_context(|| format!("serving on {addr}"))
}
