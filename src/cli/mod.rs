use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod chat;
pub mod serve;

#[derive(Subcommand)]
enum Command {
    /// Run the web app. Hosts a single shared session: every browser that
    /// connects sees the same signed-in user and conversation, so keep it
    /// bound to localhost.
    Serve {
        /// Set the server host address. Anything other than localhost
        /// exposes the shared session to other machines
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
    /// Chat with the tutor in the terminal
    Chat {},
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

fn init_tracing(default_filter: String) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    // Handle each sub command
    match args.command {
        Some(Command::Serve { host, port }) => {
            // axum logs rejections from built-in extractors with the `axum::rejection`
            // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
            init_tracing(format!(
                "{}=debug,tower_http=debug,axum::rejection=trace",
                env!("CARGO_CRATE_NAME")
            ));
            serve::run(host, port).await?;
        }
        Some(Command::Chat {}) => {
            // Keep logs from interleaving with the conversation
            init_tracing(format!("{}=warn", env!("CARGO_CRATE_NAME")));
            chat::run().await?;
        }
        None => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn it_warns_about_the_shared_session() {
        let mut cmd = Cli::command();
        let serve = cmd
            .find_subcommand_mut("serve")
            .expect("Missing serve subcommand");
        let help = serve.render_long_help().to_string();

        assert!(help.contains("single shared session"));
        assert!(help.contains("[default: 127.0.0.1]"));
    }
}
