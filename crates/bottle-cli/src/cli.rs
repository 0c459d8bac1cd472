//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Nameserver host
    #[arg(long)]
    pub host: Option<String>,

    /// Nameserver port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// When to close the nameserver connection
    #[arg(long, value_parser = ["keep", "after_query", "after_response"])]
    pub close_policy: Option<String>,

    /// Print decoded bottles as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask the nameserver where a port lives
    Query {
        /// Port name, e.g. /icub/camcalib/left/out
        port_name: String,
    },
    /// Resolve a port and print everything it streams
    Stream {
        /// Port name
        port_name: String,
        /// Stop after this many messages
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// Also print header-only acknowledgements
        #[arg(long)]
        headers: bool,
    },
    /// Send a space-separated command to a websocket URL
    Send {
        /// Target URL, e.g. ws://127.0.0.1:10002?ws
        url: String,
        /// Command words
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
        /// Wait for one reply and print it
        #[arg(short, long)]
        reply: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    /// Command words joined the way they are split again on the wire
    pub fn command_text(words: &[String]) -> String {
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream_with_overrides() {
        let cli = Cli::try_parse_from([
            "bottle",
            "--host",
            "10.0.0.2",
            "-p",
            "10001",
            "--close-policy",
            "after_query",
            "stream",
            "/camera/out",
            "-n",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.host.as_deref(), Some("10.0.0.2"));
        assert_eq!(cli.port, Some(10001));
        assert_eq!(cli.close_policy.as_deref(), Some("after_query"));
        assert!(matches!(
            cli.command,
            Commands::Stream { ref port_name, count: Some(5), headers: false } if port_name == "/camera/out"
        ));
    }

    #[test]
    fn test_send_joins_words() {
        let cli = Cli::try_parse_from(["bottle", "send", "ws://127.0.0.1:10002?ws", "bot", "query", "/x"])
            .unwrap();
        let Commands::Send { words, reply, .. } = cli.command else {
            panic!("expected send");
        };
        assert!(!reply);
        assert_eq!(Cli::command_text(&words), "bot query /x");
    }

    #[test]
    fn test_rejects_unknown_close_policy() {
        assert!(Cli::try_parse_from(["bottle", "--close-policy", "never", "config"]).is_err());
        assert!(Cli::try_parse_from(["bottle", "send", "ws://127.0.0.1:1?ws"]).is_err());
    }
}
