use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Question to ask; read from stdin when omitted and input is piped
    pub query: Option<String>,

    /// Start an interactive chat session
    #[arg(short, long)]
    pub chat: bool,

    /// Stream answers as they are generated
    #[arg(short, long, conflicts_with = "sync")]
    pub stream: bool,

    /// Wait for each answer to complete before showing it
    #[arg(long)]
    pub sync: bool,

    /// Category to scope questions to
    #[arg(long)]
    pub category: Option<String>,

    /// Base URL of the retrieval service
    #[arg(long)]
    pub base_url: Option<String>,

    /// Log requests and turn progress to stderr
    #[arg(short, long)]
    pub verbose: bool,
}
